//! End-to-end retrievals against in-memory upstream services.

use std::sync::Arc;

use rdb_api::pipeline::Pipeline;
use rdb_api::request::{DataType, RdbRequest, StatisticTable};
use rdb_common::{LocationIdentifier, RdbError};
use test_utils::fixtures::{self, sites, utc};
use test_utils::{
    assert_rdb_line, mock_token, MockAuthenticator, MockQualifierDomain, MockSeriesService,
    MockSiteService,
};
use upstream::PointSource;

struct Harness {
    pipeline: Pipeline,
    series: Arc<MockSeriesService>,
    auth: Arc<MockAuthenticator>,
}

fn harness(site: (&str, &str, &str, &str, bool), series: MockSeriesService) -> Harness {
    let sites = Arc::new(MockSiteService::new().with_site(fixtures::site(site)));
    let series = Arc::new(series);
    let qualifiers = Arc::new(MockQualifierDomain::new(fixtures::qualifier_domain()));
    let (token, auth) = mock_token();

    let pipeline = Pipeline::new(
        sites,
        series.clone(),
        qualifiers,
        token,
        StatisticTable::default(),
    );

    Harness {
        pipeline,
        series,
        auth,
    }
}

fn daily_request(site: &str, begin: &str, end: &str) -> RdbRequest {
    RdbRequest {
        data_type: DataType::Daily,
        location: site.parse().unwrap(),
        parameter_code: "00060".to_string(),
        stat_or_uv_type: "00003".to_string(),
        begin: begin.to_string(),
        end: end.to_string(),
        water_year: false,
        suppress_rounding: false,
    }
}

fn unit_request(site: &str, uv_type: &str, begin: &str, end: &str) -> RdbRequest {
    RdbRequest {
        data_type: DataType::Unit,
        stat_or_uv_type: uv_type.to_string(),
        ..daily_request(site, begin, end)
    }
}

fn maine() -> LocationIdentifier {
    LocationIdentifier::new("USGS", "01010000")
}

fn maine_daily_service() -> MockSeriesService {
    let mut data = fixtures::series_data(
        "dv-1",
        &[utc(2020, 1, 15, 12, 0, 0), utc(2020, 1, 16, 12, 0, 0)],
    );
    data.approvals.push(fixtures::approval(
        1200,
        utc(2019, 10, 1, 0, 0, 0),
        utc(2020, 1, 15, 23, 59, 59),
    ));
    data.qualifiers.push(fixtures::qualifier(
        "ESTIMATED",
        utc(2020, 1, 16, 0, 0, 0),
        utc(2020, 1, 16, 23, 59, 59),
    ));

    MockSeriesService::new()
        .with_parameter(fixtures::discharge())
        .with_series(fixtures::daily_mean_series(&maine(), "Mean", "dv-1"))
        .with_data(data)
}

#[tokio::test]
async fn test_daily_retrieval_renders_header_then_rows() {
    let h = harness(sites::MAINE, maine_daily_service());

    let output = h
        .pipeline
        .run(daily_request("01010000", "20200101", "20200131"))
        .await
        .unwrap();

    assert_rdb_line!(output.header, "FILE TYPE=\"NWIS-I DAILY-VALUES\"");
    assert_rdb_line!(output.header, "STATISTIC CODE=\"00003\"");
    assert_rdb_line!(output.header, "St. John River at Ninemile Bridge, Maine");
    assert_rdb_line!(output.header, "RANGE START=\"20200101\" END=\"20200131\"");
    assert!(output.header.ends_with("8D\t6S\t16N\t1S\t32S\t1S\t1S\n"));

    let rows: Vec<String> = output.rows.map(Result::unwrap).collect();
    assert_eq!(
        rows,
        vec![
            "20200115\t\t10.0\t \t\tC\tA\n".to_string(),
            "20200116\t\t11.0\te\t\tC\tP\n".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_query_bounds_are_sent_in_site_zone() {
    let h = harness(sites::MAINE, maine_daily_service());

    h.pipeline
        .run(daily_request("01010000", "20200101", "20200131"))
        .await
        .unwrap();

    let queries = h.series.points_queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].unique_id, "dv-1");
    assert_eq!(queries[0].query_from.as_deref(), Some("2020-01-01T00:00:00-05:00"));
    assert_eq!(queries[0].query_to.as_deref(), Some("2020-01-31T23:59:59-05:00"));
    assert!(queries[0].apply_rounding);
    assert_eq!(queries[0].source, PointSource::Corrected);
}

#[tokio::test]
async fn test_begin_of_time_omits_lower_bound() {
    let h = harness(sites::MAINE, maine_daily_service());

    h.pipeline
        .run(daily_request("01010000", "00000000", "20200131"))
        .await
        .unwrap();

    let queries = h.series.points_queries();
    assert_eq!(queries[0].query_from, None);
    assert!(queries[0].query_to.is_some());
}

#[tokio::test]
async fn test_water_year_interval() {
    let h = harness(sites::MAINE, maine_daily_service());

    let request = RdbRequest {
        water_year: true,
        ..daily_request("01010000", "2020", "2020")
    };
    let output = h.pipeline.run(request).await.unwrap();

    assert_rdb_line!(output.header, "RANGE START=\"20191001\" END=\"20200930\"");
    let queries = h.series.points_queries();
    assert_eq!(queries[0].query_from.as_deref(), Some("2019-10-01T00:00:00-04:00"));
    assert_eq!(queries[0].query_to.as_deref(), Some("2020-09-30T23:59:59-04:00"));
}

#[tokio::test]
async fn test_suppress_rounding() {
    let h = harness(sites::MAINE, maine_daily_service());

    let request = RdbRequest {
        suppress_rounding: true,
        ..daily_request("01010000", "", "")
    };
    h.pipeline.run(request).await.unwrap();

    let queries = h.series.points_queries();
    assert!(!queries[0].apply_rounding);
    assert_eq!(queries[0].query_from, None);
    assert_eq!(queries[0].query_to, None);
}

#[tokio::test]
async fn test_fixed_offset_zone_for_non_observing_half_hour_site() {
    let location = LocationIdentifier::new("USGS", "02ZK001");
    let service = MockSeriesService::new()
        .with_parameter(fixtures::discharge())
        .with_series(fixtures::instant_series(&location, "Points", "uv-1"))
        .with_data(fixtures::series_data(
            "uv-1",
            &[utc(2015, 7, 1, 15, 30, 0), utc(2015, 1, 15, 15, 30, 0)],
        ));
    let h = harness(sites::NEWFOUNDLAND, service);

    let output = h
        .pipeline
        .run(unit_request("02ZK001", "C", "", ""))
        .await
        .unwrap();

    assert_rdb_line!(output.header, "TYPE CODE=\"C\"");
    assert_rdb_line!(output.header, "TIME_ZONE=\"NST\" DST_FLAG=N");

    let rows: Vec<String> = output.rows.map(Result::unwrap).collect();
    // Summer: frozen at the nominal offset with a literal label.
    assert_eq!(rows[0], "20150701\t120000\t-03:30\t10.0\t \t\tP\n");
    // Winter: the zone database already is at standard time.
    assert_eq!(rows[1], "20150115\t120000\tNST\t11.0\t \t\tP\n");
}

#[tokio::test]
async fn test_measured_uv_reads_raw_data() {
    let service = MockSeriesService::new()
        .with_parameter(fixtures::discharge())
        .with_series(fixtures::instant_series(&maine(), "Points", "uv-raw"))
        .with_data(fixtures::series_data("uv-raw", &[utc(2015, 1, 15, 17, 15, 0)]));
    let h = harness(sites::MAINE, service);

    let output = h
        .pipeline
        .run(unit_request("01010000", "M", "20150115", "20150115"))
        .await
        .unwrap();

    let rows: Vec<String> = output.rows.map(Result::unwrap).collect();
    assert_eq!(rows, vec!["20150115\t121500\tEST\t10.0\t \t\tP\n".to_string()]);

    let queries = h.series.points_queries();
    assert_eq!(queries[0].source, PointSource::Raw);
    assert_eq!(queries[0].query_from.as_deref(), Some("2015-01-15T00:00:00-05:00"));
    assert_eq!(queries[0].query_to.as_deref(), Some("2015-01-15T23:59:59-05:00"));
}

#[tokio::test]
async fn test_gage_height_unit_falls_back_to_parameter() {
    let mut series = fixtures::instant_series(&maine(), "Points", "gh-1");
    series.parameter = "Gage height".to_string();
    series.unit = String::new();
    let service = MockSeriesService::new()
        .with_parameter(fixtures::discharge())
        .with_parameter(fixtures::gage_height())
        .with_series(fixtures::instant_series(&maine(), "Points", "uv-q"))
        .with_series(series)
        .with_data(fixtures::series_data("gh-1", &[utc(2020, 7, 15, 12, 0, 0)]));
    let h = harness(sites::MAINE, service);

    let request = RdbRequest {
        parameter_code: "00065".to_string(),
        ..unit_request("01010000", "E", "20200715", "20200715")
    };
    let output = h.pipeline.run(request).await.unwrap();

    assert_rdb_line!(output.header, "PARAMETER CODE=\"00065\"");
    assert_rdb_line!(output.header, "UNIT=\"ft\"");

    let rows: Vec<String> = output.rows.map(Result::unwrap).collect();
    assert_eq!(rows, vec!["20200715\t080000\tEDT\t10.0\t \t\tP\n".to_string()]);

    assert_eq!(h.series.series_queries()[0].parameter, "Gage height");
    assert_eq!(h.series.points_queries()[0].unique_id, "gh-1");
    assert_eq!(h.series.points_queries()[0].source, PointSource::Corrected);
}

#[tokio::test]
async fn test_cooperator_site_uses_qualified_location() {
    let location = LocationIdentifier::new("CODWR", "393109104464500");
    let service = MockSeriesService::new()
        .with_parameter(fixtures::discharge())
        .with_series(fixtures::daily_mean_series(&location, "Mean", "co-1"))
        .with_data(fixtures::series_data("co-1", &[]));
    let h = harness(sites::COLORADO_COOP, service);

    let output = h
        .pipeline
        .run(daily_request("393109104464500-CODWR", "", ""))
        .await
        .unwrap();

    assert_eq!(output.rows.count(), 0);
    let queries = h.series.series_queries();
    assert_eq!(queries[0].location.to_string(), "393109104464500-CODWR");
    assert_eq!(queries[0].computation_identifier.as_deref(), Some("Mean"));
    assert_eq!(queries[0].computation_period_identifier, "Daily");
}

#[tokio::test]
async fn test_two_primary_series_are_ambiguous() {
    let service = MockSeriesService::new()
        .with_parameter(fixtures::discharge())
        .with_series(fixtures::daily_mean_series(&maine(), "Mean", "a").primary())
        .with_series(fixtures::daily_mean_series(&maine(), "Mean2", "b").primary());
    let h = harness(sites::MAINE, service);

    let result = h.pipeline.run(daily_request("01010000", "", "")).await;

    match result {
        Err(RdbError::AmbiguousSeries { identifiers, .. }) => assert_eq!(identifiers.len(), 2),
        Err(other) => panic!("expected AmbiguousSeries, got {other:?}"),
        Ok(_) => panic!("expected AmbiguousSeries, got output"),
    }
    assert!(h.series.points_queries().is_empty());
}

#[tokio::test]
async fn test_single_primary_wins() {
    let mut service = MockSeriesService::new()
        .with_parameter(fixtures::discharge())
        .with_series(fixtures::daily_mean_series(&maine(), "Mean", "a"))
        .with_series(fixtures::daily_mean_series(&maine(), "Mean2", "b").primary());
    service = service.with_data(fixtures::series_data("b", &[]));
    let h = harness(sites::MAINE, service);

    h.pipeline.run(daily_request("01010000", "", "")).await.unwrap();
    assert_eq!(h.series.points_queries()[0].unique_id, "b");
}

#[tokio::test]
async fn test_no_series_is_not_found() {
    let service = MockSeriesService::new().with_parameter(fixtures::discharge());
    let h = harness(sites::MAINE, service);

    let result = h.pipeline.run(daily_request("01010000", "", "")).await;
    assert!(matches!(result, Err(RdbError::NotFound(_))));
}

#[tokio::test]
async fn test_unknown_site_is_not_found() {
    let h = harness(sites::MAINE, maine_daily_service());

    let result = h.pipeline.run(daily_request("09999999", "", "")).await;
    assert!(matches!(result, Err(RdbError::NotFound(_))));
    assert!(h.series.series_queries().is_empty());
}

#[tokio::test]
async fn test_unknown_parameter_code_is_not_found() {
    let h = harness(sites::MAINE, maine_daily_service());

    let request = RdbRequest {
        parameter_code: "99999".to_string(),
        ..daily_request("01010000", "", "")
    };
    assert!(matches!(h.pipeline.run(request).await, Err(RdbError::NotFound(_))));
}

#[tokio::test]
async fn test_malformed_begin_aborts_before_points() {
    let h = harness(sites::MAINE, maine_daily_service());

    let result = h.pipeline.run(daily_request("01010000", "2020-01", "")).await;
    assert!(matches!(result, Err(RdbError::Format { .. })));
    assert!(h.series.points_queries().is_empty());
}

#[tokio::test]
async fn test_expired_token_is_retried_once() {
    let h = harness(sites::MAINE, maine_daily_service().expire_next(1));

    let output = h
        .pipeline
        .run(daily_request("01010000", "20200101", "20200131"))
        .await
        .unwrap();

    assert_eq!(output.rows.count(), 2);
    assert!(h.auth.issued() >= 2);
    // Parameter lookup twice, then the catalog query and the points.
    assert_eq!(h.series.tokens_seen().len(), 4);
}

#[tokio::test]
async fn test_repeated_expiry_escalates() {
    let h = harness(sites::MAINE, maine_daily_service().expire_next(2));

    let result = h
        .pipeline
        .run(daily_request("01010000", "20200101", "20200131"))
        .await;

    assert!(matches!(result, Err(RdbError::UpstreamUnavailable(_))));
    assert_eq!(h.series.tokens_seen().len(), 2);
}

#[tokio::test]
async fn test_missing_remark_code_ends_row_stream() {
    let mut data = fixtures::series_data(
        "dv-1",
        &[
            utc(2020, 1, 14, 12, 0, 0),
            utc(2020, 1, 15, 12, 0, 0),
            utc(2020, 1, 16, 12, 0, 0),
        ],
    );
    data.qualifiers.push(fixtures::qualifier(
        "UNDOCUMENTED",
        utc(2020, 1, 15, 0, 0, 0),
        utc(2020, 1, 15, 23, 59, 59),
    ));
    let service = MockSeriesService::new()
        .with_parameter(fixtures::discharge())
        .with_series(fixtures::daily_mean_series(&maine(), "Mean", "dv-1"))
        .with_data(data);
    let h = harness(sites::MAINE, service);

    let output = h
        .pipeline
        .run(daily_request("01010000", "20200101", "20200131"))
        .await
        .unwrap();

    let rows: Vec<_> = output.rows.collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].is_ok());
    assert_eq!(
        rows[1],
        Err(RdbError::MissingRemarkCode("UNDOCUMENTED".to_string()))
    );
}

#[tokio::test]
async fn test_unsupported_statistic_is_rejected_before_upstream() {
    let h = harness(sites::MAINE, maine_daily_service());

    let request = RdbRequest {
        stat_or_uv_type: "00011".to_string(),
        ..daily_request("01010000", "", "")
    };
    assert!(matches!(
        h.pipeline.run(request).await,
        Err(RdbError::Validation { .. })
    ));
    assert!(h.series.tokens_seen().is_empty());
}
