//! The retrieval pipeline.
//!
//! One [`Pipeline::run`] call takes a validated request through six stages:
//!
//! 1. resolve the site
//! 2. resolve the series (parameter lookup, catalog query, primary selection)
//! 3. resolve the interval
//! 4. fetch the qualifier domain
//! 5. fetch the points
//! 6. render the header and, lazily, the rows
//!
//! Stages 2 and 3 are independent and run concurrently. Every stage hands
//! its successor a value; none reads state left behind by another.

use std::iter::FusedIterator;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use metrics::counter;
use tracing::{info, instrument, warn};

use rdb_common::interval::Edge;
use rdb_common::{DayInterval, Interval, RdbResult, SecondInterval, SiteTimeZone};
use rdb_protocol::{
    approval_char, render_row, select_primary, Approval, ParameterMetadata, Point, Qualifier,
    RdbHeader, RemarkTable, RowShape, TimeSeriesData, TimeSeriesDescription,
};
use upstream::{
    PointSource, PointsQuery, QualifierDomain, SeriesQuery, SeriesService, SiteRecord,
    SiteService, TokenHandle,
};

use crate::request::{Computation, DataType, RdbRequest, StatisticTable};

/// The series a request resolved to, with its parameter metadata.
#[derive(Debug, Clone)]
pub struct ResolvedSeries {
    pub parameter: ParameterMetadata,
    pub series: TimeSeriesDescription,
}

/// Canonical interval of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedInterval {
    Day(DayInterval),
    Second(SecondInterval),
}

impl ResolvedInterval {
    fn as_interval(&self) -> &dyn Interval {
        match self {
            ResolvedInterval::Day(interval) => interval,
            ResolvedInterval::Second(interval) => interval,
        }
    }

    pub fn from_boundary(&self) -> &str {
        self.as_interval().from_boundary()
    }

    pub fn to_boundary(&self) -> &str {
        self.as_interval().to_boundary()
    }
}

/// Point-data query bounds in RFC 3339; `None` is an open end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBounds {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Stage 3: normalize the begin and end tokens.
pub fn resolve_interval(request: &RdbRequest) -> RdbResult<ResolvedInterval> {
    match request.data_type {
        DataType::Daily => DayInterval::new(request.water_year, &request.begin, &request.end)
            .map(ResolvedInterval::Day),
        DataType::Unit => SecondInterval::new(request.water_year, &request.begin, &request.end)
            .map(ResolvedInterval::Second),
    }
}

/// Convert canonical boundaries to query bounds in the site's zone.
/// Sentinel boundaries leave the corresponding bound out.
pub fn query_bounds(interval: &ResolvedInterval, zone: &SiteTimeZone) -> RdbResult<QueryBounds> {
    let interval = interval.as_interval();

    let from = interval
        .from_datetime()?
        .map(|local| zone.localize(local, Edge::Begin))
        .transpose()?
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, false));

    let to = interval
        .to_datetime()?
        .map(|local| zone.localize(local, Edge::End))
        .transpose()?
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, false));

    Ok(QueryBounds { from, to })
}

/// Header text plus the lazily rendered rows.
pub struct RdbOutput {
    pub header: String,
    pub rows: RowIter,
}

/// Renders one row per point, in upstream order.
///
/// After the first failed row the iterator yields nothing more; a consumer
/// that saw an `Err` knows the output is incomplete.
pub struct RowIter {
    points: std::vec::IntoIter<Point>,
    approvals: Vec<Approval>,
    qualifiers: Vec<Qualifier>,
    remarks: RemarkTable,
    zone: SiteTimeZone,
    shape: RowShape,
    failed: bool,
}

impl RowIter {
    pub fn new(data: TimeSeriesData, zone: SiteTimeZone, remarks: RemarkTable, shape: RowShape) -> Self {
        Self {
            points: data.points.into_iter(),
            approvals: data.approvals,
            qualifiers: data.qualifiers,
            remarks,
            zone,
            shape,
            failed: false,
        }
    }

    fn render(&self, point: &Point) -> RdbResult<String> {
        let local = self.zone.resolve(point.timestamp)?;
        let approval = approval_char(&point.timestamp, &self.approvals);
        render_row(point, &local, &self.qualifiers, &self.remarks, approval, self.shape)
    }
}

impl Iterator for RowIter {
    type Item = RdbResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let point = self.points.next()?;
        let row = self.render(&point);

        match &row {
            Ok(_) => counter!("rdb_rows_rendered_total").increment(1),
            Err(e) => {
                self.failed = true;
                counter!("rdb_request_errors_total", "kind" => e.kind()).increment(1);
                warn!(error = %e, timestamp = %point.timestamp, "Row rendering failed, ending output");
            }
        }

        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            (0, Some(0))
        } else {
            (0, Some(self.points.len()))
        }
    }
}

impl FusedIterator for RowIter {}

/// Shared collaborators of every retrieval.
#[derive(Clone)]
pub struct Pipeline {
    sites: Arc<dyn SiteService>,
    series: Arc<dyn SeriesService>,
    qualifiers: Arc<dyn QualifierDomain>,
    token: TokenHandle,
    statistics: Arc<StatisticTable>,
}

impl Pipeline {
    pub fn new(
        sites: Arc<dyn SiteService>,
        series: Arc<dyn SeriesService>,
        qualifiers: Arc<dyn QualifierDomain>,
        token: TokenHandle,
        statistics: StatisticTable,
    ) -> Self {
        Self {
            sites,
            series,
            qualifiers,
            token,
            statistics: Arc::new(statistics),
        }
    }

    /// Run one retrieval. Any stage failure aborts with that stage's error.
    #[instrument(skip(self, request), fields(
        site = %request.location,
        parameter = %request.parameter_code,
        data_type = %request.data_type,
    ))]
    pub async fn run(&self, request: RdbRequest) -> RdbResult<RdbOutput> {
        counter!("rdb_requests_total").increment(1);

        let result = self.execute(&request).await;
        if let Err(e) = &result {
            counter!("rdb_request_errors_total", "kind" => e.kind()).increment(1);
            warn!(error = %e, "Retrieval failed");
        }
        result
    }

    async fn execute(&self, request: &RdbRequest) -> RdbResult<RdbOutput> {
        let computation = request.computation(&self.statistics)?;

        let site = self.resolve_site(request).await?;

        let (series, interval) = tokio::join!(
            self.resolve_series(&site, request, &computation),
            async { resolve_interval(request) },
        );
        let (series, interval) = (series?, interval?);

        let remarks = self.fetch_qualifiers().await?;

        let bounds = query_bounds(&interval, &site.zone)?;
        let data = self
            .fetch_points(&series.series, bounds, request, computation.source)
            .await?;

        info!(
            series = %series.series.identifier,
            points = data.points.len(),
            "Series retrieved"
        );

        let shape = match request.data_type {
            DataType::Daily => RowShape::Daily,
            DataType::Unit => RowShape::Instant,
        };

        let header = RdbHeader {
            shape,
            location: site.location.clone(),
            station_name: site.station_name.clone(),
            zone: site.zone.clone(),
            parameter_code: request.parameter_code.clone(),
            parameter_name: series.parameter.display_name.clone(),
            unit: if series.series.unit.is_empty() {
                series.parameter.unit_identifier.clone()
            } else {
                series.series.unit.clone()
            },
            stat_or_uv_type: request.stat_or_uv_type.clone(),
            series_identifier: series.series.identifier.clone(),
            range_start: interval.from_boundary().to_string(),
            range_end: interval.to_boundary().to_string(),
            retrieved: Utc::now(),
        }
        .render();

        Ok(RdbOutput {
            header,
            rows: RowIter::new(data, site.zone, remarks, shape),
        })
    }

    /// Stage 1.
    #[instrument(skip(self, request), fields(site = %request.location))]
    async fn resolve_site(&self, request: &RdbRequest) -> RdbResult<SiteRecord> {
        let site = self.sites.site(&request.location).await?;
        info!(
            station = %site.station_name,
            tz_cd = %site.zone.zone_code,
            "Site resolved"
        );
        Ok(site)
    }

    /// Stage 2.
    #[instrument(skip_all, fields(site = %site.location))]
    async fn resolve_series(
        &self,
        site: &SiteRecord,
        request: &RdbRequest,
        computation: &Computation,
    ) -> RdbResult<ResolvedSeries> {
        let code = request.parameter_code.as_str();
        let parameter = self
            .token
            .call(|token| async move { self.series.parameter(&token, code).await })
            .await?;

        let query = SeriesQuery {
            location: site.location.clone(),
            parameter: parameter.identifier.clone(),
            computation_identifier: computation.identifier.clone(),
            computation_period_identifier: computation.period.clone(),
        };
        let query = &query;

        let candidates = self
            .token
            .call(|token| async move { self.series.find_series(&token, query).await })
            .await?;

        let series = select_primary(candidates, &site.location)?;
        Ok(ResolvedSeries { parameter, series })
    }

    /// Stage 4.
    #[instrument(skip(self))]
    async fn fetch_qualifiers(&self) -> RdbResult<RemarkTable> {
        let domain = self
            .token
            .call(|token| async move { self.qualifiers.qualifiers(&token).await })
            .await?;
        Ok(domain.into_iter().collect())
    }

    /// Stage 5.
    #[instrument(skip_all, fields(series = %series.unique_id))]
    async fn fetch_points(
        &self,
        series: &TimeSeriesDescription,
        bounds: QueryBounds,
        request: &RdbRequest,
        source: PointSource,
    ) -> RdbResult<TimeSeriesData> {
        let query = PointsQuery {
            unique_id: series.unique_id.clone(),
            query_from: bounds.from,
            query_to: bounds.to,
            apply_rounding: !request.suppress_rounding,
            source,
        };
        let query = &query;

        self.token
            .call(|token| async move { self.series.points(&token, query).await })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rdb_common::{LocationIdentifier, RdbError};

    fn request(data_type: DataType, begin: &str, end: &str, water_year: bool) -> RdbRequest {
        RdbRequest {
            data_type,
            location: LocationIdentifier::new("USGS", "01010000"),
            parameter_code: "00060".to_string(),
            stat_or_uv_type: "00003".to_string(),
            begin: begin.to_string(),
            end: end.to_string(),
            water_year,
            suppress_rounding: false,
        }
    }

    fn est() -> SiteTimeZone {
        SiteTimeZone::new("EST", true).unwrap()
    }

    #[test]
    fn test_resolve_daily_interval() {
        let interval = resolve_interval(&request(DataType::Daily, "2015", "2015", true)).unwrap();
        assert_eq!(interval.from_boundary(), "20141001");
        assert_eq!(interval.to_boundary(), "20150930");
    }

    #[test]
    fn test_resolve_second_interval() {
        let interval = resolve_interval(&request(DataType::Unit, "20150101", "20150102", false)).unwrap();
        assert_eq!(interval.from_boundary(), "20150101000000");
        assert_eq!(interval.to_boundary(), "20150102235959");
    }

    #[test]
    fn test_resolve_interval_rejects_garbage() {
        assert!(matches!(
            resolve_interval(&request(DataType::Daily, "20x5", "", false)),
            Err(RdbError::Format { .. })
        ));
    }

    #[test]
    fn test_sentinel_begin_omits_lower_bound() {
        let interval = resolve_interval(&request(DataType::Daily, "00000000", "20150131", false)).unwrap();
        let bounds = query_bounds(&interval, &est()).unwrap();
        assert_eq!(bounds.from, None);
        assert_eq!(bounds.to.as_deref(), Some("2015-01-31T23:59:59-05:00"));
    }

    #[test]
    fn test_open_interval_omits_both_bounds() {
        let interval = resolve_interval(&request(DataType::Unit, "", "", false)).unwrap();
        let bounds = query_bounds(&interval, &est()).unwrap();
        assert_eq!(bounds, QueryBounds { from: None, to: None });
    }

    #[test]
    fn test_bounds_follow_daylight_time() {
        let interval = resolve_interval(&request(DataType::Daily, "20150701", "20150701", false)).unwrap();
        let bounds = query_bounds(&interval, &est()).unwrap();
        assert_eq!(bounds.from.as_deref(), Some("2015-07-01T00:00:00-04:00"));
        assert_eq!(bounds.to.as_deref(), Some("2015-07-01T23:59:59-04:00"));
    }

    #[test]
    fn test_zero_month_and_day_are_clamped() {
        let interval = resolve_interval(&request(DataType::Daily, "2015", "2015", false)).unwrap();
        assert_eq!(interval.from_boundary(), "20150000");
        let bounds = query_bounds(&interval, &est()).unwrap();
        assert_eq!(bounds.from.as_deref(), Some("2015-01-01T00:00:00-05:00"));
        assert_eq!(bounds.to.as_deref(), Some("2015-12-31T23:59:59-05:00"));
    }

    #[test]
    fn test_row_iter_stops_after_error() {
        let ts = |d| Utc.with_ymd_and_hms(2015, 1, d, 12, 0, 0).unwrap();
        let data = TimeSeriesData {
            unique_id: "u".to_string(),
            points: (1..=3).map(|d| Point::new(ts(d), d as f64, d.to_string())).collect(),
            approvals: Vec::new(),
            qualifiers: vec![Qualifier::new("UNKNOWN", ts(2), ts(2))],
        };

        let rows: Vec<_> = RowIter::new(data, est(), RemarkTable::new(), RowShape::Daily).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_ok());
        assert_eq!(rows[1], Err(RdbError::MissingRemarkCode("UNKNOWN".to_string())));
    }
}
