//! Site service responses as NWIS Web Services actually sends them.

use rdb_common::{LocationIdentifier, RdbError};
use upstream::aquarius::{points_query_params, series_query_params};
use upstream::{parse_site_table, PointSource, PointsQuery, SeriesQuery};

const EXPANDED: &str = "#\r\n\
# US Geological Survey\r\n\
# retrieved: 2015-10-14 10:51:52 -04:00\t(caas01)\r\n\
#\r\n\
# The Site File stores location and general information about groundwater,\r\n\
# surface water, and meteorological sites\r\n\
#\r\n\
agency_cd\tsite_no\tstation_nm\tsite_tp_cd\tlat_va\tlong_va\tdec_lat_va\tdec_long_va\ttz_cd\tlocal_time_fg\tdrain_area_va\r\n\
5s\t15s\t50s\t7s\t11s\t12s\t16s\t16s\t6s\t1s\t8s\r\n\
USGS\t09380000\tCOLORADO RIVER AT LEES FERRY, AZ\tST\t365152\t1113515\t36.8644\t-111.5876\tMST\tN\t111800\r\n";

// ============================================================================
// parse_site_table
// ============================================================================

#[test]
fn test_expanded_output_with_crlf() {
    let site = parse_site_table(EXPANDED).unwrap();
    assert_eq!(site.location, LocationIdentifier::new("USGS", "09380000"));
    assert_eq!(site.station_name, "COLORADO RIVER AT LEES FERRY, AZ");
    assert_eq!(site.zone.zone_code, "MST");
    assert!(!site.zone.local_time_observed);
}

#[test]
fn test_columns_found_by_name_not_position() {
    let text = "tz_cd\tlocal_time_fg\tstation_nm\tsite_no\tagency_cd\n\
6s\t1s\t50s\t15s\t5s\n\
HST\tN\tWAILUKU RIVER\t16704000\tUSGS\n";
    let site = parse_site_table(text).unwrap();
    assert_eq!(site.location.site_number, "16704000");
    assert_eq!(site.zone.zone_code, "HST");
}

#[test]
fn test_no_data_rows_is_not_found() {
    let text = "# No sites found matching all criteria\n";
    assert!(matches!(parse_site_table(text), Err(RdbError::NotFound(_))));
}

// ============================================================================
// query parameters
// ============================================================================

#[test]
fn test_default_agency_location_is_bare_site_number() {
    let query = SeriesQuery {
        location: LocationIdentifier::new("USGS", "09380000"),
        parameter: "Discharge".to_string(),
        computation_identifier: None,
        computation_period_identifier: "Points".to_string(),
    };
    let params = series_query_params(&query);
    assert!(params.contains(&("LocationIdentifier", "09380000".to_string())));
    assert!(params.contains(&("ComputationPeriodIdentifier", "Points".to_string())));
}

#[test]
fn test_points_params_with_both_bounds() {
    let query = PointsQuery {
        unique_id: "0f2c".to_string(),
        query_from: Some("2015-01-01T00:00:00-07:00".to_string()),
        query_to: Some("2015-12-31T23:59:59-07:00".to_string()),
        apply_rounding: true,
        source: PointSource::Raw,
    };
    let params = points_query_params(&query);
    assert_eq!(params.len(), 4);
    assert!(params.contains(&("ApplyRounding", "true".to_string())));
    assert!(params.contains(&("QueryFrom", "2015-01-01T00:00:00-07:00".to_string())));
}
