//! Common test fixtures for aq2rdb tests.
//!
//! Pre-built sites, series and point data covering the scenarios the
//! pipeline tests exercise.

use chrono::{DateTime, TimeZone, Utc};

use rdb_common::{LocationIdentifier, SiteTimeZone};
use rdb_protocol::{
    Approval, ParameterMetadata, Point, Qualifier, QualifierMetadata, TimeSeriesData,
    TimeSeriesDescription,
};
use upstream::SiteRecord;

/// Common site definitions.
pub mod sites {
    /// A USGS site in Maine, Eastern time with daylight saving.
    pub const MAINE: (&str, &str, &str, &str, bool) = (
        "USGS",
        "01010000",
        "St. John River at Ninemile Bridge, Maine",
        "EST",
        true,
    );

    /// A Newfoundland site that does not observe daylight saving.
    pub const NEWFOUNDLAND: (&str, &str, &str, &str, bool) =
        ("USGS", "02ZK001", "Rocky River near Colinet", "NST", false);

    /// A Colorado site owned by a cooperator agency.
    pub const COLORADO_COOP: (&str, &str, &str, &str, bool) = (
        "CODWR",
        "393109104464500",
        "Cherry Creek at Denver",
        "MST",
        true,
    );
}

/// UTC timestamp shorthand.
pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
        .unwrap_or_else(|| panic!("invalid fixture timestamp {year}-{month}-{day}"))
}

/// Build a site record from one of the [`sites`] tuples.
pub fn site(definition: (&str, &str, &str, &str, bool)) -> SiteRecord {
    let (agency, number, name, tz_cd, observed) = definition;
    SiteRecord {
        location: LocationIdentifier::new(agency, number),
        station_name: name.to_string(),
        zone: SiteTimeZone::new(tz_cd, observed).unwrap_or_else(|e| panic!("{e}")),
    }
}

/// The site service's RDB response for one site.
pub fn site_rdb(definition: (&str, &str, &str, &str, bool)) -> String {
    let (agency, number, name, tz_cd, observed) = definition;
    format!(
        "#\n# US Geological Survey\n#\n\
         agency_cd\tsite_no\tstation_nm\tsite_tp_cd\ttz_cd\tlocal_time_fg\n\
         5s\t15s\t50s\t7s\t6s\t1s\n\
         {agency}\t{number}\t{name}\tST\t{tz_cd}\t{}\n",
        if observed { "Y" } else { "N" }
    )
}

/// Discharge, NWIS parameter code 00060.
pub fn discharge() -> ParameterMetadata {
    ParameterMetadata {
        identifier: "Discharge".to_string(),
        parameter_id: "00060".to_string(),
        display_name: "Discharge".to_string(),
        unit_identifier: "ft^3/s".to_string(),
    }
}

/// Gage height, NWIS parameter code 00065.
pub fn gage_height() -> ParameterMetadata {
    ParameterMetadata {
        identifier: "Gage height".to_string(),
        parameter_id: "00065".to_string(),
        display_name: "Gage height".to_string(),
        unit_identifier: "ft".to_string(),
    }
}

/// A daily-mean discharge series at `location`.
pub fn daily_mean_series(location: &LocationIdentifier, label: &str, unique_id: &str) -> TimeSeriesDescription {
    let mut series = TimeSeriesDescription::new(
        format!("Discharge.ft^3/s.{}@{}", label, location),
        unique_id,
    );
    series.parameter = "Discharge".to_string();
    series.unit = "ft^3/s".to_string();
    series.computation_identifier = "Mean".to_string();
    series.computation_period_identifier = "Daily".to_string();
    series
}

/// An instantaneous series at `location`.
pub fn instant_series(location: &LocationIdentifier, label: &str, unique_id: &str) -> TimeSeriesDescription {
    let mut series = TimeSeriesDescription::new(
        format!("Discharge.ft^3/s.{}@{}", label, location),
        unique_id,
    );
    series.parameter = "Discharge".to_string();
    series.unit = "ft^3/s".to_string();
    series.computation_identifier = "Instantaneous".to_string();
    series.computation_period_identifier = "Points".to_string();
    series
}

/// Approval spanning all of `[start, end]`.
pub fn approval(level: i32, start: DateTime<Utc>, end: DateTime<Utc>) -> Approval {
    Approval {
        approval_level: level,
        level_description: match level {
            1200 => "Approved",
            1100 => "Analyzed",
            _ => "Working",
        }
        .to_string(),
        start_time: start,
        end_time: end,
    }
}

/// Point data with a uniform value step and no approvals or qualifiers.
pub fn series_data(unique_id: &str, timestamps: &[DateTime<Utc>]) -> TimeSeriesData {
    TimeSeriesData {
        unique_id: unique_id.to_string(),
        points: timestamps
            .iter()
            .enumerate()
            .map(|(i, ts)| {
                let value = 10.0 + i as f64;
                Point::new(*ts, value, format!("{:.1}", value))
            })
            .collect(),
        approvals: Vec::new(),
        qualifiers: Vec::new(),
    }
}

/// Qualifier interval shorthand.
pub fn qualifier(identifier: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Qualifier {
    Qualifier::new(identifier, start, end)
}

/// The qualifier domain most tests use: estimated and ice-affected.
pub fn qualifier_domain() -> Vec<QualifierMetadata> {
    vec![
        QualifierMetadata {
            identifier: "ESTIMATED".to_string(),
            code: "E".to_string(),
            display_name: "Estimated".to_string(),
        },
        QualifierMetadata {
            identifier: "ICE".to_string(),
            code: "I".to_string(),
            display_name: "Ice affected".to_string(),
        },
    ]
}
