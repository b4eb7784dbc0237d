//! AQUARIUS time-series types and RDB rendering.
//!
//! This crate holds the pure parts of an aq2rdb retrieval: the JSON shapes
//! returned by the AQUARIUS Publish API, primary-series selection, and the
//! RDB header and row formatting. Nothing in here performs I/O.
//!
//! # Example
//!
//! ```rust
//! use rdb_protocol::{render_row, Point, RemarkTable, RowShape};
//! use rdb_common::LocalDateTime;
//! use chrono::{TimeZone, Utc};
//!
//! let point = Point::new(Utc.with_ymd_and_hms(2015, 1, 1, 5, 0, 0).unwrap(), 12.3, "12.3");
//! let local = LocalDateTime {
//!     date: "20150101".to_string(),
//!     time: "000000".to_string(),
//!     zone_label: "EST".to_string(),
//! };
//! let row = render_row(&point, &local, &[], &RemarkTable::default(), 'A', RowShape::Daily).unwrap();
//! assert_eq!(row, "20150101\t\t12.3\t \t\tC\tA\n");
//! ```

pub mod header;
pub mod points;
pub mod rows;
pub mod series;

pub use header::RdbHeader;
pub use points::{
    Approval, ParameterList, ParameterMetadata, Point, PointValue, Qualifier, QualifierList,
    QualifierMetadata, RemarkTable, TimeSeriesData,
};
pub use rows::{approval_char, remark_for, render_row, RowShape};
pub use series::{select_primary, ExtendedAttribute, TimeSeriesDescription, TimeSeriesDescriptionList};

/// AQUARIUS Publish API operation names.
pub mod operations {
    pub const GET_AUTH_TOKEN: &str = "GetAuthToken";
    pub const GET_PARAMETER_LIST: &str = "GetParameterList";
    pub const GET_QUALIFIER_LIST: &str = "GetQualifierList";
    pub const GET_TIME_SERIES_DESCRIPTION_LIST: &str = "GetTimeSeriesDescriptionList";
    pub const GET_TIME_SERIES_CORRECTED_DATA: &str = "GetTimeSeriesCorrectedData";
    pub const GET_TIME_SERIES_RAW_DATA: &str = "GetTimeSeriesRawData";
}
