//! Common types and utilities shared across the aq2rdb crates.

pub mod error;
pub mod interval;
pub mod location;
pub mod timezone;

pub use error::{RdbError, RdbResult};
pub use interval::{DayInterval, Interval, SecondInterval};
pub use location::{LocationIdentifier, DEFAULT_AGENCY};
pub use timezone::{LocalDateTime, SiteTimeZone, ZoneEntry};
