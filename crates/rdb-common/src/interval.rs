//! Interval boundary filling.
//!
//! Callers hand in partial tokens (`"2015"`, `"201503"`, `"20150301"`,
//! `"2015030112"`) and expect canonical boundaries back: 8 digits
//! (`YYYYMMDD`) for daily values, 14 digits (`YYYYMMDDhhmmss`) for
//! instantaneous values. In water-year mode the token is a year and the
//! boundaries are October 1 of the prior year through September 30.
//!
//! The all-zero and all-nine boundaries mean "beginning of time" and "end
//! of time" and are never turned into real dates.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{RdbError, RdbResult};

pub const DATE_WIDTH: usize = 8;
pub const DATE_TIME_WIDTH: usize = 14;

/// Year token meaning "no end".
const END_OF_TIME_YEAR: i32 = 9999;

/// True for the beginning-of-time sentinel at either width.
pub fn is_begin_of_time(boundary: &str) -> bool {
    matches!(boundary, "00000000" | "00000000000000")
}

/// True for the end-of-time sentinel at either width.
pub fn is_end_of_time(boundary: &str) -> bool {
    matches!(boundary, "99999999" | "99999999999999")
}

fn sentinel(digit: char, width: usize) -> String {
    std::iter::repeat(digit).take(width).collect()
}

/// Parse a water-year token. Up to four digits, optionally negative.
fn parse_water_year(raw: &str) -> RdbResult<i32> {
    let token = raw.trim();
    let digits = token.strip_prefix('-').unwrap_or(token);

    if digits.is_empty() || digits.len() > 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RdbError::format(raw, "expected a water year (e.g. 2015)"));
    }

    token
        .parse::<i32>()
        .map_err(|e| RdbError::format(raw, e.to_string()))
}

/// Right-truncate `raw` to `width` and right-pad it with `0`.
fn fit_width(raw: &str, width: usize) -> RdbResult<String> {
    let token = raw.trim();
    let clipped: String = token.chars().take(width).collect();

    if !clipped.chars().all(|c| c.is_ascii_digit()) {
        return Err(RdbError::format(raw, "expected digits only"));
    }

    Ok(format!("{:0<width$}", clipped, width = width))
}

/// Fill a daily begin boundary to 8 digits.
pub fn fill_begin_date(water_year: bool, raw: &str) -> RdbResult<String> {
    if water_year {
        let year = parse_water_year(raw)?;
        if year <= 0 {
            return Ok(sentinel('0', DATE_WIDTH));
        }
        return Ok(format!("{:04}1001", year - 1));
    }

    fit_width(raw, DATE_WIDTH)
}

/// Fill a daily end boundary to 8 digits.
///
/// An empty token means the series is wanted through its last point.
pub fn fill_end_date(water_year: bool, raw: &str) -> RdbResult<String> {
    if water_year {
        let year = parse_water_year(raw)?;
        if year == END_OF_TIME_YEAR {
            return Ok(sentinel('9', DATE_WIDTH));
        }
        if year <= 0 {
            return Ok(sentinel('0', DATE_WIDTH));
        }
        return Ok(format!("{:04}0930", year));
    }

    if raw.trim().is_empty() {
        return Ok(sentinel('9', DATE_WIDTH));
    }
    fit_width(raw, DATE_WIDTH)
}

/// Fill an instantaneous begin boundary to 14 digits.
pub fn fill_begin_date_time(water_year: bool, raw: &str) -> RdbResult<String> {
    if water_year {
        let year = parse_water_year(raw)?;
        if year <= 0 {
            return Ok(sentinel('0', DATE_TIME_WIDTH));
        }
        return Ok(format!("{:04}1001000000", year - 1));
    }

    fit_width(raw, DATE_TIME_WIDTH)
}

/// Fill an instantaneous end boundary to 14 digits.
///
/// A token without a time of day is taken to mean the whole day, so the
/// time is filled with `235959`; the end-of-time date gets nines instead.
pub fn fill_end_date_time(water_year: bool, raw: &str) -> RdbResult<String> {
    if water_year {
        let year = parse_water_year(raw)?;
        if year == END_OF_TIME_YEAR {
            return Ok(sentinel('9', DATE_TIME_WIDTH));
        }
        if year <= 0 {
            return Ok(sentinel('0', DATE_TIME_WIDTH));
        }
        return Ok(format!("{:04}0930235959", year));
    }

    let token = raw.trim();
    if token.is_empty() {
        return Ok(sentinel('9', DATE_TIME_WIDTH));
    }
    if token.len() <= DATE_WIDTH {
        let date = fit_width(token, DATE_WIDTH)?;
        let time = if is_end_of_time(&date) { "999999" } else { "235959" };
        return Ok(format!("{}{}", date, time));
    }

    fit_width(token, DATE_TIME_WIDTH)
}

/// Which side of an interval a boundary sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Begin,
    End,
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    (28..=31)
        .rev()
        .find(|day| NaiveDate::from_ymd_opt(year, month, *day).is_some())
        .unwrap_or(28)
}

fn digits_at(boundary: &str, range: std::ops::Range<usize>) -> RdbResult<u32> {
    boundary
        .get(range)
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(|| RdbError::format(boundary, "malformed canonical boundary"))
}

/// Turn a canonical boundary into a calendar date-time.
///
/// Zero-filled month and day fields are clamped to the first (begin) or
/// last (end) valid value, so `"201500000000"` spans all of 2015. A day
/// past the end of its month is clamped to the month's last day.
pub fn boundary_datetime(boundary: &str, edge: Edge) -> RdbResult<NaiveDateTime> {
    if boundary.len() != DATE_WIDTH && boundary.len() != DATE_TIME_WIDTH {
        return Err(RdbError::format(boundary, "boundary is not canonical width"));
    }

    let year = digits_at(boundary, 0..4)? as i32;
    let month = match (digits_at(boundary, 4..6)?, edge) {
        (0, Edge::Begin) => 1,
        (0, Edge::End) => 12,
        (m, _) if m > 12 => return Err(RdbError::format(boundary, "month out of range")),
        (m, _) => m,
    };

    let last_day = last_day_of_month(year, month);
    let day = match (digits_at(boundary, 6..8)?, edge) {
        (0, Edge::Begin) => 1,
        (0, Edge::End) => last_day,
        (d, _) => d.min(last_day),
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| RdbError::format(boundary, "not a calendar date"))?;

    let time = if boundary.len() == DATE_TIME_WIDTH {
        let (h, m, s) = (
            digits_at(boundary, 8..10)?,
            digits_at(boundary, 10..12)?,
            digits_at(boundary, 12..14)?,
        );
        NaiveTime::from_hms_opt(h, m, s)
            .ok_or_else(|| RdbError::format(boundary, "not a time of day"))?
    } else {
        let (h, m, s) = match edge {
            Edge::Begin => (0, 0, 0),
            Edge::End => (23, 59, 59),
        };
        NaiveTime::from_hms_opt(h, m, s)
            .ok_or_else(|| RdbError::format(boundary, "not a time of day"))?
    };

    Ok(date.and_time(time))
}

/// A `from`/`to` pair of canonical boundaries.
pub trait Interval {
    fn from_boundary(&self) -> &str;

    fn to_boundary(&self) -> &str;

    /// Lower bound as a date-time, `None` for the beginning of time.
    fn from_datetime(&self) -> RdbResult<Option<NaiveDateTime>> {
        let from = self.from_boundary();
        if is_begin_of_time(from) {
            return Ok(None);
        }
        boundary_datetime(from, Edge::Begin).map(Some)
    }

    /// Upper bound as a date-time, `None` for the end of time.
    fn to_datetime(&self) -> RdbResult<Option<NaiveDateTime>> {
        let to = self.to_boundary();
        if is_end_of_time(to) {
            return Ok(None);
        }
        boundary_datetime(to, Edge::End).map(Some)
    }
}

/// Daily-values interval with 8-digit boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayInterval {
    from: String,
    to: String,
}

impl DayInterval {
    pub fn new(water_year: bool, begin: &str, end: &str) -> RdbResult<Self> {
        Ok(Self {
            from: fill_begin_date(water_year, begin)?,
            to: fill_end_date(water_year, end)?,
        })
    }
}

impl Interval for DayInterval {
    fn from_boundary(&self) -> &str {
        &self.from
    }

    fn to_boundary(&self) -> &str {
        &self.to
    }
}

/// Instantaneous-values interval with 14-digit boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondInterval {
    from: String,
    to: String,
}

impl SecondInterval {
    pub fn new(water_year: bool, begin: &str, end: &str) -> RdbResult<Self> {
        Ok(Self {
            from: fill_begin_date_time(water_year, begin)?,
            to: fill_end_date_time(water_year, end)?,
        })
    }
}

impl Interval for SecondInterval {
    fn from_boundary(&self) -> &str {
        &self.from
    }

    fn to_boundary(&self) -> &str {
        &self.to
    }
}
