//! Legacy site time-zone codes.
//!
//! Site records carry a legacy zone code (`EST`, `PST`, `ZP-11`, ...) and a
//! flag saying whether the site observes local (daylight-saving) time. Each
//! pair maps to an IANA zone through [`ZONE_TABLE`].
//!
//! `NST` (Newfoundland) and `SAT` (South Australia) sit on half-hour
//! offsets, so there is no `Etc/GMT` zone to fall back on when a site does
//! not observe daylight time. For those two codes the table points at the
//! geographic zone, and [`SiteTimeZone::resolve`] bypasses it whenever that
//! zone would be in daylight time.
//!
//! Where the zone database only has a numeric abbreviation (the `Etc/GMT`
//! zones), the zone label falls back to the legacy code.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::{OffsetComponents, Tz};
use serde::{Deserialize, Serialize};

use crate::error::{RdbError, RdbResult};
use crate::interval::Edge;

/// One row of the legacy zone table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneEntry {
    pub code: &'static str,
    /// Zone used when the site observes local time.
    pub observed: &'static str,
    /// Zone used when it does not.
    pub standard: &'static str,
    /// Nominal standard offset, POSIX sign convention (minutes west of UTC).
    pub posix_offset_minutes: i32,
    /// Literal offset label for the fixed-offset branch.
    pub offset_label: &'static str,
}

const fn entry(
    code: &'static str,
    observed: &'static str,
    standard: &'static str,
    posix_offset_minutes: i32,
    offset_label: &'static str,
) -> ZoneEntry {
    ZoneEntry {
        code,
        observed,
        standard,
        posix_offset_minutes,
        offset_label,
    }
}

pub static ZONE_TABLE: &[ZoneEntry] = &[
    entry("AKST", "America/Anchorage", "Etc/GMT+9", 540, "-09:00"),
    entry("AST", "America/Halifax", "Etc/GMT+4", 240, "-04:00"),
    entry("AWST", "Australia/Perth", "Etc/GMT-8", -480, "+08:00"),
    entry("CET", "Europe/Paris", "Etc/GMT-1", -60, "+01:00"),
    entry("CST", "America/Chicago", "Etc/GMT+6", 360, "-06:00"),
    entry("EET", "Europe/Athens", "Etc/GMT-2", -120, "+02:00"),
    entry("EST", "America/New_York", "Etc/GMT+5", 300, "-05:00"),
    entry("GMT", "Europe/London", "Etc/GMT", 0, "+00:00"),
    entry("GST", "Pacific/Guam", "Etc/GMT-10", -600, "+10:00"),
    entry("HST", "Pacific/Honolulu", "Etc/GMT+10", 600, "-10:00"),
    entry("IDLE", "Pacific/Auckland", "Etc/GMT-12", -720, "+12:00"),
    entry("IDLW", "Etc/GMT+12", "Etc/GMT+12", 720, "-12:00"),
    entry("JST", "Asia/Tokyo", "Etc/GMT-9", -540, "+09:00"),
    entry("MST", "America/Denver", "Etc/GMT+7", 420, "-07:00"),
    entry("NST", "America/St_Johns", "America/St_Johns", 210, "-03:30"),
    entry("NZT", "Pacific/Auckland", "Etc/GMT-12", -720, "+12:00"),
    entry("PST", "America/Los_Angeles", "Etc/GMT+8", 480, "-08:00"),
    entry("SAT", "Australia/Adelaide", "Australia/Adelaide", -570, "+09:30"),
    entry("SST", "Pacific/Pago_Pago", "Etc/GMT+11", 660, "-11:00"),
    entry("UTC", "Etc/UTC", "Etc/UTC", 0, "+00:00"),
    entry("ZP-11", "Etc/GMT+11", "Etc/GMT+11", 660, "-11:00"),
    entry("ZP-2", "Etc/GMT+2", "Etc/GMT+2", 120, "-02:00"),
    entry("ZP-3", "Etc/GMT+3", "Etc/GMT+3", 180, "-03:00"),
    entry("ZP11", "Etc/GMT-11", "Etc/GMT-11", -660, "+11:00"),
    entry("ZP4", "Etc/GMT-4", "Etc/GMT-4", -240, "+04:00"),
    entry("ZP5", "Etc/GMT-5", "Etc/GMT-5", -300, "+05:00"),
    entry("ZP6", "Etc/GMT-6", "Etc/GMT-6", -360, "+06:00"),
];

/// Codes whose non-observing sites are rendered at a frozen offset.
const FIXED_OFFSET_CODES: [&str; 2] = ["NST", "SAT"];

/// Look up a legacy zone code.
pub fn lookup(code: &str) -> RdbResult<&'static ZoneEntry> {
    let code = code.trim();
    ZONE_TABLE
        .iter()
        .find(|e| e.code.eq_ignore_ascii_case(code))
        .ok_or_else(|| RdbError::UnknownZone(code.to_string()))
}

/// A point in time as it appears in an RDB row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDateTime {
    /// `YYYYMMDD`
    pub date: String,
    /// `hhmmss`
    pub time: String,
    pub zone_label: String,
}

/// The `(tz_cd, local_time_fg)` pair from a site record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteTimeZone {
    pub zone_code: String,
    pub local_time_observed: bool,
}

impl SiteTimeZone {
    /// Build a descriptor, rejecting codes missing from the table.
    pub fn new(zone_code: impl Into<String>, local_time_observed: bool) -> RdbResult<Self> {
        let zone_code = zone_code.into().trim().to_string();
        lookup(&zone_code)?;
        Ok(Self {
            zone_code,
            local_time_observed,
        })
    }

    pub fn entry(&self) -> RdbResult<&'static ZoneEntry> {
        lookup(&self.zone_code)
    }

    /// The IANA zone this site's timestamps are formatted in.
    pub fn zone(&self) -> RdbResult<Tz> {
        let entry = self.entry()?;
        let name = if self.local_time_observed {
            entry.observed
        } else {
            entry.standard
        };
        name.parse::<Tz>()
            .map_err(|_| RdbError::UnknownZone(format!("{} ({})", self.zone_code, name)))
    }

    /// Render `instant` as this site's local date, time and zone label.
    pub fn resolve(&self, instant: DateTime<Utc>) -> RdbResult<LocalDateTime> {
        let entry = self.entry()?;
        let tz = self.zone()?;
        let local = instant.with_timezone(&tz);

        let frozen = !self.local_time_observed
            && FIXED_OFFSET_CODES.contains(&entry.code)
            && local.offset().dst_offset() != Duration::zero();

        if frozen {
            let shifted = instant.naive_utc() - Duration::minutes(entry.posix_offset_minutes as i64);
            return Ok(LocalDateTime {
                date: shifted.format("%Y%m%d").to_string(),
                time: shifted.format("%H%M%S").to_string(),
                zone_label: entry.offset_label.to_string(),
            });
        }

        // `Etc/GMT` zones abbreviate to a bare offset such as `-07`.
        let abbreviation = local.format("%Z").to_string();
        let zone_label = if abbreviation.starts_with(['+', '-']) {
            entry.code.to_string()
        } else {
            abbreviation
        };

        Ok(LocalDateTime {
            date: local.format("%Y%m%d").to_string(),
            time: local.format("%H%M%S").to_string(),
            zone_label,
        })
    }

    /// Attach this site's offset to a local wall-clock time.
    ///
    /// Sites that do not observe local time always use the nominal
    /// standard offset. Ambiguous wall-clock times (clocks falling back)
    /// take the earlier instant for a begin edge and the later one for an
    /// end edge; times skipped by a spring-forward use the standard offset.
    pub fn localize(&self, local: NaiveDateTime, edge: Edge) -> RdbResult<DateTime<FixedOffset>> {
        let entry = self.entry()?;

        if !self.local_time_observed {
            let offset = FixedOffset::west_opt(entry.posix_offset_minutes * 60)
                .ok_or_else(|| RdbError::UnknownZone(self.zone_code.clone()))?;
            return offset
                .from_local_datetime(&local)
                .single()
                .ok_or_else(|| RdbError::format(local.to_string(), "cannot be localized"));
        }

        let tz = self.zone()?;
        let dt = match tz.from_local_datetime(&local) {
            chrono::LocalResult::Single(dt) => dt,
            chrono::LocalResult::Ambiguous(early, late) => match edge {
                Edge::Begin => early,
                Edge::End => late,
            },
            chrono::LocalResult::None => {
                let utc = local + Duration::minutes(entry.posix_offset_minutes as i64);
                tz.from_utc_datetime(&utc)
            }
        };

        Ok(dt.with_timezone(&dt.offset().fix()))
    }
}

/// Resolve a timestamp for a `(zone code, local-time flag)` pair.
pub fn resolve(
    zone_code: &str,
    local_time_observed: bool,
    point_in_time: DateTime<Utc>,
) -> RdbResult<LocalDateTime> {
    SiteTimeZone::new(zone_code, local_time_observed)?.resolve(point_in_time)
}
