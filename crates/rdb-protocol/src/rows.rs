//! RDB row rendering.

use chrono::{DateTime, Utc};

use rdb_common::{LocalDateTime, RdbError, RdbResult};

use crate::points::{Approval, Point, Qualifier, RemarkTable};

/// Marker written to the TYPE column of daily-value rows (computed).
pub const DAILY_TYPE_MARKER: &str = "C";

/// Remark column for points without a qualifier.
const NO_REMARK: &str = " ";

/// Approval levels as numbered by AQUARIUS.
pub const APPROVED_LEVEL: i32 = 1200;
pub const IN_REVIEW_LEVEL: i32 = 1100;

/// Column layout of a retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowShape {
    /// DATE, TIME (empty), VALUE, REMARK, FLAGS, TYPE, QA
    Daily,
    /// DATE, TIME, TZCD, VALUE, REMARK, FLAGS, QA
    Instant,
}

impl RowShape {
    pub fn column_names(&self) -> &'static [&'static str] {
        match self {
            RowShape::Daily => &["DATE", "TIME", "VALUE", "REMARK", "FLAGS", "TYPE", "QA"],
            RowShape::Instant => &["DATE", "TIME", "TZCD", "VALUE", "REMARK", "FLAGS", "QA"],
        }
    }

    /// RDB column definitions (width + type letter).
    pub fn column_definitions(&self) -> &'static [&'static str] {
        match self {
            RowShape::Daily => &["8D", "6S", "16N", "1S", "32S", "1S", "1S"],
            RowShape::Instant => &["8D", "6S", "6S", "16N", "1S", "32S", "1S"],
        }
    }
}

/// Remark code for a point, lower-cased; `" "` when no qualifier applies.
///
/// The first qualifier whose interval contains the timestamp wins. Points
/// covered by more than one qualifier are not expected in practice and the
/// later matches are ignored.
pub fn remark_for(
    timestamp: &DateTime<Utc>,
    qualifiers: &[Qualifier],
    remarks: &RemarkTable,
) -> RdbResult<String> {
    let Some(qualifier) = qualifiers.iter().find(|q| q.contains(timestamp)) else {
        return Ok(NO_REMARK.to_string());
    };

    remarks
        .code(&qualifier.identifier)
        .map(str::to_lowercase)
        .ok_or_else(|| RdbError::MissingRemarkCode(qualifier.identifier.clone()))
}

/// QA column character for a point.
pub fn approval_char(timestamp: &DateTime<Utc>, approvals: &[Approval]) -> char {
    match approvals.iter().find(|a| a.contains(timestamp)) {
        Some(a) if a.approval_level == APPROVED_LEVEL => 'A',
        Some(a) if a.approval_level == IN_REVIEW_LEVEL => 'R',
        _ => 'P',
    }
}

/// Format one point as a newline-terminated, tab-separated RDB row.
pub fn render_row(
    point: &Point,
    local: &LocalDateTime,
    qualifiers: &[Qualifier],
    remarks: &RemarkTable,
    approval: char,
    shape: RowShape,
) -> RdbResult<String> {
    let remark = remark_for(&point.timestamp, qualifiers, remarks)?;
    let qa = approval.to_string();

    let fields: Vec<&str> = match shape {
        RowShape::Daily => vec![
            local.date.as_str(),
            "",
            point.display_value(),
            remark.as_str(),
            "",
            DAILY_TYPE_MARKER,
            qa.as_str(),
        ],
        RowShape::Instant => vec![
            local.date.as_str(),
            local.time.as_str(),
            local.zone_label.as_str(),
            point.display_value(),
            remark.as_str(),
            "",
            qa.as_str(),
        ],
    };

    let mut row = fields.join("\t");
    row.push('\n');
    Ok(row)
}
