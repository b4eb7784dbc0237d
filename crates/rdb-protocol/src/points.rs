//! Point data, approvals, qualifiers and the remark-code table.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `{"Numeric": 12.3, "Display": "12.3"}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PointValue {
    #[serde(default)]
    pub numeric: Option<f64>,
    #[serde(default)]
    pub display: String,
}

/// A single time-series point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Point {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub value: PointValue,
}

impl Point {
    pub fn new(timestamp: DateTime<Utc>, numeric: f64, display: impl Into<String>) -> Self {
        Self {
            timestamp,
            value: PointValue {
                numeric: Some(numeric),
                display: display.into(),
            },
        }
    }

    pub fn display_value(&self) -> &str {
        &self.value.display
    }
}

/// An approval level applied over a time range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Approval {
    pub approval_level: i32,
    #[serde(default)]
    pub level_description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl Approval {
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        &self.start_time <= instant && instant <= &self.end_time
    }
}

/// A qualifier applied over a time range of a series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Qualifier {
    pub identifier: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl Qualifier {
    pub fn new(
        identifier: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            start_time,
            end_time,
        }
    }

    /// Inclusive at both ends.
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        &self.start_time <= instant && instant <= &self.end_time
    }
}

/// `GetTimeSeriesCorrectedData` / `GetTimeSeriesRawData` response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimeSeriesData {
    #[serde(default)]
    pub unique_id: String,
    #[serde(default)]
    pub points: Vec<Point>,
    #[serde(default)]
    pub approvals: Vec<Approval>,
    #[serde(default)]
    pub qualifiers: Vec<Qualifier>,
}

/// One entry of the site-independent qualifier domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct QualifierMetadata {
    pub identifier: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub display_name: String,
}

/// `GetQualifierList` response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QualifierList {
    #[serde(default)]
    pub qualifiers: Vec<QualifierMetadata>,
}

/// Qualifier identifier → remark code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemarkTable {
    codes: HashMap<String, String>,
}

impl RemarkTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identifier: impl Into<String>, code: impl Into<String>) {
        self.codes.insert(identifier.into(), code.into());
    }

    pub fn code(&self, identifier: &str) -> Option<&str> {
        self.codes.get(identifier).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl FromIterator<QualifierMetadata> for RemarkTable {
    fn from_iter<I: IntoIterator<Item = QualifierMetadata>>(iter: I) -> Self {
        Self {
            codes: iter.into_iter().map(|q| (q.identifier, q.code)).collect(),
        }
    }
}

/// A parameter known to the catalog, keyed by its 5-digit NWIS code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterMetadata {
    pub identifier: String,
    #[serde(default)]
    pub parameter_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub unit_identifier: String,
}

/// `GetParameterList` response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterList {
    #[serde(default)]
    pub parameters: Vec<ParameterMetadata>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_deserialize_corrected_data() {
        let json = r#"{
            "UniqueId": "a1b2c3",
            "Points": [
                {"Timestamp": "2015-01-01T00:00:00.0000000-05:00", "Value": {"Numeric": 12.3, "Display": "12.3"}},
                {"Timestamp": "2015-01-02T00:00:00.0000000-05:00", "Value": {"Display": ""}}
            ],
            "Approvals": [{
                "ApprovalLevel": 1200,
                "LevelDescription": "Approved",
                "StartTime": "2014-10-01T00:00:00.0000000-05:00",
                "EndTime": "9999-12-31T23:59:59.9999999+00:00"
            }],
            "Qualifiers": [{
                "Identifier": "ICE",
                "StartTime": "2015-01-02T00:00:00.0000000-05:00",
                "EndTime": "2015-01-03T00:00:00.0000000-05:00"
            }]
        }"#;

        let data: TimeSeriesData = serde_json::from_str(json).unwrap();
        assert_eq!(data.points.len(), 2);
        assert_eq!(
            data.points[0].timestamp,
            Utc.with_ymd_and_hms(2015, 1, 1, 5, 0, 0).unwrap()
        );
        assert_eq!(data.points[0].display_value(), "12.3");
        assert_eq!(data.points[1].value.numeric, None);
        assert_eq!(data.approvals[0].approval_level, 1200);
        assert!(data.qualifiers[0].contains(&data.points[1].timestamp));
    }

    #[test]
    fn test_qualifier_bounds_are_inclusive() {
        let start = Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2015, 1, 2, 0, 0, 0).unwrap();
        let q = Qualifier::new("ICE", start, end);
        assert!(q.contains(&start));
        assert!(q.contains(&end));
        assert!(!q.contains(&(end + chrono::Duration::seconds(1))));
    }

    #[test]
    fn test_remark_table_from_qualifier_list() {
        let json = r#"{"Qualifiers": [
            {"Identifier": "ICE", "Code": "I", "DisplayName": "Ice affected"},
            {"Identifier": "EQUIP", "Code": "E", "DisplayName": "Equipment malfunction"}
        ]}"#;
        let list: QualifierList = serde_json::from_str(json).unwrap();
        let table: RemarkTable = list.qualifiers.into_iter().collect();
        assert_eq!(table.len(), 2);
        assert_eq!(table.code("ICE"), Some("I"));
        assert_eq!(table.code("BACKWATER"), None);
    }
}
