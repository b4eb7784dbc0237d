//! Time-series descriptions and primary-series selection.

use serde::{Deserialize, Serialize};

use rdb_common::{LocationIdentifier, RdbError, RdbResult};

/// Extended attribute marking the canonical series of a location/parameter.
pub const PRIMARY_FLAG: &str = "PRIMARY_FLAG";
pub const PRIMARY_VALUE: &str = "Primary";

/// A name/value pair attached to a series by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ExtendedAttribute {
    pub name: String,

    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    /// Attribute values are untyped JSON upstream (string, number or null).
    #[serde(default)]
    pub value: serde_json::Value,
}

impl ExtendedAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_: Some("String".to_string()),
            value: serde_json::Value::String(value.into()),
        }
    }

    fn is_primary_flag(&self) -> bool {
        self.name == PRIMARY_FLAG && self.value.as_str() == Some(PRIMARY_VALUE)
    }
}

/// One candidate from `GetTimeSeriesDescriptionList`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TimeSeriesDescription {
    /// Human-readable identifier, e.g. `Discharge.ft^3/s.Mean@01010000`.
    pub identifier: String,

    /// Opaque id used for data requests.
    pub unique_id: String,

    pub location_identifier: String,

    #[serde(default)]
    pub sub_location_identifier: String,

    #[serde(default)]
    pub parameter: String,

    #[serde(default)]
    pub unit: String,

    #[serde(default)]
    pub computation_identifier: String,

    #[serde(default)]
    pub computation_period_identifier: String,

    #[serde(default)]
    pub extended_attributes: Vec<ExtendedAttribute>,
}

impl TimeSeriesDescription {
    pub fn new(identifier: impl Into<String>, unique_id: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let location_identifier = identifier
            .rsplit_once('@')
            .map(|(_, loc)| loc.to_string())
            .unwrap_or_default();

        Self {
            identifier,
            unique_id: unique_id.into(),
            location_identifier,
            sub_location_identifier: String::new(),
            parameter: String::new(),
            unit: String::new(),
            computation_identifier: String::new(),
            computation_period_identifier: String::new(),
            extended_attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: ExtendedAttribute) -> Self {
        self.extended_attributes.push(attribute);
        self
    }

    /// Flag this series as the primary one for its location and parameter.
    pub fn primary(self) -> Self {
        self.with_attribute(ExtendedAttribute::new(PRIMARY_FLAG, PRIMARY_VALUE))
    }

    pub fn is_primary(&self) -> bool {
        self.extended_attributes.iter().any(ExtendedAttribute::is_primary_flag)
    }
}

/// `GetTimeSeriesDescriptionList` response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimeSeriesDescriptionList {
    #[serde(default)]
    pub time_series_descriptions: Vec<TimeSeriesDescription>,
}

/// Reduce catalog candidates to the one canonical series.
///
/// A lone candidate wins unconditionally. With several, exactly one of
/// them must carry `PRIMARY_FLAG=Primary`; no primary or several primaries
/// is an error rather than an arbitrary pick.
pub fn select_primary(
    candidates: Vec<TimeSeriesDescription>,
    location: &LocationIdentifier,
) -> RdbResult<TimeSeriesDescription> {
    let mut candidates = candidates;

    match candidates.len() {
        0 => Err(RdbError::NotFound(format!(
            "no time series found for location {}",
            location
        ))),
        1 => Ok(candidates.remove(0)),
        _ => {
            let mut primaries: Vec<TimeSeriesDescription> =
                candidates.into_iter().filter(|c| c.is_primary()).collect();

            if primaries.len() == 1 {
                return Ok(primaries.remove(0));
            }

            Err(RdbError::AmbiguousSeries {
                location: location.to_string(),
                identifiers: primaries.into_iter().map(|c| c.identifier).collect(),
            })
        }
    }
}
