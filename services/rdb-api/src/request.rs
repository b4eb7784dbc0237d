//! Retrieval requests and their validation.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use rdb_common::{LocationIdentifier, RdbError, RdbResult};
use upstream::PointSource;

/// Kind of values requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Daily values (`DV`).
    Daily,
    /// Unit (instantaneous) values (`UV`).
    Unit,
}

impl FromStr for DataType {
    type Err = RdbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DV" => Ok(DataType::Daily),
            "UV" => Ok(DataType::Unit),
            other => Err(RdbError::validation(
                "t",
                format!("data type \"{}\" is not DV or UV", other),
            )),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Daily => write!(f, "DV"),
            DataType::Unit => write!(f, "UV"),
        }
    }
}

/// Daily statistic code → catalog computation identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticTable {
    computations: HashMap<String, String>,
}

impl StatisticTable {
    pub fn from_map(computations: HashMap<String, String>) -> Self {
        Self { computations }
    }

    pub fn computation(&self, statistic_code: &str) -> Option<&str> {
        self.computations.get(statistic_code).map(String::as_str)
    }

    pub fn into_map(self) -> HashMap<String, String> {
        self.computations
    }
}

impl Default for StatisticTable {
    fn default() -> Self {
        let computations = [
            ("00001", "Max"),
            ("00002", "Min"),
            ("00003", "Mean"),
            ("00006", "Sum"),
            ("00008", "Median"),
        ]
        .into_iter()
        .map(|(code, computation)| (code.to_string(), computation.to_string()))
        .collect();

        Self { computations }
    }
}

/// How a request maps onto the catalog and the point source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Computation {
    pub identifier: Option<String>,
    pub period: String,
    pub source: PointSource,
}

/// A validated retrieval request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdbRequest {
    pub data_type: DataType,
    pub location: LocationIdentifier,
    /// 5-digit NWIS parameter code.
    pub parameter_code: String,
    /// Statistic code for daily values, UV type letter for unit values.
    pub stat_or_uv_type: String,
    pub begin: String,
    pub end: String,
    pub water_year: bool,
    pub suppress_rounding: bool,
}

impl RdbRequest {
    /// Map the statistic or UV type onto a catalog computation.
    pub fn computation(&self, statistics: &StatisticTable) -> RdbResult<Computation> {
        match self.data_type {
            DataType::Daily => {
                let identifier = statistics.computation(&self.stat_or_uv_type).ok_or_else(|| {
                    RdbError::validation(
                        "s",
                        format!("unsupported statistic code \"{}\"", self.stat_or_uv_type),
                    )
                })?;
                Ok(Computation {
                    identifier: Some(identifier.to_string()),
                    period: "Daily".to_string(),
                    source: PointSource::Corrected,
                })
            }
            DataType::Unit => {
                let source = match self.stat_or_uv_type.as_str() {
                    "C" | "E" => PointSource::Corrected,
                    "M" => PointSource::Raw,
                    other => {
                        return Err(RdbError::validation(
                            "s",
                            format!("UV type \"{}\" is not C, E or M", other),
                        ))
                    }
                };
                Ok(Computation {
                    identifier: Some("Instantaneous".to_string()),
                    period: "Points".to_string(),
                    source,
                })
            }
        }
    }
}

/// Query string of the RDB route.
///
/// Short names follow the legacy service (`t`, `a`, `n`, ...); the long
/// names are accepted too.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RdbQueryParams {
    #[serde(alias = "t")]
    pub data_type: Option<String>,
    #[serde(alias = "a")]
    pub agency: Option<String>,
    #[serde(alias = "n")]
    pub site: Option<String>,
    #[serde(alias = "p")]
    pub parameter: Option<String>,
    #[serde(alias = "s")]
    pub stat: Option<String>,
    #[serde(alias = "b")]
    pub begin: Option<String>,
    #[serde(alias = "e")]
    pub end: Option<String>,
    #[serde(alias = "w")]
    pub water_year: Option<String>,
    #[serde(alias = "r")]
    pub suppress_rounding: Option<String>,
}

fn required<'a>(value: &'a Option<String>, name: &str) -> RdbResult<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(RdbError::validation(name, "required parameter is missing")),
    }
}

fn flag(value: &Option<String>, name: &str) -> RdbResult<bool> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "true" | "t" | "y" | "yes" | "1" => Ok(true),
            "false" | "f" | "n" | "no" | "0" => Ok(false),
            _ => Err(RdbError::validation(name, format!("\"{}\" is not a flag", v))),
        },
    }
}

impl RdbQueryParams {
    pub fn into_request(self) -> RdbResult<RdbRequest> {
        let data_type: DataType = required(&self.data_type, "t")?.parse()?;

        // `n` may carry the agency itself, as "<site>-<agency>".
        let site: LocationIdentifier = required(&self.site, "n")?.parse()?;
        let location = match self.agency.as_deref().map(str::trim) {
            Some(agency) if !agency.is_empty() => LocationIdentifier::new(agency, site.site_number),
            _ => site,
        };

        let parameter_code = required(&self.parameter, "p")?.to_string();
        if parameter_code.len() != 5 || !parameter_code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RdbError::validation(
                "p",
                format!("parameter code \"{}\" is not 5 digits", parameter_code),
            ));
        }

        let stat_or_uv_type = match data_type {
            DataType::Daily => required(&self.stat, "s")?.to_string(),
            DataType::Unit => required(&self.stat, "s")?.to_ascii_uppercase(),
        };

        Ok(RdbRequest {
            data_type,
            location,
            parameter_code,
            stat_or_uv_type,
            begin: self.begin.unwrap_or_default().trim().to_string(),
            end: self.end.unwrap_or_default().trim().to_string(),
            water_year: flag(&self.water_year, "w")?,
            suppress_rounding: flag(&self.suppress_rounding, "r")?,
        })
    }
}
