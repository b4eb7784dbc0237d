//! Site location identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RdbError;

/// Agency assumed when a location identifier carries none.
pub const DEFAULT_AGENCY: &str = "USGS";

/// A site as the series catalog names it: `<site>` for sites owned by the
/// default agency, `<site>-<agency>` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationIdentifier {
    pub agency_code: String,
    pub site_number: String,
}

impl LocationIdentifier {
    pub fn new(agency_code: impl Into<String>, site_number: impl Into<String>) -> Self {
        let agency_code = agency_code.into();
        let agency_code = if agency_code.trim().is_empty() {
            DEFAULT_AGENCY.to_string()
        } else {
            agency_code.trim().to_string()
        };

        Self {
            agency_code,
            site_number: site_number.into().trim().to_string(),
        }
    }

    pub fn is_default_agency(&self) -> bool {
        self.agency_code == DEFAULT_AGENCY
    }
}

impl FromStr for LocationIdentifier {
    type Err = RdbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();

        let (site, agency) = match token.split_once('-') {
            Some((site, agency)) => (site, agency),
            None => (token, DEFAULT_AGENCY),
        };

        if site.is_empty() {
            return Err(RdbError::validation("site", format!("no site number in \"{}\"", s)));
        }
        if agency.is_empty() {
            return Err(RdbError::validation("agency", format!("empty agency in \"{}\"", s)));
        }

        Ok(Self::new(agency, site))
    }
}

impl fmt::Display for LocationIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default_agency() {
            write!(f, "{}", self.site_number)
        } else {
            write!(f, "{}-{}", self.site_number, self.agency_code)
        }
    }
}
