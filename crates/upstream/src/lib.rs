//! Upstream collaborators for aq2rdb.
//!
//! Provides:
//! - Traits for the three services a retrieval talks to (site metadata,
//!   series catalog/point data, qualifier domain) plus authentication
//! - `reqwest` clients for NWIS Web Services and AQUARIUS Publish
//! - The process-wide authentication token and its refresh task

pub mod aquarius;
pub mod auth;
pub mod site;

use async_trait::async_trait;

use rdb_common::{LocationIdentifier, RdbError, RdbResult, SiteTimeZone};
use rdb_protocol::{ParameterMetadata, QualifierMetadata, TimeSeriesData, TimeSeriesDescription};

pub use aquarius::{AquariusClient, AquariusConfig};
pub use auth::{spawn_token_refresher, TokenHandle};
pub use site::{parse_site_table, NwisSiteClient};

/// Site metadata as reported by the site service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRecord {
    pub location: LocationIdentifier,
    pub station_name: String,
    pub zone: SiteTimeZone,
}

/// Candidate-series lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesQuery {
    pub location: LocationIdentifier,
    /// Catalog parameter identifier, e.g. `Discharge`.
    pub parameter: String,
    /// `Mean`, `Max`, ... for daily values, `Instantaneous` for unit values.
    pub computation_identifier: Option<String>,
    /// `Daily` or `Points`.
    pub computation_period_identifier: String,
}

/// Which flavor of point data to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointSource {
    Corrected,
    Raw,
}

/// Point-data request for one series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsQuery {
    pub unique_id: String,
    /// RFC 3339; `None` leaves the lower bound open.
    pub query_from: Option<String>,
    /// RFC 3339; `None` leaves the upper bound open.
    pub query_to: Option<String>,
    pub apply_rounding: bool,
    pub source: PointSource,
}

/// Site metadata service (NWIS site web service).
#[async_trait]
pub trait SiteService: Send + Sync {
    async fn site(&self, location: &LocationIdentifier) -> RdbResult<SiteRecord>;
}

/// Series catalog and point-data service.
#[async_trait]
pub trait SeriesService: Send + Sync {
    /// Look up a parameter by its 5-digit NWIS code.
    async fn parameter(&self, token: &str, parameter_code: &str) -> RdbResult<ParameterMetadata>;

    async fn find_series(
        &self,
        token: &str,
        query: &SeriesQuery,
    ) -> RdbResult<Vec<TimeSeriesDescription>>;

    async fn points(&self, token: &str, query: &PointsQuery) -> RdbResult<TimeSeriesData>;
}

/// Site-independent qualifier domain.
#[async_trait]
pub trait QualifierDomain: Send + Sync {
    async fn qualifiers(&self, token: &str) -> RdbResult<Vec<QualifierMetadata>>;
}

/// Obtains a fresh authentication token.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self) -> RdbResult<String>;
}

/// Map a transport failure onto the error taxonomy.
pub(crate) fn transport_error(call: &str, err: reqwest::Error) -> RdbError {
    if err.is_timeout() {
        RdbError::upstream(format!("{} timed out: {}", call, err))
    } else if err.is_connect() {
        RdbError::upstream(format!("{} connection failed: {}", call, err))
    } else if err.is_decode() {
        RdbError::upstream(format!("{} returned a malformed body: {}", call, err))
    } else {
        RdbError::upstream(format!("{} failed: {}", call, err))
    }
}
