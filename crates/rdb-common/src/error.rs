//! Error types for aq2rdb retrievals.

use thiserror::Error;

/// Result type alias using RdbError.
pub type RdbResult<T> = Result<T, RdbError>;

/// Every failure a retrieval can end in.
///
/// Errors are terminal for the request that produced them. The only
/// recovery anywhere in the workspace is the single re-authentication
/// performed by the upstream token handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RdbError {
    // === Caller input ===
    #[error("Invalid date/time \"{value}\": {message}")]
    Format { value: String, message: String },

    #[error("Unsupported value for '{param}': {message}")]
    Validation { param: String, message: String },

    // === Domain lookups ===
    #[error("Unknown time zone code: {0}")]
    UnknownZone(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("More than one primary time series found for {location}: {identifiers:?}")]
    AmbiguousSeries {
        location: String,
        identifiers: Vec<String>,
    },

    #[error("No remark code for qualifier: {0}")]
    MissingRemarkCode(String),

    // === Upstream ===
    #[error("Upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Authentication expired: {0}")]
    AuthenticationExpired(String),
}

impl RdbError {
    pub fn format(value: impl Into<String>, message: impl Into<String>) -> Self {
        RdbError::Format {
            value: value.into(),
            message: message.into(),
        }
    }

    pub fn validation(param: impl Into<String>, message: impl Into<String>) -> Self {
        RdbError::Validation {
            param: param.into(),
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        RdbError::UpstreamUnavailable(message.into())
    }

    /// Short stable label, used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            RdbError::Format { .. } => "format",
            RdbError::Validation { .. } => "validation",
            RdbError::UnknownZone(_) => "unknown_zone",
            RdbError::NotFound(_) => "not_found",
            RdbError::AmbiguousSeries { .. } => "ambiguous_series",
            RdbError::MissingRemarkCode(_) => "missing_remark_code",
            RdbError::UpstreamUnavailable(_) => "upstream_unavailable",
            RdbError::AuthenticationExpired(_) => "authentication_expired",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            RdbError::Format { .. } | RdbError::Validation { .. } => 400,

            RdbError::NotFound(_) => 404,

            RdbError::AmbiguousSeries { .. } => 409,

            RdbError::UpstreamUnavailable(_) => 502,
            RdbError::AuthenticationExpired(_) => 503,

            RdbError::UnknownZone(_) | RdbError::MissingRemarkCode(_) => 500,
        }
    }

    /// Render as an RDB comment line, the legacy way of reporting a failed
    /// retrieval inside an otherwise valid RDB file.
    pub fn to_rdb_comment(&self) -> String {
        // Comment lines are single-line by definition.
        let message = self.to_string().replace(['\r', '\n'], " ");
        format!("# //ERROR {}\n", message)
    }
}

impl From<serde_json::Error> for RdbError {
    fn from(err: serde_json::Error) -> Self {
        RdbError::UpstreamUnavailable(format!("Malformed upstream response: {}", err))
    }
}
