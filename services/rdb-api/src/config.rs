//! Service configuration loading and types.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::request::StatisticTable;

/// Settings read from the optional YAML service config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Per-request timeout for upstream calls, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How often the authentication token is refreshed, in seconds.
    #[serde(default = "default_token_refresh_secs")]
    pub token_refresh_secs: u64,

    /// Daily statistic code → AQUARIUS computation identifier.
    #[serde(default = "default_statistics")]
    pub statistics: HashMap<String, String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            token_refresh_secs: default_token_refresh_secs(),
            statistics: default_statistics(),
        }
    }
}

impl ServiceConfig {
    /// Load the config file, falling back to defaults when it is absent.
    pub fn load(path: &str) -> Result<Self> {
        let file = Path::new(path);

        if !file.exists() {
            tracing::warn!("Service config {} does not exist, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read: {:?}", file))?;

        let config: ServiceConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse service config: {:?}", file))?;

        if config.token_refresh_secs == 0 {
            anyhow::bail!("token_refresh_secs must be positive in {:?}", file);
        }

        tracing::info!(
            statistics = config.statistics.len(),
            "Loaded service config from {:?}",
            file
        );

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn token_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.token_refresh_secs)
    }

    pub fn statistic_table(&self) -> StatisticTable {
        StatisticTable::from_map(self.statistics.clone())
    }
}

fn default_request_timeout_secs() -> u64 {
    60
}

// Just under the presumed one-hour token lifetime.
fn default_token_refresh_secs() -> u64 {
    3540
}

fn default_statistics() -> HashMap<String, String> {
    StatisticTable::default().into_map()
}
