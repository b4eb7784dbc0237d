//! Application state for the aq2rdb service.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use upstream::{spawn_token_refresher, AquariusClient, AquariusConfig, NwisSiteClient, TokenHandle};

use crate::config::ServiceConfig;
use crate::pipeline::Pipeline;

/// Where the upstream services live and how to authenticate.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub aquarius_hostname: String,
    pub waterservices_hostname: String,
    pub aquarius_user: String,
    pub aquarius_password: String,
}

/// Shared application state.
pub struct AppState {
    /// Retrieval pipeline shared by every request.
    pub pipeline: Pipeline,

    /// Read side of the authentication token, for readiness checks.
    pub token: TokenHandle,

    refresher: Option<JoinHandle<()>>,
}

impl AppState {
    /// Build the upstream clients and start the token refresh task.
    pub fn new(settings: UpstreamSettings, config: ServiceConfig) -> Result<Self> {
        let aquarius = Arc::new(
            AquariusClient::new(AquariusConfig {
                hostname: settings.aquarius_hostname,
                username: settings.aquarius_user,
                password: settings.aquarius_password,
                request_timeout: config.request_timeout(),
            })
            .context("Failed to create AQUARIUS client")?,
        );

        let sites = Arc::new(
            NwisSiteClient::new(settings.waterservices_hostname, config.request_timeout())
                .context("Failed to create NWIS site client")?,
        );

        let (token, refresher) =
            spawn_token_refresher(aquarius.clone(), config.token_refresh_interval());

        let pipeline = Pipeline::new(
            sites,
            aquarius.clone(),
            aquarius,
            token.clone(),
            config.statistic_table(),
        );

        Ok(Self {
            pipeline,
            token,
            refresher: Some(refresher),
        })
    }

    /// Assemble state around an existing pipeline and refresh task.
    pub fn from_parts(pipeline: Pipeline, token: TokenHandle, refresher: Option<JoinHandle<()>>) -> Self {
        Self {
            pipeline,
            token,
            refresher,
        }
    }

    /// Whether the refresh task is still running.
    pub fn refresher_alive(&self) -> bool {
        self.refresher
            .as_ref()
            .map_or(true, |task| !task.is_finished())
    }
}
