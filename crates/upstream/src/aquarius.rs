//! AQUARIUS Publish API client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::histogram;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use rdb_common::{RdbError, RdbResult};
use rdb_protocol::operations::{
    GET_AUTH_TOKEN, GET_PARAMETER_LIST, GET_QUALIFIER_LIST, GET_TIME_SERIES_CORRECTED_DATA,
    GET_TIME_SERIES_DESCRIPTION_LIST, GET_TIME_SERIES_RAW_DATA,
};
use rdb_protocol::points::{ParameterList, QualifierList};
use rdb_protocol::series::TimeSeriesDescriptionList;
use rdb_protocol::{ParameterMetadata, QualifierMetadata, TimeSeriesData, TimeSeriesDescription};

use crate::{
    transport_error, Authenticator, PointSource, PointsQuery, QualifierDomain, SeriesQuery,
    SeriesService,
};

/// Header carrying the session token on every Publish request.
pub const AUTH_TOKEN_HEADER: &str = "X-Authentication-Token";

/// Connection settings for an AQUARIUS server.
#[derive(Debug, Clone)]
pub struct AquariusConfig {
    /// Host name, or a full base URL for non-standard deployments.
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub request_timeout: Duration,
}

/// Client for `/AQUARIUS/Publish/v2`.
pub struct AquariusClient {
    client: Client,
    config: AquariusConfig,
}

impl AquariusClient {
    pub fn new(config: AquariusConfig) -> RdbResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| transport_error("AQUARIUS client", e))?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> String {
        let host = self.config.hostname.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{}/AQUARIUS/Publish/v2", host)
        } else {
            format!("http://{}/AQUARIUS/Publish/v2", host)
        }
    }

    fn operation_url(&self, operation: &str) -> String {
        format!("{}/{}", self.base_url(), operation)
    }

    /// Send a request and decode its JSON body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> RdbResult<T> {
        let started = Instant::now();

        let response = request
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(RdbError::AuthenticationExpired(format!(
                "{} rejected the session token",
                operation
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(operation, e))?;

        histogram!("upstream_request_duration_ms", "call" => operation.to_string())
            .record(started.elapsed().as_secs_f64() * 1000.0);

        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            return Err(RdbError::upstream(format!(
                "{} returned {}: {}",
                operation, status, snippet
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            RdbError::upstream(format!("{} returned malformed JSON: {}", operation, e))
        })
    }

    fn get(&self, token: &str, operation: &str) -> RequestBuilder {
        let url = self.operation_url(operation);
        debug!(url = %url, "AQUARIUS request");
        self.client.get(url).header(AUTH_TOKEN_HEADER, token)
    }
}

/// Build the `GetTimeSeriesDescriptionList` query string.
pub fn series_query_params(query: &SeriesQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("LocationIdentifier", query.location.to_string()),
        ("Parameter", query.parameter.clone()),
        (
            "ComputationPeriodIdentifier",
            query.computation_period_identifier.clone(),
        ),
    ];
    if let Some(computation) = &query.computation_identifier {
        params.push(("ComputationIdentifier", computation.clone()));
    }
    params
}

/// Build the point-data query string; open bounds are left out entirely.
pub fn points_query_params(query: &PointsQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("TimeSeriesUniqueId", query.unique_id.clone()),
        ("ApplyRounding", query.apply_rounding.to_string()),
    ];
    if let Some(from) = &query.query_from {
        params.push(("QueryFrom", from.clone()));
    }
    if let Some(to) = &query.query_to {
        params.push(("QueryTo", to.clone()));
    }
    params
}

#[async_trait]
impl SeriesService for AquariusClient {
    #[instrument(skip(self, token))]
    async fn parameter(&self, token: &str, parameter_code: &str) -> RdbResult<ParameterMetadata> {
        let list: ParameterList = self
            .send_json(GET_PARAMETER_LIST, self.get(token, GET_PARAMETER_LIST))
            .await?;

        list.parameters
            .into_iter()
            .find(|p| p.parameter_id == parameter_code)
            .ok_or_else(|| RdbError::NotFound(format!("parameter code {}", parameter_code)))
    }

    #[instrument(skip(self, token), fields(location = %query.location, parameter = %query.parameter))]
    async fn find_series(
        &self,
        token: &str,
        query: &SeriesQuery,
    ) -> RdbResult<Vec<TimeSeriesDescription>> {
        let request = self
            .get(token, GET_TIME_SERIES_DESCRIPTION_LIST)
            .query(&series_query_params(query));

        let list: TimeSeriesDescriptionList = self
            .send_json(GET_TIME_SERIES_DESCRIPTION_LIST, request)
            .await?;

        debug!(candidates = list.time_series_descriptions.len(), "Series candidates");
        Ok(list.time_series_descriptions)
    }

    #[instrument(skip(self, token), fields(series = %query.unique_id))]
    async fn points(&self, token: &str, query: &PointsQuery) -> RdbResult<TimeSeriesData> {
        let operation = match query.source {
            PointSource::Corrected => GET_TIME_SERIES_CORRECTED_DATA,
            PointSource::Raw => GET_TIME_SERIES_RAW_DATA,
        };

        let request = self.get(token, operation).query(&points_query_params(query));
        let data: TimeSeriesData = self.send_json(operation, request).await?;

        debug!(points = data.points.len(), "Fetched points");
        Ok(data)
    }
}

#[async_trait]
impl QualifierDomain for AquariusClient {
    #[instrument(skip(self, token))]
    async fn qualifiers(&self, token: &str) -> RdbResult<Vec<QualifierMetadata>> {
        let list: QualifierList = self
            .send_json(GET_QUALIFIER_LIST, self.get(token, GET_QUALIFIER_LIST))
            .await?;
        Ok(list.qualifiers)
    }
}

#[async_trait]
impl Authenticator for AquariusClient {
    #[instrument(skip(self), fields(user = %self.config.username))]
    async fn authenticate(&self) -> RdbResult<String> {
        let url = self.operation_url(GET_AUTH_TOKEN);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("Username", self.config.username.as_str()),
                ("EncryptedPassword", self.config.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(GET_AUTH_TOKEN, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(GET_AUTH_TOKEN, e))?;

        if status == StatusCode::UNAUTHORIZED {
            return Err(RdbError::upstream("AQUARIUS rejected the configured credentials"));
        }
        if !status.is_success() {
            return Err(RdbError::upstream(format!(
                "{} returned {}",
                GET_AUTH_TOKEN, status
            )));
        }

        // The token comes back as bare text, sometimes JSON-quoted.
        let token = body.trim().trim_matches('"').to_string();
        if token.is_empty() {
            return Err(RdbError::upstream(format!("{} returned an empty token", GET_AUTH_TOKEN)));
        }
        Ok(token)
    }
}
