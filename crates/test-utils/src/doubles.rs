//! In-memory doubles for the upstream collaborators.
//!
//! Each double answers from data it was built with and records the queries
//! it saw, so tests can assert on what the pipeline asked for.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use rdb_common::{LocationIdentifier, RdbError, RdbResult};
use rdb_protocol::{ParameterMetadata, QualifierMetadata, TimeSeriesData, TimeSeriesDescription};
use upstream::{
    spawn_token_refresher, Authenticator, PointsQuery, QualifierDomain, SeriesQuery,
    SeriesService, SiteRecord, SiteService, TokenHandle,
};

/// Site service answering from a fixed map.
#[derive(Default)]
pub struct MockSiteService {
    sites: HashMap<LocationIdentifier, SiteRecord>,
    calls: AtomicUsize,
}

impl MockSiteService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_site(mut self, site: SiteRecord) -> Self {
        self.sites.insert(site.location.clone(), site);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SiteService for MockSiteService {
    async fn site(&self, location: &LocationIdentifier) -> RdbResult<SiteRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sites
            .get(location)
            .cloned()
            .ok_or_else(|| RdbError::NotFound(format!("site {}", location)))
    }
}

/// Series catalog and point source backed by vectors.
///
/// `expire_next` makes the next N calls fail with an expired token,
/// regardless of which token they carry.
#[derive(Default)]
pub struct MockSeriesService {
    parameters: Vec<ParameterMetadata>,
    series: Vec<TimeSeriesDescription>,
    data: HashMap<String, TimeSeriesData>,
    expire_remaining: AtomicUsize,
    series_queries: Mutex<Vec<SeriesQuery>>,
    points_queries: Mutex<Vec<PointsQuery>>,
    tokens_seen: Mutex<Vec<String>>,
}

impl MockSeriesService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter(mut self, parameter: ParameterMetadata) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_series(mut self, series: TimeSeriesDescription) -> Self {
        self.series.push(series);
        self
    }

    pub fn with_data(mut self, data: TimeSeriesData) -> Self {
        self.data.insert(data.unique_id.clone(), data);
        self
    }

    pub fn expire_next(self, calls: usize) -> Self {
        self.expire_remaining.store(calls, Ordering::SeqCst);
        self
    }

    pub fn series_queries(&self) -> Vec<SeriesQuery> {
        lock(&self.series_queries).clone()
    }

    pub fn points_queries(&self) -> Vec<PointsQuery> {
        lock(&self.points_queries).clone()
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        lock(&self.tokens_seen).clone()
    }

    fn check_token(&self, token: &str) -> RdbResult<()> {
        lock(&self.tokens_seen).push(token.to_string());

        let expired = self
            .expire_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if expired {
            return Err(RdbError::AuthenticationExpired(format!("token {} expired", token)));
        }
        Ok(())
    }
}

#[async_trait]
impl SeriesService for MockSeriesService {
    async fn parameter(&self, token: &str, parameter_code: &str) -> RdbResult<ParameterMetadata> {
        self.check_token(token)?;
        self.parameters
            .iter()
            .find(|p| p.parameter_id == parameter_code)
            .cloned()
            .ok_or_else(|| RdbError::NotFound(format!("parameter code {}", parameter_code)))
    }

    async fn find_series(
        &self,
        token: &str,
        query: &SeriesQuery,
    ) -> RdbResult<Vec<TimeSeriesDescription>> {
        self.check_token(token)?;
        lock(&self.series_queries).push(query.clone());

        let location = query.location.to_string();
        Ok(self
            .series
            .iter()
            .filter(|s| s.location_identifier == location && s.parameter == query.parameter)
            .filter(|s| s.computation_period_identifier == query.computation_period_identifier)
            .filter(|s| match &query.computation_identifier {
                Some(computation) => &s.computation_identifier == computation,
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn points(&self, token: &str, query: &PointsQuery) -> RdbResult<TimeSeriesData> {
        self.check_token(token)?;
        lock(&self.points_queries).push(query.clone());

        self.data
            .get(&query.unique_id)
            .cloned()
            .ok_or_else(|| RdbError::NotFound(format!("series {}", query.unique_id)))
    }
}

/// Fixed qualifier domain.
#[derive(Default)]
pub struct MockQualifierDomain {
    qualifiers: Vec<QualifierMetadata>,
}

impl MockQualifierDomain {
    pub fn new(qualifiers: Vec<QualifierMetadata>) -> Self {
        Self { qualifiers }
    }
}

#[async_trait]
impl QualifierDomain for MockQualifierDomain {
    async fn qualifiers(&self, _token: &str) -> RdbResult<Vec<QualifierMetadata>> {
        Ok(self.qualifiers.clone())
    }
}

/// Hands out `token-1`, `token-2`, ... and counts how often it was asked.
#[derive(Default)]
pub struct MockAuthenticator {
    issued: AtomicUsize,
}

impl MockAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn authenticate(&self) -> RdbResult<String> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("token-{}", n))
    }
}

/// Spawn a token refresher over a [`MockAuthenticator`].
///
/// The refresh interval is long enough that only startup and on-demand
/// refreshes happen during a test.
pub fn mock_token() -> (TokenHandle, Arc<MockAuthenticator>) {
    let auth = Arc::new(MockAuthenticator::new());
    let (handle, _task) = spawn_token_refresher(auth.clone(), Duration::from_secs(24 * 3600));
    (handle, auth)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
