//! Process-wide authentication token.
//!
//! A single background task owns the token. It authenticates when spawned,
//! then again every refresh interval and whenever a caller reports that the
//! token it was given has expired. Callers only ever read a snapshot.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use rdb_common::{RdbError, RdbResult};

use crate::Authenticator;

type RefreshReply = oneshot::Sender<RdbResult<String>>;

/// Read side of the token, cheap to clone into each request.
#[derive(Clone)]
pub struct TokenHandle {
    current: watch::Receiver<Option<String>>,
    refresh: mpsc::Sender<RefreshReply>,
}

impl TokenHandle {
    /// The token as of now, if one has been obtained.
    pub fn snapshot(&self) -> Option<String> {
        self.current.borrow().clone()
    }

    /// A usable token, authenticating first if none is held yet.
    pub async fn token(&self) -> RdbResult<String> {
        match self.snapshot() {
            Some(token) => Ok(token),
            None => self.refresh().await,
        }
    }

    /// Ask the refresh task to re-authenticate and wait for the result.
    pub async fn refresh(&self) -> RdbResult<String> {
        let (reply, response) = oneshot::channel();
        self.refresh
            .send(reply)
            .await
            .map_err(|_| RdbError::upstream("authentication task has stopped"))?;

        response
            .await
            .map_err(|_| RdbError::upstream("authentication task dropped the request"))?
    }

    /// Run an upstream call with the current token.
    ///
    /// If the call reports an expired token, re-authenticate and try once
    /// more. A second expiry is reported as the upstream being unavailable.
    pub async fn call<T, F, Fut>(&self, mut op: F) -> RdbResult<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = RdbResult<T>>,
    {
        let token = self.token().await?;

        match op(token).await {
            Err(RdbError::AuthenticationExpired(reason)) => {
                warn!(reason = %reason, "Token expired, re-authenticating once");
                let token = self.refresh().await?;
                op(token).await.map_err(|e| match e {
                    RdbError::AuthenticationExpired(reason) => RdbError::upstream(format!(
                        "still unauthorized after re-authenticating: {}",
                        reason
                    )),
                    other => other,
                })
            }
            other => other,
        }
    }
}

/// Spawn the task that owns the token.
///
/// The first refresh happens immediately. The task stops once every
/// [`TokenHandle`] has been dropped.
pub fn spawn_token_refresher(
    authenticator: Arc<dyn Authenticator>,
    refresh_interval: Duration,
) -> (TokenHandle, JoinHandle<()>) {
    let (current_tx, current_rx) = watch::channel(None);
    let (refresh_tx, refresh_rx) = mpsc::channel(16);

    let task = tokio::spawn(run_refresher(
        authenticator,
        current_tx,
        refresh_rx,
        refresh_interval,
    ));

    let handle = TokenHandle {
        current: current_rx,
        refresh: refresh_tx,
    };

    (handle, task)
}

async fn run_refresher(
    authenticator: Arc<dyn Authenticator>,
    current: watch::Sender<Option<String>>,
    mut requests: mpsc::Receiver<RefreshReply>,
    refresh_interval: Duration,
) {
    let mut ticker = tokio::time::interval(refresh_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let _ = refresh_once(authenticator.as_ref(), &current).await;
            }
            request = requests.recv() => {
                let Some(reply) = request else {
                    info!("All token handles dropped, stopping refresh task");
                    break;
                };
                let result = refresh_once(authenticator.as_ref(), &current).await;
                ticker.reset();
                // The requester may have given up; nothing to clean up.
                let _ = reply.send(result);
            }
        }
    }
}

async fn refresh_once(
    authenticator: &dyn Authenticator,
    current: &watch::Sender<Option<String>>,
) -> RdbResult<String> {
    match authenticator.authenticate().await {
        Ok(token) => {
            current.send_replace(Some(token.clone()));
            counter!("auth_refreshes_total").increment(1);
            info!("Authentication token refreshed");
            Ok(token)
        }
        Err(e) => {
            counter!("auth_refresh_failures_total").increment(1);
            warn!(error = %e, "Authentication failed, keeping previous token");
            Err(match e {
                RdbError::AuthenticationExpired(reason) => RdbError::upstream(reason),
                other => other,
            })
        }
    }
}
