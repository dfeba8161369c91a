//! Single-flight token-refresh coordinator
//!
//! When several in-flight requests all fail with `401 Unauthorized` because
//! the access token expired, exactly one of them must exchange the refresh
//! token for a new pair; the rest must wait for that exchange and share its
//! outcome. Refresh tokens are typically single-use, so two concurrent
//! refresh calls would race each other for the authoritative new token, and
//! a thundering herd against the auth backend helps nobody.
//!
//! The coordinator owns a two-state machine (`Idle` / `Refreshing`) behind a
//! `std::sync::Mutex`. The state check and the transition happen inside one
//! critical section with no `.await`, so exactly one task ever observes
//! `Idle` and becomes the leader; every other task enqueues a oneshot waiter
//! and suspends. When the refresh settles the waiter queue is drained and
//! the state returns to `Idle` in a single critical section, then every
//! waiter is resolved (new access token) or rejected (uniform
//! [`AulaError::Unauthorized`]) outside the lock.
//!
//! On refresh failure the session is invalidated: both stored tokens are
//! cleared so the application treats the user as logged out.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Deserialize;
use tokio::sync::oneshot;

use crate::auth::store::{self, CredentialStore, Credentials, REFRESH_TOKEN_KEY};
use crate::error::{AulaError, Result};

/// Shared outcome of one settled refresh call.
#[derive(Debug, Clone)]
enum RefreshOutcome {
    /// The store now holds a new token pair; replay with this access token.
    Rotated { access_token: String },
    /// The refresh failed and the session was invalidated.
    Failed,
}

/// The coordinator's state machine. Exactly one instance per coordinator.
enum CoordinatorState {
    Idle,
    Refreshing {
        /// Requests suspended on the in-flight refresh. Non-empty only
        /// while refreshing; drained before the state returns to `Idle`.
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

/// What `handle` decided under the state lock.
enum Role {
    Leader,
    Waiter(oneshot::Receiver<RefreshOutcome>),
}

/// Process-wide (per client) owner of the refresh state machine.
pub struct RefreshCoordinator {
    http: reqwest::Client,
    store: Arc<dyn CredentialStore>,
    refresh_url: url::Url,
    state: Mutex<CoordinatorState>,
}

/// Wire shape of the refresh endpoint's success body.
///
/// Some backend deployments return the pair at the top level, others wrap
/// it in a `data` envelope. Both are accepted deliberately.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RefreshResponse {
    Flat(TokenPair),
    Enveloped { data: TokenPair },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPair {
    access_token: String,
    refresh_token: String,
}

impl From<TokenPair> for Credentials {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }
    }
}

impl RefreshCoordinator {
    /// Creates a coordinator in the `Idle` state.
    ///
    /// No network I/O is performed at construction time.
    pub fn new(
        http: reqwest::Client,
        store: Arc<dyn CredentialStore>,
        refresh_url: url::Url,
    ) -> Self {
        Self {
            http,
            store,
            refresh_url,
            state: Mutex::new(CoordinatorState::Idle),
        }
    }

    /// Handles one first-time `401` and returns the access token to replay
    /// with.
    ///
    /// - With no stored refresh token this fails immediately with
    ///   [`AulaError::Unauthenticated`], without a network call or a state
    ///   transition.
    /// - While a refresh is in flight the caller suspends until it settles
    ///   and shares its outcome.
    /// - Otherwise the caller becomes the leader and performs exactly one
    ///   `POST` to the refresh endpoint. On success both tokens are
    ///   persisted together and every suspended caller resumes with the new
    ///   access token; on failure the session is invalidated and every
    ///   suspended caller fails with [`AulaError::Unauthorized`].
    ///
    /// # Errors
    ///
    /// [`AulaError::Unauthenticated`] when logged out,
    /// [`AulaError::Unauthorized`] when the refresh fails, or a store error
    /// when the credential store itself is unusable.
    pub async fn handle(&self) -> Result<String> {
        // Fail fast while logged out: no state transition, no network call.
        // The token itself is re-read after leadership is won; this read
        // only establishes that a session exists at all.
        if self.store.get(REFRESH_TOKEN_KEY)?.is_none() {
            tracing::debug!("401 with no stored refresh token; failing fast");
            return Err(AulaError::Unauthenticated.into());
        }

        // State check and transition in one critical section, no await:
        // exactly one task can observe Idle per refresh cycle.
        let role = {
            let mut state = self.lock_state();
            match &mut *state {
                CoordinatorState::Refreshing { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    tracing::debug!(waiters = waiters.len(), "refresh in flight; enqueued waiter");
                    Role::Waiter(rx)
                }
                CoordinatorState::Idle => {
                    *state = CoordinatorState::Refreshing {
                        waiters: Vec::new(),
                    };
                    Role::Leader
                }
            }
        };

        match role {
            Role::Waiter(rx) => match rx.await {
                Ok(RefreshOutcome::Rotated { access_token }) => Ok(access_token),
                Ok(RefreshOutcome::Failed) | Err(_) => Err(AulaError::Unauthorized.into()),
            },
            Role::Leader => {
                tracing::debug!("leading token refresh");
                let outcome = self.run_refresh().await;

                // Drain the queue and return to Idle atomically, then
                // settle the waiters outside the lock. A waiter whose
                // request was cancelled has dropped its receiver; the
                // failed send is ignored and the others are unaffected.
                let waiters = {
                    let mut state = self.lock_state();
                    match std::mem::replace(&mut *state, CoordinatorState::Idle) {
                        CoordinatorState::Refreshing { waiters } => waiters,
                        CoordinatorState::Idle => Vec::new(),
                    }
                };
                for waiter in waiters {
                    let _ = waiter.send(outcome.clone());
                }

                match outcome {
                    RefreshOutcome::Rotated { access_token } => Ok(access_token),
                    RefreshOutcome::Failed => Err(AulaError::Unauthorized.into()),
                }
            }
        }
    }

    /// Performs the single refresh call and settles the store.
    ///
    /// The refresh token is read here, after leadership is won: a refresh
    /// that settled between this request's entry check and the state lock
    /// may have rotated the pair, and only the current token is valid at
    /// the endpoint. No other task can write the pair while this one
    /// leads, so the read cannot go stale.
    ///
    /// Any failure, including a post-refresh store write failure, ends in
    /// session invalidation so the stored pair is never left mixed.
    async fn run_refresh(&self) -> RefreshOutcome {
        let refresh_token = match self.store.get(REFRESH_TOKEN_KEY) {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::warn!("refresh token disappeared before the refresh call");
                return RefreshOutcome::Failed;
            }
            Err(e) => {
                tracing::warn!("failed to read refresh token: {e}");
                return RefreshOutcome::Failed;
            }
        };

        match self.request_refresh(&refresh_token).await {
            Ok(credentials) => {
                match store::save_credentials(self.store.as_ref(), &credentials) {
                    Ok(()) => {
                        tracing::info!("access token rotated");
                        RefreshOutcome::Rotated {
                            access_token: credentials.access_token,
                        }
                    }
                    Err(e) => {
                        tracing::warn!("failed to persist refreshed tokens: {e}");
                        self.invalidate_session();
                        RefreshOutcome::Failed
                    }
                }
            }
            Err(e) => {
                tracing::warn!("token refresh failed: {e}");
                self.invalidate_session();
                RefreshOutcome::Failed
            }
        }
    }

    /// Exchanges `refresh_token` for a new pair at the refresh endpoint.
    async fn request_refresh(&self, refresh_token: &str) -> Result<Credentials> {
        let response = self
            .http
            .post(self.refresh_url.clone())
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await
            .map_err(|e| AulaError::RefreshFailed(format!("refresh request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AulaError::RefreshFailed(format!(
                "refresh endpoint returned HTTP {status}"
            ))
            .into());
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| AulaError::RefreshFailed(format!("malformed refresh response: {e}")))?;

        let pair = match body {
            RefreshResponse::Flat(pair) => pair,
            RefreshResponse::Enveloped { data } => data,
        };
        Ok(pair.into())
    }

    /// Clears both stored tokens. Pure side effect: a store failure here is
    /// logged and never overrides the failure being propagated.
    fn invalidate_session(&self) {
        tracing::warn!("invalidating session: clearing stored credentials");
        if let Err(e) = store::clear_credentials(self.store.as_ref()) {
            tracing::warn!("failed to clear credentials during invalidation: {e}");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, CoordinatorState> {
        // The critical sections never panic, but recover from poisoning
        // rather than propagate it into every request path.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
