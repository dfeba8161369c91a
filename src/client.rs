//! Authenticated HTTP client for the Aula backend
//!
//! [`ApiClient`] is the single entry point the domain CRUD layers use:
//! [`ApiClient::send`] takes an [`ApiRequest`], attaches the current bearer
//! token, and returns the final settled outcome. Refresh and replay are
//! invisible to callers; a request either yields its response, or fails
//! with one of the [`AulaError`](crate::error::AulaError) auth variants.
//!
//! Pipeline per request:
//!
//! 1. authenticate -- read the access token from the credential store and
//!    set the `Authorization: Bearer <token>` header when present
//! 2. dispatch through `reqwest`
//! 3. on anything but `401`, return the response unchanged
//! 4. on a first `401`, mark the request retried, enter the refresh
//!    coordinator, and replay once with the refreshed token
//! 5. a `401` on the replay surfaces as `RetryExhausted`; no second refresh
//!    is ever attempted for the same request

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::auth::coordinator::RefreshCoordinator;
use crate::auth::store::{CredentialStore, KeyringStore, ACCESS_TOKEN_KEY};
use crate::config::ClientConfig;
use crate::error::{AulaError, Result};
use crate::request::ApiRequest;

/// Authenticated client with transparent single-flight token refresh.
///
/// # Examples
///
/// ```no_run
/// use aula_client::{ApiClient, ApiRequest, ClientConfig};
///
/// # async fn example() -> aula_client::Result<()> {
/// let config = ClientConfig {
///     base_url: "https://api.aula.example".to_string(),
///     ..Default::default()
/// };
/// let client = ApiClient::new(&config)?;
/// let response = client.send(ApiRequest::get("/v1/classes")).await?;
/// println!("status: {}", response.status());
/// # Ok(())
/// # }
/// ```
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    store: Arc<dyn CredentialStore>,
    coordinator: RefreshCoordinator,
}

impl ApiClient {
    /// Creates a client backed by the OS keyring.
    ///
    /// # Errors
    ///
    /// Returns [`AulaError::Config`] when the configuration fails
    /// validation and [`AulaError::Http`] when the HTTP client cannot be
    /// built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let store = Arc::new(KeyringStore::new(config.credential_service.clone()));
        Self::with_store(config, store)
    }

    /// Creates a client over an injected credential store.
    ///
    /// Each client owns an independent coordinator, so tests can run
    /// several clients against isolated [`MemoryStore`](crate::MemoryStore)
    /// instances without shared global state.
    pub fn with_store(config: &ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        config.validate()?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AulaError::Config(format!("invalid base_url '{}': {}", config.base_url, e)))?;
        let refresh_url = join_url(&base_url, &config.refresh_path)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(AulaError::Http)?;

        let coordinator = RefreshCoordinator::new(http.clone(), Arc::clone(&store), refresh_url);

        Ok(Self {
            http,
            base_url,
            store,
            coordinator,
        })
    }

    /// Sends a request and returns its final settled outcome.
    ///
    /// Non-`401` responses, including other error statuses, pass through
    /// unchanged for the caller to interpret. A `401` triggers at most one
    /// token refresh and one replay, shared with every other request that
    /// fails concurrently.
    ///
    /// # Errors
    ///
    /// - [`AulaError::Http`] when the transport itself fails
    /// - [`AulaError::Unauthenticated`] on a `401` with no stored refresh
    ///   token
    /// - [`AulaError::Unauthorized`] when the token refresh fails (the
    ///   session has been invalidated)
    /// - [`AulaError::RetryExhausted`] when the replayed request is
    ///   rejected again
    pub async fn send(&self, request: ApiRequest) -> Result<Response> {
        let token = self.store.get(ACCESS_TOKEN_KEY)?;
        let response = self.dispatch(&request, token.as_deref()).await?;
        self.on_response(request, response).await
    }

    /// Sends a `GET` request and deserializes a 2xx JSON response body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(ApiRequest::get(path)).await?;
        read_json(response).await
    }

    /// Sends a `POST` with a JSON body and deserializes the response body.
    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(ApiRequest::post(path).json(body)?).await?;
        read_json(response).await
    }

    /// Sends a `PUT` with a JSON body and deserializes the response body.
    pub async fn put_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(ApiRequest::put(path).json(body)?).await?;
        read_json(response).await
    }

    /// Sends a `DELETE` and checks for a 2xx response.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let response = self.send(ApiRequest::delete(path)).await?;
        response.error_for_status().map_err(AulaError::Http)?;
        Ok(())
    }

    /// Unauthorized detector: routes first-time `401`s into the refresh
    /// coordinator, passes everything else through unchanged.
    ///
    /// The replay's response is fed back through the same checks; the
    /// `retried` flag bounds the loop to a single replay.
    async fn on_response(&self, mut request: ApiRequest, mut response: Response) -> Result<Response> {
        loop {
            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            if request.is_retried() {
                tracing::debug!(path = request.path(), "401 after replay; retry exhausted");
                return Err(AulaError::RetryExhausted.into());
            }

            request.mark_retried();
            tracing::debug!(path = request.path(), "401 received; entering refresh coordinator");
            let access_token = self.coordinator.handle().await?;
            response = self.replay(&request, &access_token).await?;
        }
    }

    /// Replay dispatcher: resends the original request exactly once with
    /// the refreshed token. Its outcome is interpreted by the detector.
    async fn replay(&self, request: &ApiRequest, access_token: &str) -> Result<Response> {
        self.dispatch(request, Some(access_token)).await
    }

    /// Request authenticator plus transport: builds the `reqwest` request
    /// from the description, sets the bearer header when a token is
    /// present, and sends it.
    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response> {
        let url = join_url(&self.base_url, request.path())?;
        let mut builder = self.http.request(request.method().clone(), url);

        if !request.query_params().is_empty() {
            builder = builder.query(request.query_params());
        }
        for (key, value) in request.headers() {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(AulaError::Http)?;
        Ok(response)
    }
}

/// Joins a request path onto the base URL by concatenation, so a base URL
/// with a path prefix (e.g. `https://host/api`) is preserved.
fn join_url(base: &Url, path: &str) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let url = Url::parse(&joined)
        .map_err(|e| AulaError::Config(format!("invalid request URL '{joined}': {e}")))?;
    Ok(url)
}

/// Reads a 2xx JSON response body into `T`.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = response.error_for_status().map_err(AulaError::Http)?;
    let body = response.json().await.map_err(AulaError::Http)?;
    Ok(body)
}
