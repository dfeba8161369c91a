//! Request descriptions threaded through the auth pipeline
//!
//! [`ApiRequest`] is a cloneable, transport-independent description of one
//! logical API call. The authenticated client turns it into a real
//! `reqwest` request each time it is dispatched, which is what makes the
//! replay after a token refresh possible: the original description is kept
//! intact and simply resent with a fresh bearer token.
//!
//! The `retried` flag lives here rather than on any shared transport state:
//! it is created `false` exactly once per logical request and flipped at
//! most once, which is the loop guard that prevents a second refresh for
//! the same request.

use std::collections::HashMap;

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AulaError, Result};

/// A cloneable description of one outbound API call.
///
/// # Examples
///
/// ```
/// use aula_client::ApiRequest;
///
/// let request = ApiRequest::get("/v1/classes")
///     .query("page", "2")
///     .header("Accept-Language", "da-DK");
/// assert_eq!(request.path(), "/v1/classes");
/// assert!(!request.is_retried());
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    headers: HashMap<String, String>,
    retried: bool,
}

impl ApiRequest {
    /// Creates a request with an explicit method.
    ///
    /// The path is normalized to start with `/` so it joins cleanly onto
    /// the configured base URL.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        Self {
            method,
            path,
            query: Vec::new(),
            body: None,
            headers: HashMap::new(),
            retried: false,
        }
    }

    /// Creates a `GET` request for `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Creates a `POST` request for `path`.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Creates a `PUT` request for `path`.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Creates a `DELETE` request for `path`.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends a query-string parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets an extra header on this request.
    ///
    /// The `Authorization` header is owned by the client's authenticator
    /// and is overwritten at dispatch time.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`AulaError::Serialization`] when `body` cannot be
    /// represented as a JSON value.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body).map_err(AulaError::Serialization)?);
        Ok(self)
    }

    /// The HTTP method of this request.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path this request targets, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query-string parameters in insertion order.
    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    /// The JSON body, if one was set.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Extra headers set on this request.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Whether this request has already been replayed after a refresh.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// Marks this request as replayed. Must be called at most once.
    pub(crate) fn mark_retried(&mut self) {
        debug_assert!(!self.retried, "a request may be marked retried only once");
        self.retried = true;
    }
}
