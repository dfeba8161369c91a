//! Error types for the Aula client
//!
//! This module defines all error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Aula client operations
///
/// This enum encompasses all possible errors that can occur while sending
/// authenticated requests: the auth-recovery taxonomy surfaced by the
/// refresh coordinator, plus transport, credential-store, and configuration
/// failures.
#[derive(Error, Debug)]
pub enum AulaError {
    /// No refresh token is stored; surfaced immediately on a `401` without
    /// touching the network.
    #[error("Not authenticated: no refresh token is stored")]
    Unauthenticated,

    /// The uniform failure callers observe when a token refresh fails.
    ///
    /// This is the original `401` outcome; refresh-specific detail is
    /// logged, not surfaced.
    #[error("Unauthorized: the session is no longer valid")]
    Unauthorized,

    /// A request that was already replayed once received `401` again.
    #[error("Retry exhausted: request was rejected again after a token refresh")]
    RetryExhausted,

    /// The refresh endpoint rejected the call, was unreachable, or returned
    /// a malformed body. Internal to the coordinator; callers observe
    /// [`AulaError::Unauthorized`] instead.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential store errors not covered by a keyring failure
    #[error("Credential store error: {0}")]
    Store(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Result type alias for Aula client operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
