//! Aula client - authenticated HTTP client for the Aula platform
//!
//! This library is the single HTTP entry point for the Aula domain layers
//! (classes, groups, milestones, submissions, grading). Its core is the
//! token-refresh coordinator: when requests fail with `401 Unauthorized`,
//! exactly one refresh call is made no matter how many requests fail
//! concurrently, the failed requests are replayed with the new token, and
//! the session is invalidated when the refresh itself fails.
//!
//! # Architecture
//!
//! - `client`: the consumer-facing [`ApiClient`] with `send` and JSON
//!   convenience helpers
//! - `request`: cloneable request descriptions carrying the one-shot
//!   `retried` flag
//! - `auth`: credential storage (OS keyring or in-memory) and the
//!   single-flight [`RefreshCoordinator`](auth::RefreshCoordinator)
//! - `config`: YAML-loadable client configuration
//! - `error`: error types and result alias
//!
//! # Example
//!
//! ```no_run
//! use aula_client::{ApiClient, ApiRequest, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::from_yaml_file("client.yaml")?;
//!     let client = ApiClient::new(&config)?;
//!
//!     let response = client.send(ApiRequest::get("/v1/classes")).await?;
//!     println!("status: {}", response.status());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod request;

// Re-export commonly used types
pub use auth::store::{CredentialStore, Credentials, KeyringStore, MemoryStore};
pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{AulaError, Result};
pub use request::ApiRequest;
