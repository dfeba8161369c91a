//! Token lifecycle: credential storage and the single-flight refresh
//! coordinator.

pub mod coordinator;
pub mod store;

pub use coordinator::RefreshCoordinator;
pub use store::{CredentialStore, Credentials, KeyringStore, MemoryStore};
