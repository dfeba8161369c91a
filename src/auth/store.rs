//! Credential persistence for the Aula session tokens
//!
//! Two opaque string entries are persisted: the access token and the
//! refresh token. [`KeyringStore`] keeps them in the operating system's
//! native credential store (Keychain on macOS, Secret Service on Linux,
//! Windows Credential Manager on Windows) so they survive process
//! restarts. [`MemoryStore`] is an in-process alternative for tests and
//! ephemeral sessions.
//!
//! Writers must keep the pair consistent: [`save_credentials`] updates both
//! entries and [`clear_credentials`] removes both. A half-present pair is
//! treated as logged out by [`load_credentials`].

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{AulaError, Result};

/// Store key for the access token entry.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Store key for the refresh token entry.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// A consistent access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token attached to every authenticated request.
    pub access_token: String,

    /// Token exchanged at the refresh endpoint for a new pair.
    pub refresh_token: String,
}

/// Durable key/value storage for session tokens.
///
/// Keys are opaque strings; absence of a key is a valid state (logged out)
/// and is reported as `Ok(None)`, never as an error.
pub trait CredentialStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` when absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, overwriting any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes the entry under `key`. A no-op when the entry is absent.
    fn clear(&self, key: &str) -> Result<()>;
}

/// Loads the token pair from `store`.
///
/// Returns `Ok(None)` when either entry is missing: a half-present pair can
/// only come from storage tampering and is treated as logged out rather
/// than surfaced as an error.
pub fn load_credentials(store: &dyn CredentialStore) -> Result<Option<Credentials>> {
    let access = store.get(ACCESS_TOKEN_KEY)?;
    let refresh = store.get(REFRESH_TOKEN_KEY)?;
    match (access, refresh) {
        (Some(access_token), Some(refresh_token)) => Ok(Some(Credentials {
            access_token,
            refresh_token,
        })),
        _ => Ok(None),
    }
}

/// Writes both entries of the token pair to `store`.
pub fn save_credentials(store: &dyn CredentialStore, credentials: &Credentials) -> Result<()> {
    store.set(ACCESS_TOKEN_KEY, &credentials.access_token)?;
    store.set(REFRESH_TOKEN_KEY, &credentials.refresh_token)?;
    Ok(())
}

/// Removes both entries of the token pair from `store`.
pub fn clear_credentials(store: &dyn CredentialStore) -> Result<()> {
    store.clear(ACCESS_TOKEN_KEY)?;
    store.clear(REFRESH_TOKEN_KEY)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// KeyringStore
// ---------------------------------------------------------------------------

/// OS-keyring-backed credential store.
///
/// Each entry is stored under the configured service name, so independent
/// deployments (or tests) can use disjoint namespaces.
///
/// # Examples
///
/// ```no_run
/// use aula_client::auth::store::{CredentialStore, KeyringStore, ACCESS_TOKEN_KEY};
///
/// # fn example() -> aula_client::Result<()> {
/// let store = KeyringStore::new("aula-client");
/// store.set(ACCESS_TOKEN_KEY, "A1")?;
/// assert_eq!(store.get(ACCESS_TOKEN_KEY)?, Some("A1".to_string()));
/// # Ok(())
/// # }
/// ```
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Creates a store namespaced under `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        let entry = keyring::Entry::new(&self.service, key).map_err(AulaError::Keyring)?;
        Ok(entry)
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AulaError::Keyring(e).into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(AulaError::Keyring)?;
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_password() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AulaError::Keyring(e).into()),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-process credential store.
///
/// Contents vanish with the process, which makes it suitable for tests
/// (each test gets an isolated store) and for deployments that must not
/// persist tokens.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| AulaError::Store("credential store mutex poisoned".to_string()).into())
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
