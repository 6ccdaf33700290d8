//! Access-token persistence
//!
//! A [`TokenStore`] owns the access token and the time it was issued. Both
//! values always travel together as one [`TokenRecord`]; storage backends
//! read and write whole records only.

use crate::clock::{Clock, SystemClock};
use crate::error::{SessionError, SessionResult};
use crate::expiry::ExpiryPolicy;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::warn;

/// Storage key of the access token
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key of the issuance timestamp
pub const TOKEN_ISSUED_AT_KEY: &str = "tokenIssuedAt";

/// An access token and the client-observed time it was issued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "tokenIssuedAt")]
    pub issued_at: DateTime<Utc>,
}

/// Backend that persists a single token record
pub trait TokenStorage: Send + Sync {
    /// Read the stored record, if any
    fn load(&self) -> SessionResult<Option<TokenRecord>>;

    /// Replace the stored record
    fn save(&self, record: &TokenRecord) -> SessionResult<()>;

    /// Remove the stored record
    fn remove(&self) -> SessionResult<()>;
}

/// In-process storage, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStorage {
    record: RwLock<Option<TokenRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryStorage {
    fn load(&self) -> SessionResult<Option<TokenRecord>> {
        Ok(self
            .record
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, record: &TokenRecord) -> SessionResult<()> {
        *self.record.write().unwrap_or_else(PoisonError::into_inner) = Some(record.clone());
        Ok(())
    }

    fn remove(&self) -> SessionResult<()> {
        *self.record.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Durable storage in a small JSON document
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// reader never observes a token without its timestamp.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Storage under the platform data directory (`<data_dir>/gather/session.json`)
    pub fn in_data_dir() -> SessionResult<Self> {
        let dir = dirs::data_dir()
            .ok_or_else(|| SessionError::storage("no platform data directory available"))?;
        Ok(Self::new(dir.join("gather").join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }
}

impl TokenStorage for FileStorage {
    fn load(&self) -> SessionResult<Option<TokenRecord>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, record: &TokenRecord) -> SessionResult<()> {
        let dir = self.dir();
        std::fs::create_dir_all(dir)?;
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(&serde_json::to_vec_pretty(record)?)?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&self) -> SessionResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Token store shared by every part of the session
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn TokenStorage>,
    clock: Arc<dyn Clock>,
}

impl TokenStore {
    /// Create a store over `storage` stamping records with the system time
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    /// Create a store with an explicit time source
    pub fn with_clock(storage: Arc<dyn TokenStorage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Store backed by memory only
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Persist `token` stamped with the current time
    pub fn set(&self, token: impl Into<String>) -> SessionResult<TokenRecord> {
        let record = TokenRecord {
            access_token: token.into(),
            issued_at: self.clock.now(),
        };
        self.storage.save(&record)?;
        Ok(record)
    }

    /// Current record, treating unreadable storage as empty
    pub fn record(&self) -> Option<TokenRecord> {
        match self.storage.load() {
            Ok(record) => record.filter(|r| !r.access_token.trim().is_empty()),
            Err(e) => {
                warn!("Failed to read stored access token: {}", e);
                None
            }
        }
    }

    /// Current access token
    pub fn get(&self) -> Option<String> {
        self.record().map(|r| r.access_token)
    }

    /// When the current token was issued
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.record().map(|r| r.issued_at)
    }

    /// Remove the token and its timestamp
    pub fn clear(&self) -> SessionResult<()> {
        self.storage.remove()
    }

    /// Current time according to the store's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Whether the stored token is expired or within `threshold` of expiring
    pub fn is_near_expiry(&self, policy: &ExpiryPolicy, threshold: Duration) -> bool {
        policy.is_near_expiry(self.issued_at(), self.now(), threshold)
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("has_token", &self.record().is_some())
            .finish()
    }
}
