//! StoreProbe Databases Module
//!
//! The databases module provides the remote key-value store abstraction used by
//! the connectivity probe: path-addressed `get`/`set` against a hierarchical
//! store, the connectors that open a fresh connection per probe run, and the
//! concrete backends (Firebase Realtime Database REST and an in-memory store).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub mod error;
pub mod firebase;
pub mod memory;
pub mod registry;

pub use error::StoreError;
pub use firebase::{FirebaseConnector, FirebaseStore};
pub use memory::{MemoryConnector, MemoryStore, StoreCall, StoreOperation};
pub use registry::{ConnectionEntry, ConnectionRegistry, RegistryLease};

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Characters a key segment must not contain
const FORBIDDEN_KEY_CHARS: [char; 5] = ['.', '#', '$', '[', ']'];

/// Validated hierarchical key path (`a/b/c`); the empty path is the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The root of the store
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse a `/`-separated path. Leading, trailing and repeated slashes are ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut segments = Vec::new();
        for segment in raw.split('/').filter(|s| !s.is_empty()) {
            if let Some(c) = segment.chars().find(|c| FORBIDDEN_KEY_CHARS.contains(c)) {
                return Err(StoreError::InvalidPath {
                    path: raw.to_string(),
                    reason: format!("segment '{segment}' contains '{c}'"),
                });
            }
            if segment.chars().any(char::is_control) {
                return Err(StoreError::InvalidPath {
                    path: raw.to_string(),
                    reason: format!("segment '{segment}' contains a control character"),
                });
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Path below this one
    pub fn child(&self, segment: &str) -> Result<Self> {
        let mut joined = self.to_string();
        joined.push('/');
        joined.push_str(segment);
        Self::parse(&joined)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl TryFrom<String> for StorePath {
    type Error = StoreError;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl From<StorePath> for String {
    fn from(path: StorePath) -> Self {
        path.to_string()
    }
}

/// Everything a connector needs to open a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Database endpoint URL
    pub database_url: String,
    /// API key sent with every request
    pub api_key: String,
    /// Project identifier
    pub project_id: String,
    /// Optional database auth token
    pub auth_token: Option<String>,
    /// Logical connection name
    pub app_name: String,
    /// Per-request transport timeout
    pub request_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            api_key: String::new(),
            project_id: String::new(),
            auth_token: None,
            app_name: "[DEFAULT]".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Path-addressed access to a hierarchical key-value store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read the record at `path`; `None` when nothing is stored there
    async fn get(&self, path: &StorePath) -> Result<Option<Value>>;

    /// Replace the record at `path`
    async fn set(&self, path: &StorePath, value: Value) -> Result<()>;

    /// Check readability of `path` without caring about its contents
    async fn exists(&self, path: &StorePath) -> Result<bool> {
        Ok(self.get(path).await?.is_some())
    }
}

#[async_trait]
impl<T: RemoteStore + ?Sized> RemoteStore for Arc<T> {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>> {
        (**self).get(path).await
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<()> {
        (**self).set(path, value).await
    }

    async fn exists(&self, path: &StorePath) -> Result<bool> {
        (**self).exists(path).await
    }
}

/// Opens one connection per call
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn RemoteStore>>;
}

#[async_trait]
impl<T: Connector + ?Sized> Connector for Arc<T> {
    async fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn RemoteStore>> {
        (**self).connect(settings).await
    }
}
