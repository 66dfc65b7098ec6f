//! Connection registry
//!
//! Tracks live named connections so two connections cannot share an app name
//! at the same time. A registry is created and injected by the caller; nothing
//! here is process-wide.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::Result;

/// Live connection information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionEntry {
    /// App name the connection was opened under
    pub name: String,
    /// Endpoint the connection points at
    pub database_url: String,
    /// When the connection was opened
    pub opened: DateTime<Utc>,
}

/// Registry of live connections keyed by app name
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, ConnectionEntry>>,
}

impl ConnectionRegistry {
    /// Create a new, shareable registry
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim `name` for a new connection.
    ///
    /// The claim lasts until the returned lease is dropped.
    pub fn acquire(self: &Arc<Self>, name: &str, database_url: &str) -> Result<RegistryLease> {
        let mut connections = self
            .connections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if connections.contains_key(name) {
            drop(connections);
            warn!("Connection '{name}' is already initialized");
            return Err(StoreError::DuplicateApp(name.to_string()));
        }

        connections.insert(
            name.to_string(),
            ConnectionEntry {
                name: name.to_string(),
                database_url: database_url.to_string(),
                opened: Utc::now(),
            },
        );
        drop(connections);

        info!("Registered connection: {name} ({database_url})");
        Ok(RegistryLease {
            registry: Arc::clone(self),
            name: name.to_string(),
        })
    }

    /// Snapshot of the live connections
    pub fn list(&self) -> Vec<ConnectionEntry> {
        let connections = self
            .connections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut entries: Vec<ConnectionEntry> = connections.values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    pub fn is_live(&self, name: &str) -> bool {
        self.connections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(name)
    }

    fn release(&self, name: &str) {
        let mut connections = self
            .connections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if connections.remove(name).is_some() {
            debug!("Released connection: {name}");
        }
    }
}

/// Claim on an app name; releases the name on drop
#[derive(Debug)]
pub struct RegistryLease {
    registry: Arc<ConnectionRegistry>,
    name: String,
}

impl RegistryLease {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for RegistryLease {
    fn drop(&mut self) {
        self.registry.release(&self.name);
    }
}
