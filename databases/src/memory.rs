//! In-memory store
//!
//! A JSON tree behind the same `RemoteStore` interface as the REST backend.
//! Faults can be injected per operation and every call is logged, so tests can
//! check which operations ran and in what order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::{ConnectionSettings, Connector, RemoteStore, Result, StorePath};

/// Store operation kinds, as recorded in the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreOperation {
    Connect,
    Get,
    Set,
    Exists,
}

/// One recorded call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCall {
    pub operation: StoreOperation,
    pub path: String,
}

/// In-memory hierarchical store
#[derive(Debug, Default)]
pub struct MemoryStore {
    tree: RwLock<Value>,
    faults: RwLock<HashMap<StoreOperation, StoreError>>,
    /// Acknowledge writes without storing them
    drop_writes: bool,
    calls: RwLock<Vec<StoreCall>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `operation` with `error`
    pub fn with_fault(mut self, operation: StoreOperation, error: StoreError) -> Self {
        self.faults.get_mut().insert(operation, error);
        self
    }

    /// Report writes as successful but keep nothing
    pub fn dropping_writes(mut self) -> Self {
        self.drop_writes = true;
        self
    }

    /// Seed a record
    pub fn with_record(mut self, path: &StorePath, value: Value) -> Self {
        write_node(self.tree.get_mut(), path.segments(), value);
        self
    }

    /// Calls recorded so far, oldest first
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.calls.read().await.clone()
    }

    /// Operations recorded so far, oldest first
    pub async fn operations(&self) -> Vec<StoreOperation> {
        self.calls
            .read()
            .await
            .iter()
            .map(|call| call.operation)
            .collect()
    }

    /// Whole tree snapshot
    pub async fn snapshot(&self) -> Value {
        self.tree.read().await.clone()
    }

    async fn record(&self, operation: StoreOperation, path: &StorePath) -> Result<()> {
        self.calls.write().await.push(StoreCall {
            operation,
            path: path.to_string(),
        });

        match self.faults.read().await.get(&operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn read(&self, path: &StorePath) -> Option<Value> {
        let tree = self.tree.read().await;
        let mut node = &*tree;
        for segment in path.segments() {
            node = node.get(segment)?;
        }
        if node.is_null() {
            None
        } else {
            Some(node.clone())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>> {
        self.record(StoreOperation::Get, path).await?;
        Ok(self.read(path).await)
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<()> {
        self.record(StoreOperation::Set, path).await?;
        if self.drop_writes {
            debug!("Dropping write to /{path}");
            return Ok(());
        }

        let mut tree = self.tree.write().await;
        write_node(&mut tree, path.segments(), value);
        Ok(())
    }

    async fn exists(&self, path: &StorePath) -> Result<bool> {
        self.record(StoreOperation::Exists, path).await?;
        Ok(self.read(path).await.is_some())
    }
}

/// Hands out the shared `MemoryStore`, or fails initialization on demand
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    store: Arc<MemoryStore>,
    init_error: Option<StoreError>,
}

impl MemoryConnector {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            init_error: None,
        }
    }

    /// Fail every `connect` with `error`
    pub fn failing(store: Arc<MemoryStore>, error: StoreError) -> Self {
        Self {
            store,
            init_error: Some(error),
        }
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn RemoteStore>> {
        self.store.calls.write().await.push(StoreCall {
            operation: StoreOperation::Connect,
            path: settings.app_name.clone(),
        });

        match self.init_error {
            Some(ref err) => Err(err.clone()),
            None => Ok(Box::new(Arc::clone(&self.store))),
        }
    }
}

/// Write `value` at `segments` below `node`; `null` removes the record and
/// prunes parents left empty.
fn write_node(node: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    if value.is_null() {
        if let Some(obj) = node.as_object_mut() {
            if let Some(child) = obj.get_mut(head) {
                write_node(child, rest, Value::Null);
                let empty = child.is_null() || child.as_object().is_some_and(Map::is_empty);
                if empty {
                    obj.remove(head);
                }
            }
            if obj.is_empty() {
                *node = Value::Null;
            }
        }
        return;
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Some(obj) = node.as_object_mut() {
        let child = obj.entry(head.clone()).or_insert(Value::Null);
        write_node(child, rest, value);
    }
}
