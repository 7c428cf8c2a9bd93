//! In-memory object store with operation tracing.
//!
//! Backs the orchestrator test suites: records every gateway call for
//! assertions and can inject faults on a per-key-prefix basis.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Result, StorageError};
use crate::gateway::{validate_key, ObjectState, ObjectStorage};

/// Record of a single gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    Put { key: String, size: usize },
    Get { key: String },
    Stat { key: String },
    Delete { key: String },
}

/// Thread-safe in-memory backend. Not suitable for production.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
    operations: Arc<Mutex<Vec<StorageOp>>>,
    fail_prefixes: Arc<Mutex<Vec<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded operations in call order.
    pub fn operations(&self) -> Vec<StorageOp> {
        self.operations.lock().unwrap().clone()
    }

    /// Makes every operation on keys with this prefix fail as unavailable.
    pub fn inject_failure(&self, prefix: impl Into<String>) {
        self.fail_prefixes.lock().unwrap().push(prefix.into());
    }

    /// Seeds an object without recording an operation.
    pub fn seed(&self, key: &str, data: impl Into<Bytes>) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), data.into());
    }

    /// Reports whether `key` exists, without recording an operation.
    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    fn check_fault(&self, key: &str) -> Result<()> {
        let prefixes = self.fail_prefixes.lock().unwrap();
        if prefixes.iter().any(|p| key.starts_with(p.as_str())) {
            return Err(StorageError::Unavailable(format!(
                "injected failure for {}",
                key
            )));
        }
        Ok(())
    }

    fn record(&self, op: StorageOp) {
        self.operations.lock().unwrap().push(op);
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put_content(&self, key: &str, data: Bytes) -> Result<()> {
        validate_key(key)?;
        self.check_fault(key)?;
        self.record(StorageOp::Put {
            key: key.to_string(),
            size: data.len(),
        });
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn get_content(&self, key: &str) -> Result<Bytes> {
        validate_key(key)?;
        self.check_fault(key)?;
        self.record(StorageOp::Get {
            key: key.to_string(),
        });
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn stat(&self, key: &str) -> Result<ObjectState> {
        validate_key(key)?;
        self.check_fault(key)?;
        self.record(StorageOp::Stat {
            key: key.to_string(),
        });
        if self.objects.lock().unwrap().contains_key(key) {
            Ok(ObjectState::Exists)
        } else {
            Ok(ObjectState::NotFound)
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.check_fault(key)?;
        self.record(StorageOp::Delete {
            key: key.to_string(),
        });
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}
