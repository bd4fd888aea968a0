use std::collections::HashMap;
#[cfg(any(test, feature = "test-hooks"))]
use std::collections::HashSet;

use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore};

/// In-memory key-value store for unit tests and volatile devices.
///
/// Batches are applied in one step under `&mut self`, so they are atomic.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKVStore {
    data: HashMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        self.data.remove(key);
        Ok(())
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    self.data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }
}

/// In-memory store that can be told to reject writes.
///
/// Writes fail either globally (`set_fail_writes`) or for specific keys
/// (`fail_key`). A failing batch applies nothing. Reads always succeed.
#[cfg(any(test, feature = "test-hooks"))]
#[derive(Debug, Default)]
pub struct FailingKVStore {
    inner: InMemoryKVStore,
    fail_writes: bool,
    failing_keys: HashSet<Vec<u8>>,
}

#[cfg(any(test, feature = "test-hooks"))]
impl FailingKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing store, keeping its contents.
    pub fn wrap(inner: InMemoryKVStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn fail_key(&mut self, key: &[u8]) {
        self.failing_keys.insert(key.to_vec());
    }

    pub fn heal_key(&mut self, key: &[u8]) {
        self.failing_keys.remove(key);
    }

    pub fn into_inner(self) -> InMemoryKVStore {
        self.inner
    }

    fn check(&self, key: &[u8]) -> Result<(), KVStoreError> {
        if self.fail_writes || self.failing_keys.contains(key) {
            return Err(KVStoreError::IOError {
                message: format!("injected write failure for {}", String::from_utf8_lossy(key)),
            });
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-hooks"))]
impl KeyValueStore for FailingKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.inner.get(key)
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.check(key)?;
        self.inner.put(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        self.check(key)?;
        self.inner.delete(key)
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        for op in &operations {
            let key = match op {
                BatchOperation::Put { key, .. } | BatchOperation::Delete { key } => key,
            };
            self.check(key)?;
        }
        self.inner.atomic_batch_write(operations)
    }
}
