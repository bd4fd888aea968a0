use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore};

type Table = BTreeMap<Vec<u8>, Vec<u8>>;

/// File-backed key-value store.
///
/// The whole table is bincode-encoded into one file. Every write goes to a
/// temp file that is synced and then renamed over the original, and memory
/// is only updated once the rename succeeded.
#[derive(Debug)]
pub struct FileBackedKVStore {
    data: Table,
    path: PathBuf,
}

impl FileBackedKVStore {
    /// Open the store at `path`, creating nothing until the first write.
    ///
    /// A file that cannot be decoded is reported as corruption rather than
    /// silently treated as empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KVStoreError> {
        let path = path.as_ref().to_path_buf();
        let data = match std::fs::read(&path) {
            Ok(bytes) => {
                let data: Table =
                    bincode::deserialize(&bytes).map_err(|e| KVStoreError::CorruptionError {
                        message: format!("{}: {}", path.display(), e),
                    })?;
                info!(
                    keys = data.len(),
                    bytes = bytes.len(),
                    "[storage] Loaded {}",
                    path.display()
                );
                data
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("[storage] No existing storage file at {}", path.display());
                Table::new()
            }
            Err(e) => return Err(io_error(e)),
        };
        Ok(Self { data, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commit(&mut self, next: Table) -> Result<(), KVStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }

        let bytes = bincode::serialize(&next).map_err(|e| KVStoreError::IOError {
            message: e.to_string(),
        })?;

        let temp_path = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).map_err(io_error)?;
        file.write_all(&bytes).map_err(io_error)?;
        file.sync_all().map_err(io_error)?;
        std::fs::rename(&temp_path, &self.path).map_err(io_error)?;

        self.data = next;
        Ok(())
    }
}

fn io_error(e: std::io::Error) -> KVStoreError {
    KVStoreError::IOError {
        message: e.to_string(),
    }
}

impl KeyValueStore for FileBackedKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.atomic_batch_write(vec![BatchOperation::put(key, value)])
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        if !self.data.contains_key(key) {
            return Ok(());
        }
        self.atomic_batch_write(vec![BatchOperation::delete(key)])
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        let mut next = self.data.clone();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    next.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    next.remove(&key);
                }
            }
        }
        self.commit(next)
    }
}
