//! # Adapters Module
//!
//! Concrete implementations of the outbound ports.
//!
//! ## Modules
//!
//! - `storage`: `KeyValueStore` backends (in-memory, single-file)

pub mod storage;

pub use storage::{FileBackedKVStore, InMemoryKVStore};
