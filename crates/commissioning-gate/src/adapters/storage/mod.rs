//! Storage Adapters
//!
//! Implementations of the `KeyValueStore` trait.

mod file;
mod memory;

pub use file::FileBackedKVStore;
#[cfg(any(test, feature = "test-hooks"))]
pub use memory::FailingKVStore;
pub use memory::InMemoryKVStore;
