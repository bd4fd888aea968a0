//! # Fabric Table
//!
//! Committed fabrics (durable) plus at most one pending fabric provisioned
//! during the current fail-safe. The pending entry lives only in memory:
//! it becomes durable on commit and vanishes on revert.
//!
//! Fabric indices are allocated from `1..=254` and are never handed out twice
//! within one boot, even after the fabric is removed or reverted.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::ports::KeyValueStore;

use super::entities::{
    CallerContext, FabricDescriptor, FabricEntry, FabricIndex, NewFabric, MAX_FABRIC_INDEX,
    MIN_FABRIC_INDEX,
};
use super::errors::{FabricError, GateResult};

/// Storage key of the committed fabric list.
pub const FABRICS_KEY: &[u8] = b"g/fabrics";

/// The device's fabric table.
#[derive(Debug)]
pub struct FabricTable {
    committed: BTreeMap<FabricIndex, FabricEntry>,
    pending: Option<FabricEntry>,
    /// Indices released during this boot.
    retired: BTreeSet<FabricIndex>,
    next_index: FabricIndex,
    capacity: usize,
}

impl FabricTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            committed: BTreeMap::new(),
            pending: None,
            retired: BTreeSet::new(),
            next_index: MIN_FABRIC_INDEX,
            capacity,
        }
    }

    /// Load committed fabrics from the store.
    pub fn load<S: KeyValueStore + ?Sized>(capacity: usize, kv: &S) -> GateResult<Self> {
        let mut table = Self::new(capacity);
        if let Some(bytes) = kv.get(FABRICS_KEY)? {
            let entries: Vec<FabricEntry> = bincode::deserialize(&bytes)?;
            for entry in entries {
                table.committed.insert(entry.fabric_index, entry);
            }
        }
        if let Some(&highest) = table.committed.keys().next_back() {
            table.next_index = wrap_next(highest);
        }
        debug!(
            count = table.committed.len(),
            next_index = table.next_index,
            "[fabric] Loaded fabric table"
        );
        Ok(table)
    }

    /// Committed fabrics in ascending index order.
    pub fn list(&self, caller: &CallerContext) -> Vec<FabricDescriptor> {
        self.committed
            .values()
            .map(|entry| entry.describe(caller))
            .collect()
    }

    pub fn get(&self, fabric_index: FabricIndex) -> Option<&FabricEntry> {
        self.committed.get(&fabric_index)
    }

    pub fn contains(&self, fabric_index: FabricIndex) -> bool {
        self.committed.contains_key(&fabric_index)
    }

    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn pending(&self) -> Option<&FabricEntry> {
        self.pending.as_ref()
    }

    /// Allocate an index and hold `fabric` as pending.
    pub fn add_pending(&mut self, fabric: NewFabric) -> Result<FabricIndex, FabricError> {
        if let Some(pending) = &self.pending {
            return Err(FabricError::PendingFabricExists(pending.fabric_index));
        }
        if self.committed.len() >= self.capacity {
            return Err(FabricError::TableFull {
                capacity: self.capacity,
            });
        }
        let fabric_index = self.allocate_index().ok_or(FabricError::TableFull {
            capacity: self.capacity,
        })?;
        self.pending = Some(FabricEntry::from_new(fabric_index, fabric));
        debug!(fabric_index, "[fabric] Pending fabric allocated");
        Ok(fabric_index)
    }

    /// Make the pending fabric durable.
    pub fn commit_pending<S: KeyValueStore + ?Sized>(
        &mut self,
        kv: &mut S,
    ) -> GateResult<FabricIndex> {
        let entry = self.pending.clone().ok_or(FabricError::NoPendingFabric)?;
        let mut committed = self.committed.clone();
        committed.insert(entry.fabric_index, entry.clone());
        persist(kv, &committed)?;

        self.committed = committed;
        self.pending = None;
        info!(
            fabric_index = entry.fabric_index,
            fabric_id = entry.fabric_id,
            "[fabric] Fabric committed"
        );
        Ok(entry.fabric_index)
    }

    /// Drop the pending fabric, if any. Its index is retired.
    pub fn revert_pending(&mut self) -> Option<FabricEntry> {
        let entry = self.pending.take()?;
        self.retired.insert(entry.fabric_index);
        info!(fabric_index = entry.fabric_index, "[fabric] Pending fabric reverted");
        Some(entry)
    }

    /// Remove a committed fabric. The pending fabric is not removable.
    pub fn remove<S: KeyValueStore + ?Sized>(
        &mut self,
        kv: &mut S,
        fabric_index: FabricIndex,
    ) -> GateResult<FabricEntry> {
        if !self.committed.contains_key(&fabric_index) {
            return Err(FabricError::NotFound(fabric_index).into());
        }
        let mut committed = self.committed.clone();
        let removed = committed.remove(&fabric_index);
        persist(kv, &committed)?;

        self.committed = committed;
        self.retired.insert(fabric_index);
        info!(fabric_index, remaining = self.committed.len(), "[fabric] Fabric removed");
        removed.ok_or_else(|| FabricError::NotFound(fabric_index).into())
    }

    /// Drop every fabric from memory once the gate has deleted
    /// [`FABRICS_KEY`]. Indices stay retired for this boot.
    pub fn forget_all(&mut self) {
        self.retired.extend(self.committed.keys().copied());
        self.committed.clear();
        self.revert_pending();
    }

    /// First free index at or after `next_index`, wrapping once.
    fn allocate_index(&mut self) -> Option<FabricIndex> {
        let span = usize::from(MAX_FABRIC_INDEX - MIN_FABRIC_INDEX) + 1;
        let mut candidate = self.next_index;
        for _ in 0..span {
            if !self.committed.contains_key(&candidate) && !self.retired.contains(&candidate) {
                self.next_index = wrap_next(candidate);
                return Some(candidate);
            }
            candidate = wrap_next(candidate);
        }
        None
    }
}

fn wrap_next(index: FabricIndex) -> FabricIndex {
    if index >= MAX_FABRIC_INDEX {
        MIN_FABRIC_INDEX
    } else {
        index + 1
    }
}

fn persist<S: KeyValueStore + ?Sized>(
    kv: &mut S,
    committed: &BTreeMap<FabricIndex, FabricEntry>,
) -> GateResult<()> {
    let entries: Vec<&FabricEntry> = committed.values().collect();
    let bytes = bincode::serialize(&entries)?;
    kv.put(FABRICS_KEY, &bytes)?;
    Ok(())
}
