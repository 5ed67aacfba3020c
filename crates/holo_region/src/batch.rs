//! Grouping of point keys by owning region for mutation batches.
//!
//! Point writes are neither sorted nor contiguous, so every key is resolved
//! on its own and no range merging applies. Byte sizes are recorded for the
//! caller's request size limits; nothing here splits a group.

use std::collections::HashMap;

use crate::directory::{self, RegionDirectory};
use crate::error::SplitResult;
use crate::region::{Region, RegionStore, ReplicaPolicy, Store};

/// Keys that belong to one region, bound for one replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchKeys {
    region: Region,
    store: Store,
    keys: Vec<Vec<u8>>,
    size_in_bytes: usize,
}

impl BatchKeys {
    pub fn new(region: Region, store: Store, keys: Vec<Vec<u8>>) -> Self {
        let size_in_bytes = keys.iter().map(Vec::len).sum();
        Self {
            region,
            store,
            keys,
            size_in_bytes,
        }
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn keys(&self) -> &[Vec<u8>] {
        &self.keys
    }

    pub fn into_keys(self) -> Vec<Vec<u8>> {
        self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }

    pub fn size_in_kb(&self) -> f64 {
        self.size_in_bytes as f64 / 1024.0
    }

    fn push(&mut self, key: Vec<u8>) {
        self.size_in_bytes += key.len();
        self.keys.push(key);
    }
}

/// Result of [`group_keys_by_region`]: groups in first-encounter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupKeyResult {
    groups: Vec<BatchKeys>,
}

impl GroupKeyResult {
    pub fn groups(&self) -> &[BatchKeys] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<BatchKeys> {
        self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group for `(region_id, store_id)`, if any key landed there.
    pub fn get(&self, region_id: u64, store_id: u64) -> Option<&BatchKeys> {
        self.groups
            .iter()
            .find(|g| g.region.region_id == region_id && g.store.store_id == store_id)
    }

    pub fn total_keys(&self) -> usize {
        self.groups.iter().map(BatchKeys::len).sum()
    }
}

/// Group point keys by the `(region, replica)` that owns them.
///
/// Key order inside each group follows input order. The first resolution of
/// a region fixes the descriptor kept for its group.
pub fn group_keys_by_region<D: RegionDirectory + ?Sized>(
    directory: &D,
    keys: &[Vec<u8>],
    policy: ReplicaPolicy,
) -> SplitResult<GroupKeyResult> {
    let mut index: HashMap<(u64, u64), usize> = HashMap::new();
    let mut result = GroupKeyResult::default();
    for key in keys {
        let RegionStore { region, store } = directory::resolve_key(directory, key, policy)?;
        let slot = (region.region_id, store.store_id);
        match index.get(&slot) {
            Some(&idx) => result.groups[idx].push(key.clone()),
            None => {
                index.insert(slot, result.groups.len());
                result
                    .groups
                    .push(BatchKeys::new(region, store, vec![key.clone()]));
            }
        }
    }
    tracing::debug!(
        keys = keys.len(),
        groups = result.groups.len(),
        %policy,
        "grouped keys by region"
    );
    Ok(result)
}
