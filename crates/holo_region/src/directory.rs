//! Region directory contract and an in-memory snapshot implementation.
//!
//! The directory is shared and mutable: regions split, merge and move while a
//! partitioning call is running. The splitter therefore re-resolves on every
//! step and never keeps boundaries past a single call.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};

use crate::error::{SplitError, SplitResult};
use crate::keys::format_key;
use crate::region::{Region, RegionStore, ReplicaPolicy, Store};

/// Resolves keys and region ids to the owning region and a chosen replica.
pub trait RegionDirectory: Send + Sync {
    fn region_store_by_key(&self, key: &[u8], policy: ReplicaPolicy) -> Result<RegionStore>;

    fn region_store_by_id(&self, region_id: u64, policy: ReplicaPolicy) -> Result<RegionStore>;
}

impl<D: RegionDirectory + ?Sized> RegionDirectory for &D {
    fn region_store_by_key(&self, key: &[u8], policy: ReplicaPolicy) -> Result<RegionStore> {
        (**self).region_store_by_key(key, policy)
    }

    fn region_store_by_id(&self, region_id: u64, policy: ReplicaPolicy) -> Result<RegionStore> {
        (**self).region_store_by_id(region_id, policy)
    }
}

impl<D: RegionDirectory + ?Sized> RegionDirectory for std::sync::Arc<D> {
    fn region_store_by_key(&self, key: &[u8], policy: ReplicaPolicy) -> Result<RegionStore> {
        (**self).region_store_by_key(key, policy)
    }

    fn region_store_by_id(&self, region_id: u64, policy: ReplicaPolicy) -> Result<RegionStore> {
        (**self).region_store_by_id(region_id, policy)
    }
}

#[derive(Debug, Default)]
struct Topology {
    /// Regions sorted by start key.
    regions: Vec<Region>,
    stores: BTreeMap<u64, Store>,
}

/// Directory backed by a validated in-memory topology snapshot.
///
/// `replace` swaps the whole snapshot atomically, which is how callers apply
/// a refreshed view after a stale-region error.
#[derive(Debug, Default)]
pub struct SnapshotDirectory {
    topology: RwLock<Topology>,
}

impl SnapshotDirectory {
    pub fn new(regions: Vec<Region>, stores: Vec<Store>) -> Result<Self> {
        let topology = build_topology(regions, stores)?;
        Ok(Self {
            topology: RwLock::new(topology),
        })
    }

    /// Installs a new topology snapshot.
    pub fn replace(&self, regions: Vec<Region>, stores: Vec<Store>) -> Result<()> {
        let topology = build_topology(regions, stores)?;
        let mut guard = self
            .topology
            .write()
            .map_err(|_| anyhow!("region directory lock poisoned"))?;
        *guard = topology;
        Ok(())
    }

    /// Copy of the current regions, sorted by start key.
    pub fn regions(&self) -> Result<Vec<Region>> {
        let guard = self
            .topology
            .read()
            .map_err(|_| anyhow!("region directory lock poisoned"))?;
        Ok(guard.regions.clone())
    }

    fn pair(topology: &Topology, region: &Region, policy: ReplicaPolicy) -> Result<RegionStore> {
        let store_id = region.store_for(policy).ok_or_else(|| {
            anyhow!(
                "region {} has no {policy} replica",
                region.region_id
            )
        })?;
        let store = topology.stores.get(&store_id).cloned().ok_or_else(|| {
            anyhow!(
                "store {store_id} for region {} is not registered",
                region.region_id
            )
        })?;
        Ok(RegionStore::new(region.clone(), store))
    }
}

impl RegionDirectory for SnapshotDirectory {
    fn region_store_by_key(&self, key: &[u8], policy: ReplicaPolicy) -> Result<RegionStore> {
        let guard = self
            .topology
            .read()
            .map_err(|_| anyhow!("region directory lock poisoned"))?;
        // Regions are sorted and contiguous: the owner is the last region
        // whose start key is <= key.
        let idx = guard
            .regions
            .partition_point(|region| region.start_key.as_slice() <= key);
        let region = idx
            .checked_sub(1)
            .and_then(|idx| guard.regions.get(idx))
            .filter(|region| region.contains(key))
            .ok_or_else(|| anyhow!("no region covers key {}", format_key(key)))?;
        Self::pair(&guard, region, policy)
    }

    fn region_store_by_id(&self, region_id: u64, policy: ReplicaPolicy) -> Result<RegionStore> {
        let guard = self
            .topology
            .read()
            .map_err(|_| anyhow!("region directory lock poisoned"))?;
        let region = guard
            .regions
            .iter()
            .find(|region| region.region_id == region_id)
            .ok_or_else(|| anyhow!("unknown region {region_id}"))?;
        Self::pair(&guard, region, policy)
    }
}

/// Resolves `key` and checks the answer actually owns it.
pub(crate) fn resolve_key<D: RegionDirectory + ?Sized>(
    directory: &D,
    key: &[u8],
    policy: ReplicaPolicy,
) -> SplitResult<RegionStore> {
    let pair = directory
        .region_store_by_key(key, policy)
        .map_err(|source| SplitError::Resolution {
            key: format_key(key),
            source,
        })?;
    check_bounds(&pair.region)?;
    if !pair.region.contains(key) {
        return Err(SplitError::invariant(format!(
            "region {} [{}, {}) returned for key [{}] does not contain it",
            pair.region.region_id,
            format_key(&pair.region.start_key),
            format_key(&pair.region.end_key),
            format_key(key)
        )));
    }
    Ok(pair)
}

/// Resolves `region_id` and checks the answer is that region.
pub(crate) fn resolve_id<D: RegionDirectory + ?Sized>(
    directory: &D,
    region_id: u64,
    policy: ReplicaPolicy,
) -> SplitResult<RegionStore> {
    let pair = directory
        .region_store_by_id(region_id, policy)
        .map_err(|source| SplitError::RegionNotFound { region_id, source })?;
    check_bounds(&pair.region)?;
    if pair.region_id() != region_id {
        return Err(SplitError::invariant(format!(
            "lookup of region {region_id} returned region {}",
            pair.region_id()
        )));
    }
    Ok(pair)
}

fn check_bounds(region: &Region) -> SplitResult<()> {
    if !region.end_key.is_empty() && region.end_key <= region.start_key {
        return Err(SplitError::invariant(format!(
            "region {} ends at [{}] before its start [{}]",
            region.region_id,
            format_key(&region.end_key),
            format_key(&region.start_key)
        )));
    }
    Ok(())
}

/// Sorts and validates regions: they must tile the key space end to end.
fn build_topology(mut regions: Vec<Region>, stores: Vec<Store>) -> Result<Topology> {
    if regions.is_empty() {
        bail!("region topology has no regions");
    }
    regions.sort_by(|a, b| a.start_key.cmp(&b.start_key));

    let first = &regions[0];
    if !first.start_key.is_empty() {
        bail!(
            "first region {} starts at [{}] instead of -inf",
            first.region_id,
            format_key(&first.start_key)
        );
    }
    for (idx, region) in regions.iter().enumerate() {
        if !region.end_key.is_empty() && region.end_key <= region.start_key {
            bail!(
                "region {} ends at [{}] before its start [{}]",
                region.region_id,
                format_key(&region.end_key),
                format_key(&region.start_key)
            );
        }
        match regions.get(idx + 1) {
            Some(next) if next.start_key != region.end_key => bail!(
                "gap or overlap between region {} ending at [{}] and region {} starting at [{}]",
                region.region_id,
                format_key(&region.end_key),
                next.region_id,
                format_key(&next.start_key)
            ),
            None if !region.end_key.is_empty() => bail!(
                "last region {} ends at [{}] instead of +inf",
                region.region_id,
                format_key(&region.end_key)
            ),
            _ => {}
        }
    }

    let stores = stores
        .into_iter()
        .map(|store| (store.store_id, store))
        .collect();
    Ok(Topology { regions, stores })
}
