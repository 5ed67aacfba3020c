//! Shared fixtures for partitioner integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use holo_region::{
    Region, RegionDirectory, RegionStore, ReplicaPolicy, RowKeyEncoder, SnapshotDirectory, Store,
    TableRowKeyEncoder,
};

const INT_FLAG: u8 = 0x03;

/// Installs a test subscriber once; honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Comparable integer key: flag byte plus sign-flipped big-endian value.
pub fn int_key(value: i64) -> Vec<u8> {
    let mut key = Vec::with_capacity(9);
    key.push(INT_FLAG);
    key.extend_from_slice(&((value as u64) ^ (1u64 << 63)).to_be_bytes());
    key
}

/// Key range over comparable integers; `None` is unbounded.
pub fn int_range(start: Option<i64>, end: Option<i64>) -> holo_region::KeyRange {
    holo_region::KeyRange::new(
        start.map(int_key).unwrap_or_default(),
        end.map(int_key).unwrap_or_default(),
    )
}

/// How a fixture boundary is shifted relative to an encoded row key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Equal,
    /// Drop the last byte: sorts before every handle sharing that prefix.
    Less,
    /// Append `[1, 0]`: sorts after the handle, before the next one.
    Greater,
}

pub fn row_bound(table_id: i64, handle: Option<i64>, shift: Shift) -> Vec<u8> {
    let Some(handle) = handle else {
        return Vec::new();
    };
    let mut key = TableRowKeyEncoder.encode_row_key(table_id, handle);
    match shift {
        Shift::Equal => {}
        Shift::Less => {
            key.pop();
        }
        Shift::Greater => key.extend_from_slice(&[1, 0]),
    }
    key
}

pub fn row_range(table_id: i64, start: i64, end: i64) -> holo_region::KeyRange {
    holo_region::KeyRange::new(
        TableRowKeyEncoder.encode_row_key(table_id, start),
        TableRowKeyEncoder.encode_row_key(table_id, end),
    )
}

pub fn stores() -> Vec<Store> {
    vec![
        Store::new(1, "10.0.0.1:20160"),
        Store::new(2, "10.0.0.2:20160"),
        Store::new(3, "10.0.0.3:20160"),
    ]
}

/// Regions with ids `0..` built from consecutive `(start, end)` bounds.
pub fn regions_from_bounds(bounds: Vec<(Vec<u8>, Vec<u8>)>) -> Vec<Region> {
    bounds
        .into_iter()
        .enumerate()
        .map(|(id, (start, end))| {
            let leader = (id as u64 % 3) + 1;
            Region::new(id as u64, start, end)
                .with_leader(leader)
                .with_replicas([1, 2, 3])
        })
        .collect()
}

/// `[-inf, 30)`, `[30, 50)`, `[50, +inf)` over comparable integers.
pub fn three_int_regions() -> SnapshotDirectory {
    let regions = regions_from_bounds(vec![
        (Vec::new(), int_key(30)),
        (int_key(30), int_key(50)),
        (int_key(50), Vec::new()),
    ]);
    SnapshotDirectory::new(regions, stores()).expect("valid topology")
}

/// Seven regions over table `table_id` row keys, with boundaries that fall
/// between handles:
///
/// 0: `[-inf, -100)`, 1: `[-100, 10.x)`, 2: `[10.x, 50)`, 3: `[50, 100.x)`,
/// 4: `[100.x, <8960)`, 5: `[<8960, 16000)`, 6: `[16000, +inf)`.
pub fn seven_handle_regions(table_id: i64) -> SnapshotDirectory {
    let t = table_id;
    let regions = regions_from_bounds(vec![
        (row_bound(t, None, Shift::Equal), row_bound(t, Some(-100), Shift::Equal)),
        (row_bound(t, Some(-100), Shift::Equal), row_bound(t, Some(10), Shift::Greater)),
        (row_bound(t, Some(10), Shift::Greater), row_bound(t, Some(50), Shift::Equal)),
        (row_bound(t, Some(50), Shift::Equal), row_bound(t, Some(100), Shift::Greater)),
        (row_bound(t, Some(100), Shift::Greater), row_bound(t, Some(9000), Shift::Less)),
        (row_bound(t, Some(0x2300), Shift::Less), row_bound(t, Some(16000), Shift::Equal)),
        (row_bound(t, Some(16000), Shift::Equal), row_bound(t, None, Shift::Equal)),
    ]);
    SnapshotDirectory::new(regions, stores()).expect("valid topology")
}

/// Wraps a directory and counts key lookups.
pub struct CountingDirectory<D> {
    pub inner: D,
    lookups: AtomicUsize,
}

impl<D> CountingDirectory<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl<D: RegionDirectory> RegionDirectory for CountingDirectory<D> {
    fn region_store_by_key(&self, key: &[u8], policy: ReplicaPolicy) -> Result<RegionStore> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.region_store_by_key(key, policy)
    }

    fn region_store_by_id(&self, region_id: u64, policy: ReplicaPolicy) -> Result<RegionStore> {
        self.inner.region_store_by_id(region_id, policy)
    }
}

/// Answers the first `switch_after` lookups from `before`, the rest from
/// `after`, like a directory that observes a split mid-call.
pub struct ShiftingDirectory {
    pub before: SnapshotDirectory,
    pub after: SnapshotDirectory,
    pub switch_after: usize,
    lookups: AtomicUsize,
}

impl ShiftingDirectory {
    pub fn new(before: SnapshotDirectory, after: SnapshotDirectory, switch_after: usize) -> Self {
        Self {
            before,
            after,
            switch_after,
            lookups: AtomicUsize::new(0),
        }
    }

    fn current(&self) -> &SnapshotDirectory {
        if self.lookups.fetch_add(1, Ordering::SeqCst) < self.switch_after {
            &self.before
        } else {
            &self.after
        }
    }
}

impl RegionDirectory for ShiftingDirectory {
    fn region_store_by_key(&self, key: &[u8], policy: ReplicaPolicy) -> Result<RegionStore> {
        self.current().region_store_by_key(key, policy)
    }

    fn region_store_by_id(&self, region_id: u64, policy: ReplicaPolicy) -> Result<RegionStore> {
        self.current().region_store_by_id(region_id, policy)
    }
}

/// Always answers with the same region, whatever the key.
pub struct FixedDirectory(pub RegionStore);

impl RegionDirectory for FixedDirectory {
    fn region_store_by_key(&self, _key: &[u8], _policy: ReplicaPolicy) -> Result<RegionStore> {
        Ok(self.0.clone())
    }

    fn region_store_by_id(&self, _region_id: u64, _policy: ReplicaPolicy) -> Result<RegionStore> {
        Ok(self.0.clone())
    }
}

/// Directory with no regions at all.
pub struct EmptyDirectory;

impl RegionDirectory for EmptyDirectory {
    fn region_store_by_key(&self, _key: &[u8], _policy: ReplicaPolicy) -> Result<RegionStore> {
        Err(anyhow::anyhow!("region cache is empty"))
    }

    fn region_store_by_id(&self, region_id: u64, _policy: ReplicaPolicy) -> Result<RegionStore> {
        Err(anyhow::anyhow!("region {region_id} not cached"))
    }
}
