//! Per-region units of partitioner output.

use std::fmt;

use crate::keys::KeyRange;
use crate::region::{Region, RegionStore, Store};

/// One unit of partitioner output: a region, the replica to send to, and the
/// ranges of the request that fall inside that region.
///
/// Tasks are built per call and never mutated; two tasks are equal when their
/// region, store and range list are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegionTask {
    region: Region,
    store: Store,
    ranges: Vec<KeyRange>,
    host: Option<String>,
}

impl RegionTask {
    pub fn new(region: Region, store: Store, ranges: Vec<KeyRange>) -> Self {
        let host = store.host();
        Self {
            region,
            store,
            ranges,
            host,
        }
    }

    pub(crate) fn from_pair(pair: RegionStore, ranges: Vec<KeyRange>) -> Self {
        Self::new(pair.region, pair.store, ranges)
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn region_id(&self) -> u64 {
        self.region.region_id
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn ranges(&self) -> &[KeyRange] {
        &self.ranges
    }

    /// Host of the chosen replica, when its address could be parsed.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn into_ranges(self) -> Vec<KeyRange> {
        self.ranges
    }
}

impl fmt::Display for RegionTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Region [{}] Store [{}]", self.region, self.store.address)?;
        for range in &self.ranges {
            write!(f, " {range}")?;
        }
        Ok(())
    }
}
