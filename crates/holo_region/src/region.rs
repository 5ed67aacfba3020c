//! Region and store descriptors as seen by a client.
//!
//! These are value snapshots. A directory may hand out a fresh copy on every
//! lookup, so everything here compares structurally and never by identity.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::Deserialize;

use crate::keys::{format_key, key_in_range};

/// Which replica of a region a request should target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicaPolicy {
    /// Current leaseholder; the only replica that accepts writes.
    #[default]
    Leader,
    /// A non-leader voter, for stale-tolerant reads.
    Follower,
    /// A learner replica (e.g. a columnar copy used for analytics scans).
    Learner,
}

impl fmt::Display for ReplicaPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReplicaPolicy::Leader => "leader",
            ReplicaPolicy::Follower => "follower",
            ReplicaPolicy::Learner => "learner",
        };
        f.write_str(name)
    }
}

impl FromStr for ReplicaPolicy {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "leader" => Ok(ReplicaPolicy::Leader),
            "follower" => Ok(ReplicaPolicy::Follower),
            "learner" => Ok(ReplicaPolicy::Learner),
            other => Err(anyhow!(
                "unknown replica policy '{other}' (expected leader, follower or learner)"
            )),
        }
    }
}

/// Region descriptor: identity, `[start_key, end_key)` bounds and replicas.
///
/// Empty `start_key` means negative infinity, empty `end_key` positive
/// infinity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Region {
    /// Stable region id.
    pub region_id: u64,
    /// Inclusive start key.
    pub start_key: Vec<u8>,
    /// Exclusive end key.
    pub end_key: Vec<u8>,
    /// Store ids of voting replicas.
    pub replicas: Vec<u64>,
    /// Store ids of learner replicas.
    pub learners: Vec<u64>,
    /// Store id that currently holds the lease.
    pub leader: u64,
}

impl Region {
    pub fn new(region_id: u64, start_key: Vec<u8>, end_key: Vec<u8>) -> Self {
        Self {
            region_id,
            start_key,
            end_key,
            ..Self::default()
        }
    }

    pub fn with_leader(mut self, store_id: u64) -> Self {
        self.leader = store_id;
        if !self.replicas.contains(&store_id) {
            self.replicas.push(store_id);
        }
        self
    }

    pub fn with_replicas(mut self, replicas: impl IntoIterator<Item = u64>) -> Self {
        for store_id in replicas {
            if !self.replicas.contains(&store_id) {
                self.replicas.push(store_id);
            }
        }
        self
    }

    pub fn with_learners(mut self, learners: impl IntoIterator<Item = u64>) -> Self {
        self.learners.extend(learners);
        self
    }

    /// Checks whether `key` falls within this region's bounds.
    pub fn contains(&self, key: &[u8]) -> bool {
        key_in_range(key, &self.start_key, &self.end_key)
    }

    /// Returns `true` when the region extends to positive infinity.
    pub fn is_last(&self) -> bool {
        self.end_key.is_empty()
    }

    /// Picks the store id serving `policy`, if the region has one.
    pub fn store_for(&self, policy: ReplicaPolicy) -> Option<u64> {
        match policy {
            ReplicaPolicy::Leader => Some(self.leader),
            ReplicaPolicy::Follower => self
                .replicas
                .iter()
                .copied()
                .find(|id| *id != self.leader)
                .or(Some(self.leader)),
            ReplicaPolicy::Learner => self.learners.first().copied(),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id: {} start: [{}] end: [{}] leader: {}",
            self.region_id,
            format_key(&self.start_key),
            format_key(&self.end_key),
            self.leader
        )
    }
}

/// Physical store hosting region replicas.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Store {
    pub store_id: u64,
    /// Address as published by the cluster, `host:port` or a URI.
    pub address: String,
}

impl Store {
    pub fn new(store_id: u64, address: impl Into<String>) -> Self {
        Self {
            store_id,
            address: address.into(),
        }
    }

    /// Host portion of the store address, used for diagnostics.
    pub fn host(&self) -> Option<String> {
        host_from_addr(&self.address)
    }
}

/// One directory answer: the owning region and the replica chosen for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegionStore {
    pub region: Region,
    pub store: Store,
}

impl RegionStore {
    pub fn new(region: Region, store: Store) -> Self {
        Self { region, store }
    }

    pub fn region_id(&self) -> u64 {
        self.region.region_id
    }
}

/// Extracts the host from `host:port`, `[v6]:port` or `scheme://host:port`.
pub(crate) fn host_from_addr(addr: &str) -> Option<String> {
    let addr = addr.trim();
    let without_scheme = addr.split_once("://").map_or(addr, |(_, rest)| rest);
    let authority = without_scheme.split('/').next().unwrap_or_default();
    if authority.is_empty() {
        return None;
    }
    if let Some(rest) = authority.strip_prefix('[') {
        return rest.split_once(']').map(|(host, _)| host.to_string());
    }
    let host = match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => authority,
    };
    (!host.is_empty()).then(|| host.to_string())
}
