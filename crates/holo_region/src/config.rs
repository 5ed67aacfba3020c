//! Splitter configuration.
//!
//! Loaded from `HOLO_REGION_*` environment variables, or deserialized as part
//! of a caller's own config file.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::region::ReplicaPolicy;

/// Env var selecting the default replica policy.
pub const ENV_REPLICA_POLICY: &str = "HOLO_REGION_REPLICA_POLICY";

/// Runtime configuration for a [`crate::RangeSplitter`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Replica targeted by entry points that take no explicit policy,
    /// including handle partitioning.
    pub replica_policy: ReplicaPolicy,
}

impl SplitterConfig {
    /// Loads configuration from environment variables with defaults.
    pub fn from_env() -> Result<Self> {
        let replica_policy = parse_policy(std::env::var(ENV_REPLICA_POLICY).ok())?;
        Ok(Self { replica_policy })
    }
}

fn parse_policy(value: Option<String>) -> Result<ReplicaPolicy> {
    match value.filter(|raw| !raw.trim().is_empty()) {
        Some(raw) => raw
            .parse::<ReplicaPolicy>()
            .with_context(|| format!("invalid {ENV_REPLICA_POLICY} value: {raw}")),
        None => Ok(ReplicaPolicy::default()),
    }
}
