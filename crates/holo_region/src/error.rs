//! Error types raised while partitioning requests.
//!
//! Only two things can go wrong here: the directory cannot resolve a key or
//! region id, or it returns something that contradicts the cut in progress.
//! Transport and retry errors belong to the dispatch layer.

/// Result alias used across the partitioner.
pub type SplitResult<T> = std::result::Result<T, SplitError>;

#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    /// The directory could not map a key to a region.
    #[error("fail to get region/store pair by key {key}")]
    Resolution {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// The directory could not map a region id to a region.
    #[error("fail to get region/store pair by region id {region_id}")]
    RegionNotFound {
        region_id: u64,
        #[source]
        source: anyhow::Error,
    },

    /// The directory (or a caller) produced state that breaks a partitioning
    /// or lock status invariant.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl SplitError {
    /// Returns `true` when the caller should refresh its topology and rerun
    /// the whole partitioning call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SplitError::Resolution { .. } | SplitError::RegionNotFound { .. }
        )
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!(%message, "region partition invariant violated");
        SplitError::InvariantViolation(message)
    }
}
