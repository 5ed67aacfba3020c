//! Region-aware request partitioning for HoloStore clients.
//!
//! The store splits its key space into contiguous regions that move, split and
//! merge in the background. This crate turns logical requests into per-region
//! work: key ranges and row handles become [`RegionTask`]s, point keys become
//! [`BatchKeys`] groups, and lock probe results are interpreted through
//! [`TxnStatus`].
//!
//! The API surface is intentionally small: callers supply a
//! [`RegionDirectory`] and drive partitioning through [`RangeSplitter`]. RPC
//! dispatch and stale-region retries stay with the caller, which simply runs
//! the partitioner again once its directory has been refreshed.

pub mod batch;
pub mod config;
pub mod directory;
pub mod error;
pub mod keys;
pub mod region;
pub mod splitter;
pub mod task;
pub mod txn_status;

pub use batch::{group_keys_by_region, BatchKeys, GroupKeyResult};
pub use config::SplitterConfig;
pub use directory::{RegionDirectory, SnapshotDirectory};
pub use error::{SplitError, SplitResult};
pub use keys::{decode_row_key, format_key, KeyRange, RowKeyEncoder, TableRowKeyEncoder};
pub use region::{Region, RegionStore, ReplicaPolicy, Store};
pub use splitter::{HandleGroup, RangeSplitter};
pub use task::RegionTask;
pub use txn_status::{Action, TxnStatus, TxnStatusKind};
