//! Range and handle partitioning against the live region topology.
//!
//! Design:
//! - Every step re-resolves from the [`RegionDirectory`]. Nothing learned
//!   about region bounds survives the call, so a stale topology is fixed by
//!   calling again after the directory refreshes.
//! - Range splitting walks a "remainder" range forward, cutting it at each
//!   region end until it fits inside one region.
//! - Handle splitting sorts handles once and only consults the directory when
//!   the encoded key crosses the current region's end, so lookups scale with
//!   regions touched rather than with handles.
//!
//! Output:
//! - One [`RegionTask`] per region touched, ordered by region id, with ranges
//!   kept in the order they were cut.

use std::collections::{BTreeMap, HashSet};

use crate::batch::{self, GroupKeyResult};
use crate::config::SplitterConfig;
use crate::directory::{self, RegionDirectory};
use crate::error::SplitResult;
use crate::keys::{end_within, format_key, KeyRange, RowKeyEncoder, TableRowKeyEncoder};
use crate::region::{RegionStore, ReplicaPolicy};
use crate::task::RegionTask;

/// Sorted handles of one table that live in one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleGroup {
    /// Region and replica resolved on the first handle that landed here.
    pub pair: RegionStore,
    /// Handles in ascending order, without duplicates.
    pub handles: Vec<i64>,
}

/// Splits requests into per-region tasks.
///
/// Holds no state besides its collaborators; concurrent calls are
/// independent.
#[derive(Debug, Clone)]
pub struct RangeSplitter<D, E = TableRowKeyEncoder> {
    directory: D,
    encoder: E,
    config: SplitterConfig,
}

impl<D: RegionDirectory> RangeSplitter<D, TableRowKeyEncoder> {
    pub fn new(directory: D) -> Self {
        Self {
            directory,
            encoder: TableRowKeyEncoder,
            config: SplitterConfig::default(),
        }
    }
}

impl<D: RegionDirectory, E: RowKeyEncoder> RangeSplitter<D, E> {
    /// Swaps the row-key encoder used for handle partitioning.
    pub fn with_encoder<E2: RowKeyEncoder>(self, encoder: E2) -> RangeSplitter<D, E2> {
        RangeSplitter {
            directory: self.directory,
            encoder,
            config: self.config,
        }
    }

    pub fn with_config(mut self, config: SplitterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Split key ranges into region tasks using the configured replica policy.
    pub fn split_range_by_region_default(
        &self,
        ranges: &[KeyRange],
    ) -> SplitResult<Vec<RegionTask>> {
        self.split_range_by_region(ranges, self.config.replica_policy)
    }

    /// Look up a region by id using the configured replica policy.
    ///
    /// Used to re-target a task after a stale-region reply names the region
    /// that now owns the range.
    pub fn region_store_by_id(&self, region_id: u64) -> SplitResult<RegionStore> {
        directory::resolve_id(&self.directory, region_id, self.config.replica_policy)
    }

    /// Group point keys by owning region using the configured replica policy.
    pub fn group_keys_by_region(&self, keys: &[Vec<u8>]) -> SplitResult<GroupKeyResult> {
        batch::group_keys_by_region(&self.directory, keys, self.config.replica_policy)
    }

    /// Split ordered key ranges into region tasks, one per region touched.
    ///
    /// Inputs:
    /// - `ranges`: half-open ranges, pairwise ordered; each may span regions.
    /// - `policy`: replica selection passed to the directory.
    ///
    /// Output:
    /// - Tasks ordered by region id. A range ending exactly on a region end
    ///   stays whole in that region; the boundary key itself belongs to the
    ///   next region.
    pub fn split_range_by_region(
        &self,
        ranges: &[KeyRange],
        policy: ReplicaPolicy,
    ) -> SplitResult<Vec<RegionTask>> {
        let mut inputs = ranges.iter();
        let Some(first) = inputs.next() else {
            return Ok(Vec::new());
        };

        let mut lookups = 0usize;
        let mut id_to_ranges: BTreeMap<u64, (RegionStore, Vec<KeyRange>)> = BTreeMap::new();
        let mut range = first.clone();
        loop {
            let pair = self.resolve(&range.start, policy, &mut lookups)?;
            let region_end = pair.region.end_key.clone();
            let (_, assigned) = id_to_ranges
                .entry(pair.region_id())
                .or_insert_with(|| (pair, Vec::new()));

            if end_within(&range.end, &region_end) {
                // Remainder fits in the region: move on to the next input.
                assigned.push(range);
                match inputs.next() {
                    Some(next) => range = next.clone(),
                    None => break,
                }
            } else {
                tracing::trace!(
                    start = %format_key(&range.start),
                    cut = %format_key(&region_end),
                    "cut range at region end"
                );
                let start = std::mem::take(&mut range.start);
                assigned.push(KeyRange::new(start, region_end.clone()));
                range.start = region_end;
            }
        }

        let tasks: Vec<RegionTask> = id_to_ranges
            .into_values()
            .map(|(pair, ranges)| RegionTask::from_pair(pair, ranges))
            .collect();
        tracing::debug!(
            input_ranges = ranges.len(),
            tasks = tasks.len(),
            lookups,
            %policy,
            "split ranges by region"
        );
        Ok(tasks)
    }

    /// Group handles by the region owning their row key; handles are sorted.
    ///
    /// Output:
    /// - One group per region that received at least one handle, ordered by
    ///   region id. Duplicate handles are dropped.
    pub fn group_by_and_sort_handles_by_region(
        &self,
        table_id: i64,
        handles: &[i64],
    ) -> SplitResult<Vec<HandleGroup>> {
        let mut sorted = handles.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let policy = self.config.replica_policy;
        let mut lookups = 0usize;
        let mut groups: BTreeMap<u64, HandleGroup> = BTreeMap::new();
        let mut current: Option<RegionStore> = None;
        let mut bucket: Vec<i64> = Vec::new();

        for handle in sorted {
            let key = self.encoder.encode_row_key(table_id, handle);
            let crossed = match &current {
                None => true,
                Some(pair) => !pair.region.end_key.is_empty() && key >= pair.region.end_key,
            };
            if crossed {
                if let Some(pair) = current.take() {
                    flush_bucket(&mut groups, pair, std::mem::take(&mut bucket));
                }
                current = Some(self.resolve(&key, policy, &mut lookups)?);
            }
            bucket.push(handle);
        }
        if let Some(pair) = current {
            flush_bucket(&mut groups, pair, bucket);
        }

        tracing::debug!(
            table_id,
            handles = handles.len(),
            regions = groups.len(),
            lookups,
            "grouped handles by region"
        );
        Ok(groups.into_values().collect())
    }

    /// Build region tasks for handles of several tables.
    ///
    /// Tasks from different tables are never merged, even when they share a
    /// region; only structurally identical tasks collapse. Order is first
    /// seen, table by table.
    pub fn split_and_sort_handles_by_region(
        &self,
        table_ids: &[i64],
        handles: &[i64],
    ) -> SplitResult<Vec<RegionTask>> {
        let mut seen = HashSet::new();
        let mut tasks = Vec::new();
        for &table_id in table_ids {
            for task in self.split_handles_for_table(table_id, handles)? {
                if seen.insert(task.clone()) {
                    tasks.push(task);
                }
            }
        }
        Ok(tasks)
    }

    /// Build region tasks for handles of one table.
    ///
    /// Consecutive handles collapse into one range
    /// `[key(first), key(last + 1))`; a lone handle becomes a one-row range.
    pub fn split_handles_for_table(
        &self,
        table_id: i64,
        handles: &[i64],
    ) -> SplitResult<Vec<RegionTask>> {
        let tasks = self
            .group_by_and_sort_handles_by_region(table_id, handles)?
            .into_iter()
            .filter(|group| !group.handles.is_empty())
            .map(|group| {
                let ranges = self.handle_ranges(table_id, &group.handles);
                RegionTask::from_pair(group.pair, ranges)
            })
            .collect();
        Ok(tasks)
    }

    /// Run-length encode sorted handles into row-key ranges.
    fn handle_ranges(&self, table_id: i64, handles: &[i64]) -> Vec<KeyRange> {
        let mut ranges = Vec::new();
        let mut iter = handles.iter().copied();
        let Some(first) = iter.next() else {
            return ranges;
        };
        let (mut start, mut end) = (first, first);
        for handle in iter {
            if end.checked_add(1) == Some(handle) {
                end = handle;
            } else {
                ranges.push(self.run_range(table_id, start, end));
                start = handle;
                end = handle;
            }
        }
        ranges.push(self.run_range(table_id, start, end));
        ranges
    }

    fn run_range(&self, table_id: i64, first: i64, last: i64) -> KeyRange {
        KeyRange::new(
            self.encoder.encode_row_key(table_id, first),
            self.encoder.row_key_end(table_id, last),
        )
    }

    fn resolve(
        &self,
        key: &[u8],
        policy: ReplicaPolicy,
        lookups: &mut usize,
    ) -> SplitResult<RegionStore> {
        *lookups += 1;
        directory::resolve_key(&self.directory, key, policy)
    }
}

fn flush_bucket(groups: &mut BTreeMap<u64, HandleGroup>, pair: RegionStore, bucket: Vec<i64>) {
    if bucket.is_empty() {
        return;
    }
    groups
        .entry(pair.region_id())
        .or_insert_with(|| HandleGroup {
            pair,
            handles: Vec::new(),
        })
        .handles
        .extend(bucket);
}
