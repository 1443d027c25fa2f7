//! Bad-cluster tracker: a global set plus a per-MFT-index set of clusters
//! that could not be read safely, with run-length-encoded reporting.

use crate::domain::entities::ByteRange;
use std::collections::{HashMap, HashSet};

/// Tracks clusters that turned out to be unreadable, both globally and per
/// owning MFT record, so a later pass can target exactly those ranges for
/// recovery. All inserts are idempotent.
#[derive(Debug, Default, Clone)]
pub struct BadClusterTracker {
    global: HashSet<u64>,
    by_mft_index: HashMap<u64, HashSet<u64>>,
}

impl BadClusterTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note_bad(&mut self, cluster_id: u64, owning_mft_index: u64) {
        self.global.insert(cluster_id);
        self.by_mft_index
            .entry(owning_mft_index)
            .or_default()
            .insert(cluster_id);
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }

    pub fn global_count(&self) -> usize {
        self.global.len()
    }

    pub fn clusters_for(&self, mft_index: u64) -> Option<&HashSet<u64>> {
        self.by_mft_index.get(&mft_index)
    }

    /// Emits the global bad-cluster set as ascending, run-length-encoded
    /// byte ranges: `partition_offset + cluster * cluster_size`, merging
    /// consecutive cluster ids into a single range.
    pub fn byte_ranges(&self, partition_offset: u64, cluster_size: u64) -> Vec<ByteRange> {
        let mut sorted: Vec<u64> = self.global.iter().copied().collect();
        sorted.sort_unstable();

        let mut ranges = Vec::new();
        let mut iter = sorted.into_iter();
        let Some(first) = iter.next() else {
            return ranges;
        };

        let mut start = first;
        let mut end = first;
        for cluster in iter {
            if cluster == end + 1 {
                end = cluster;
            } else {
                ranges.push(Self::range_for(start, end, partition_offset, cluster_size));
                start = cluster;
                end = cluster;
            }
        }
        ranges.push(Self::range_for(start, end, partition_offset, cluster_size));
        ranges
    }

    fn range_for(start: u64, end: u64, partition_offset: u64, cluster_size: u64) -> ByteRange {
        ByteRange {
            offset: partition_offset + start * cluster_size,
            length: (end - start + 1) * cluster_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_consecutive_clusters_into_one_range() {
        let mut tracker = BadClusterTracker::new();
        for c in [3u64, 4, 5, 7, 8, 12] {
            tracker.note_bad(c, 100);
        }

        let ranges = tracker.byte_ranges(0, 0x1000);
        assert_eq!(
            ranges,
            vec![
                ByteRange { offset: 3 * 0x1000, length: 3 * 0x1000 },
                ByteRange { offset: 7 * 0x1000, length: 2 * 0x1000 },
                ByteRange { offset: 12 * 0x1000, length: 0x1000 },
            ]
        );
    }

    #[test]
    fn empty_tracker_emits_nothing() {
        let tracker = BadClusterTracker::new();
        assert!(tracker.byte_ranges(0, 0x1000).is_empty());
    }

    #[test]
    fn insert_is_idempotent_and_tracked_per_mft_index() {
        let mut tracker = BadClusterTracker::new();
        tracker.note_bad(42, 5);
        tracker.note_bad(42, 5);
        tracker.note_bad(42, 9);

        assert_eq!(tracker.global_count(), 1);
        assert_eq!(tracker.clusters_for(5).unwrap().len(), 1);
        assert_eq!(tracker.clusters_for(9).unwrap().len(), 1);
    }
}
