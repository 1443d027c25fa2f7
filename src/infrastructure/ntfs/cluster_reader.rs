//! Concrete `ClusterReader`: overlay first, image second, gated by the
//! safe-region oracle. Misses against the oracle are recorded into a
//! `BadClusterTracker` so a caller can later emit a bad-clusters report.

use crate::domain::repositories::{BlockDeviceReader, OverlayStore};
use crate::domain::services::{BadClusterTracker, ClusterReadError, ClusterReader, SafeRegionOracle};
use parking_lot::Mutex;
use std::sync::Arc;

pub struct VolumeClusterReader {
    image: Arc<dyn BlockDeviceReader>,
    safe_regions: Arc<dyn SafeRegionOracle>,
    overlay: Mutex<Box<dyn OverlayStore>>,
    bad_clusters: Mutex<BadClusterTracker>,
    cluster_size: u64,
    partition_offset: u64,
}

impl VolumeClusterReader {
    pub fn new(
        image: Arc<dyn BlockDeviceReader>,
        safe_regions: Arc<dyn SafeRegionOracle>,
        overlay: Box<dyn OverlayStore>,
        cluster_size: u64,
        partition_offset: u64,
    ) -> Self {
        Self {
            image,
            safe_regions,
            overlay: Mutex::new(overlay),
            bad_clusters: Mutex::new(BadClusterTracker::new()),
            cluster_size,
            partition_offset,
        }
    }

    fn byte_offset(&self, cluster_id: u64) -> u64 {
        self.partition_offset + cluster_id * self.cluster_size
    }

    /// Records a cluster as unreadable, attributing it to `owning_mft_index`
    /// for later per-file bad-cluster reporting.
    pub fn note_bad_cluster(&self, cluster_id: u64, owning_mft_index: u64) {
        self.bad_clusters.lock().note_bad(cluster_id, owning_mft_index);
    }

    pub fn bad_clusters(&self) -> BadClusterTracker {
        self.bad_clusters.lock().clone()
    }

    /// Persists a freshly-recovered cluster's bytes into the overlay.
    pub fn store_recovered(
        &self,
        cluster_id: u64,
        bytes: &[u8],
    ) -> Result<(), crate::domain::repositories::OverlayError> {
        self.overlay.lock().put(cluster_id, bytes)
    }

    pub fn save_overlay(&self) -> Result<(), crate::domain::repositories::OverlayError> {
        self.overlay.lock().save()
    }

    /// Swaps in a different overlay backing store, e.g. when a caller
    /// attaches `--overlay <path>` after the volume context is already open.
    pub fn replace_overlay(&self, overlay: Box<dyn OverlayStore>) {
        *self.overlay.lock() = overlay;
    }

    pub fn partition_offset(&self) -> u64 {
        self.partition_offset
    }
}

impl ClusterReader for VolumeClusterReader {
    fn cluster_size(&self) -> u64 {
        self.cluster_size
    }

    fn read_cluster(&self, cluster_id: u64) -> Result<Vec<u8>, ClusterReadError> {
        if let Some(bytes) = self.overlay.lock().get(cluster_id) {
            return Ok(bytes);
        }

        let offset = self.byte_offset(cluster_id);
        if offset + self.cluster_size > self.image.size() {
            return Err(ClusterReadError::NotReadable(cluster_id));
        }
        if !self.safe_regions.is_byte_range_safe(offset, self.cluster_size) {
            return Err(ClusterReadError::NotReadable(cluster_id));
        }

        self.image
            .read_at(offset, self.cluster_size as usize)
            .map_err(|_| ClusterReadError::NotReadable(cluster_id))
    }

    fn is_cluster_safe(&self, cluster_id: u64) -> bool {
        if self.overlay.lock().has(cluster_id) {
            return true;
        }
        let offset = self.byte_offset(cluster_id);
        offset + self.cluster_size <= self.image.size()
            && self.safe_regions.is_byte_range_safe(offset, self.cluster_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::{BlockDeviceError, DeviceInfo};
    use crate::infrastructure::ntfs::safe_region::SafeRegionIndex;
    use crate::infrastructure::overlay::OverlayStoreFile;

    struct FakeImage {
        bytes: Vec<u8>,
    }

    impl BlockDeviceReader for FakeImage {
        fn open(_path: &str) -> Result<Self, BlockDeviceError> {
            unreachable!("not exercised in this test")
        }

        fn device_info(&self) -> Result<DeviceInfo, BlockDeviceError> {
            unreachable!("not exercised in this test")
        }

        fn read_at(&self, offset: u64, length: usize) -> Result<Vec<u8>, BlockDeviceError> {
            self.bytes
                .get(offset as usize..offset as usize + length)
                .map(|s| s.to_vec())
                .ok_or_else(|| BlockDeviceError::InvalidOffset {
                    offset,
                    device_size: self.bytes.len() as u64,
                })
        }

        fn read_chunks<F>(&self, _: u64, _: usize, _: F) -> Result<u64, BlockDeviceError>
        where
            F: FnMut(u64, &[u8]) -> bool,
        {
            unreachable!("not exercised in this test")
        }

        fn path(&self) -> &str {
            "fake"
        }

        fn size(&self) -> u64 {
            self.bytes.len() as u64
        }
    }

    fn reader_with(safe: Vec<(u64, u64)>, image_bytes: Vec<u8>) -> VolumeClusterReader {
        let dir = tempfile::tempdir().unwrap();
        let overlay = OverlayStoreFile::open(&dir.path().join("ov"), 4).unwrap();
        // leak the tempdir so the files outlive the overlay for the test's duration
        std::mem::forget(dir);
        VolumeClusterReader::new(
            Arc::new(FakeImage { bytes: image_bytes }),
            Arc::new(SafeRegionIndex::new(safe)),
            Box::new(overlay),
            4,
            0,
        )
    }

    #[test]
    fn reads_from_image_when_safe() {
        let reader = reader_with(vec![(0, 8)], vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(reader.read_cluster(1).unwrap(), vec![5, 6, 7, 8]);
    }

    #[test]
    fn rejects_unsafe_cluster() {
        let reader = reader_with(vec![(0, 4)], vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(reader.read_cluster(1), Err(ClusterReadError::NotReadable(1)));
    }

    #[test]
    fn overlay_takes_precedence_over_unsafe_image_region() {
        let reader = reader_with(vec![(0, 4)], vec![1, 2, 3, 4, 5, 6, 7, 8]);
        reader.store_recovered(1, &[9, 9, 9, 9]).unwrap();
        assert_eq!(reader.read_cluster(1).unwrap(), vec![9, 9, 9, 9]);
        assert!(reader.is_cluster_safe(1));
    }

    #[test]
    fn rejects_read_past_end_of_image() {
        let reader = reader_with(vec![(0, 8)], vec![1, 2, 3, 4]);
        assert_eq!(reader.read_cluster(1), Err(ClusterReadError::NotReadable(1)));
    }
}
