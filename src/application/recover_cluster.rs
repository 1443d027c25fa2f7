//! `recover` use case: reads clusters directly from a (possibly different)
//! source device and stores them into the overlay, independent of whatever
//! the partial image currently holds at those offsets.

use crate::domain::repositories::{BlockDeviceError, BlockDeviceReader, OverlayError, OverlayStore};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecoverError {
    #[error(transparent)]
    Device(#[from] BlockDeviceError),

    #[error(transparent)]
    Overlay(#[from] OverlayError),
}

pub struct RecoverClusterUseCase;

impl RecoverClusterUseCase {
    /// Reads `count` clusters of `cluster_size` bytes starting at
    /// `start_cluster`, storing each into `overlay`, then persists the
    /// overlay's index. Stops at the first unreadable cluster rather than
    /// silently skipping it: a caller recovering clusters directly from a
    /// device expects every requested cluster to succeed.
    pub fn execute(
        device: &dyn BlockDeviceReader,
        overlay: &mut dyn OverlayStore,
        partition_offset: u64,
        start_cluster: u64,
        count: u64,
        cluster_size: u64,
    ) -> Result<u64, RecoverError> {
        let mut recovered = 0u64;
        for cluster_id in start_cluster..start_cluster + count {
            let offset = partition_offset + cluster_id * cluster_size;
            let bytes = device.read_at(offset, cluster_size as usize)?;
            overlay.put(cluster_id, &bytes)?;
            recovered += 1;
        }
        overlay.save()?;
        Ok(recovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::DeviceInfo;
    use crate::infrastructure::overlay::OverlayStoreFile;

    struct FakeDevice {
        bytes: Vec<u8>,
    }

    impl BlockDeviceReader for FakeDevice {
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
                .ok_or(BlockDeviceError::InvalidOffset {
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

    #[test]
    fn recovers_a_run_of_clusters_into_the_overlay() {
        let cluster_size = 4u64;
        let device = FakeDevice {
            bytes: (0u8..32).collect(),
        };
        let dir = tempfile::tempdir().unwrap();
        let mut overlay = OverlayStoreFile::open(&dir.path().join("ov"), cluster_size).unwrap();

        let recovered =
            RecoverClusterUseCase::execute(&device, &mut overlay, 0, 2, 3, cluster_size).unwrap();

        assert_eq!(recovered, 3);
        assert_eq!(overlay.get(2), Some(vec![8, 9, 10, 11]));
        assert_eq!(overlay.get(3), Some(vec![12, 13, 14, 15]));
        assert_eq!(overlay.get(4), Some(vec![16, 17, 18, 19]));
        assert!(!overlay.has(5));
    }

    #[test]
    fn stops_at_the_first_unreadable_cluster() {
        let cluster_size = 4u64;
        let device = FakeDevice { bytes: vec![0u8; 16] };
        let dir = tempfile::tempdir().unwrap();
        let mut overlay = OverlayStoreFile::open(&dir.path().join("ov"), cluster_size).unwrap();

        let err = RecoverClusterUseCase::execute(&device, &mut overlay, 0, 3, 2, cluster_size).unwrap_err();

        assert!(matches!(err, RecoverError::Device(_)));
        assert!(overlay.has(3));
        assert!(!overlay.has(4));
    }

    #[test]
    fn honors_a_nonzero_partition_offset() {
        let cluster_size = 4u64;
        let device = FakeDevice {
            bytes: (0u8..32).collect(),
        };
        let dir = tempfile::tempdir().unwrap();
        let mut overlay = OverlayStoreFile::open(&dir.path().join("ov"), cluster_size).unwrap();

        RecoverClusterUseCase::execute(&device, &mut overlay, 8, 0, 1, cluster_size).unwrap();

        assert_eq!(overlay.get(0), Some(vec![8, 9, 10, 11]));
    }
}
