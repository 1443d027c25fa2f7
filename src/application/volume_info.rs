//! `info` use case: summarizes an opened volume's geometry.

use crate::application::dto::VolumeInfo;
use crate::infrastructure::ntfs::VolumeContext;

pub struct VolumeInfoUseCase;

impl VolumeInfoUseCase {
    pub fn execute(volume: &VolumeContext, image_path: &str) -> VolumeInfo {
        let geometry = volume.geometry();
        VolumeInfo {
            image_path: image_path.to_string(),
            partition_offset: volume.cluster_reader().partition_offset(),
            bytes_per_sector: geometry.bytes_per_sector,
            sectors_per_cluster: geometry.sectors_per_cluster,
            cluster_size: geometry.cluster_size(),
            mft_record_size: geometry.mft_record_size(),
            mft_cluster: geometry.mft_cluster,
            mft_mirror_cluster: geometry.mft_mirror_cluster,
            volume_size: geometry.volume_size(),
        }
    }
}
