//! `bad-clusters` use case: walks the same scope as `restore` without
//! writing any files, then reports every cluster that could not be read.

use crate::domain::entities::ByteRange;
use crate::domain::services::DirectoryDecoder;
use crate::infrastructure::ntfs::VolumeContext;

pub struct BadClustersUseCase;

impl BadClustersUseCase {
    pub fn execute(volume: &VolumeContext, root_mft_index: u64) -> Vec<ByteRange> {
        Self::walk(volume, root_mft_index);
        volume.bad_cluster_report()
    }

    fn walk(volume: &VolumeContext, dir_mft_index: u64) {
        let children = match volume.list_children(dir_mft_index) {
            Ok(children) => children,
            Err(err) => {
                log::warn!("directory {dir_mft_index} could not be listed: {err}");
                return;
            }
        };

        for entry in children {
            if entry.deleted {
                continue;
            }

            if entry.is_directory() {
                Self::walk(volume, entry.mft_index as u64);
                continue;
            }

            match volume.decode_mft_record(entry.mft_index as u64) {
                Ok(record) => {
                    volume.extract_data(&record, entry.mft_index as u64);
                }
                Err(err) => log::warn!("record {} could not be decoded: {err}", entry.mft_index),
            }
        }
    }
}
