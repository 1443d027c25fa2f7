//! `list` use case: materializes one directory's children.

use crate::domain::entities::DirectoryEntry;
use crate::domain::services::{DirectoryDecoder, IndexDecodeError};
use crate::infrastructure::ntfs::VolumeContext;

pub struct ListDirectoryUseCase;

impl ListDirectoryUseCase {
    pub fn execute(volume: &VolumeContext, dir_mft_index: u64) -> Result<Vec<DirectoryEntry>, IndexDecodeError> {
        volume.list_children(dir_mft_index)
    }
}
