//! Directory listing entities produced by the `$I30` index decoder.

use super::mft_record::{FileNamespace, Timestamps};
use std::collections::HashMap;

/// One child of a directory, merged across every namespace variant of its
/// `$FILE_NAME` the index held (long name, DOS 8.3 alias, etc).
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub mft_index: u32,
    pub parent_mft_index: u32,
    pub display_name: String,
    pub dos_name: Option<String>,
    pub names_by_namespace: HashMap<FileNamespace, String>,
    pub attributes: u32,
    pub timestamps: Timestamps,
    pub size: u64,
    pub deleted: bool,
}

impl DirectoryEntry {
    pub const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x1000_0000;

    pub fn is_directory(&self) -> bool {
        self.attributes & Self::FILE_ATTRIBUTE_DIRECTORY != 0
    }
}
