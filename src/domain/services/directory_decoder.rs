//! `$I30` directory index decoding.

use crate::domain::entities::DirectoryEntry;
use crate::domain::services::mft_decoder::MftDecodeError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexDecodeError {
    #[error("INDX block at cluster {0} is missing the 'INDX' magic")]
    BadMagic(u64),

    #[error("directory index entry is truncated or runs past its INDX block")]
    IndexCorrupt,

    #[error(transparent)]
    Mft(#[from] MftDecodeError),
}

/// Materializes a directory's children from its `$I30` index.
pub trait DirectoryDecoder {
    fn list_children(&self, dir_mft_index: u64) -> Result<Vec<DirectoryEntry>, IndexDecodeError>;
}
