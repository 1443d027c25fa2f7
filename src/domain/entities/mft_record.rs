//! Decoded MFT record entities: timestamps, filenames, attributes.

use super::data_run::DataRun;

/// `$FILE_NAME` namespace byte. Ordering of the variants mirrors the
/// priority used to pick a canonical display name: WIN32, POSIX, DOS,
/// WIN32+DOS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileNamespace {
    Posix = 0,
    Win32 = 1,
    Dos = 2,
    Win32AndDos = 3,
}

impl FileNamespace {
    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Posix),
            1 => Some(Self::Win32),
            2 => Some(Self::Dos),
            3 => Some(Self::Win32AndDos),
            _ => None,
        }
    }

    /// Priority order used when choosing the canonical display name:
    /// WIN32 first, then POSIX, then DOS, then WIN32+DOS.
    pub fn priority(self) -> u8 {
        match self {
            Self::Win32 => 0,
            Self::Posix => 1,
            Self::Dos => 2,
            Self::Win32AndDos => 3,
        }
    }
}

/// Windows FILETIME: 100-ns intervals since 1601-01-01 UTC, as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileTime(pub u64);

impl FileTime {
    const EPOCH_DIFF_100NS: u64 = 116_444_736_000_000_000;

    /// Converts to Unix seconds since epoch. Timestamps before 1970 saturate
    /// to 0 rather than underflowing.
    pub fn to_unix_seconds(self) -> i64 {
        let signed = self.0 as i64 - Self::EPOCH_DIFF_100NS as i64;
        signed / 10_000_000
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Timestamps {
    pub created: FileTime,
    pub modified: FileTime,
    pub mft_modified: FileTime,
    pub accessed: FileTime,
}

#[derive(Debug, Clone)]
pub struct FileNameAttribute {
    pub parent_mft_index: u32,
    pub parent_sequence_number: u16,
    pub timestamps: Timestamps,
    pub allocated_size: u64,
    pub real_size: u64,
    pub attributes: u32,
    pub namespace: FileNamespace,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct StandardInformation {
    pub timestamps: Timestamps,
    pub attributes: u32,
}

/// A resident or nonresident `$BITMAP`. `valid` is false when any cluster
/// backing a nonresident bitmap could not be read safely, in which case
/// `data` is empty and must not be consulted.
#[derive(Debug, Clone, Default)]
pub struct Bitmap {
    pub data: Vec<u8>,
    pub valid: bool,
}

impl Bitmap {
    pub fn is_set(&self, index: u64) -> bool {
        if !self.valid || self.data.is_empty() {
            return false;
        }
        let byte_pos = (index / 8) as usize;
        let bit_pos = (index % 8) as u8;
        match self.data.get(byte_pos) {
            Some(byte) => byte & (1 << bit_pos) != 0,
            None => false,
        }
    }
}

/// Everything the decoder extracted from one MFT record.
#[derive(Debug, Clone)]
pub struct DecodedMftRecord {
    pub mft_index: u64,
    pub standard_information: Option<StandardInformation>,
    pub filenames: Vec<FileNameAttribute>,
    pub data_resident: Option<Vec<u8>>,
    pub data_run: Option<DataRun>,
    pub data_compressed: bool,
    pub index_allocation_run: Option<DataRun>,
    pub bitmap: Option<Bitmap>,
    pub is_directory: bool,
}

impl DecodedMftRecord {
    /// Picks the canonical filename per namespace priority order (WIN32 >
    /// POSIX > DOS > WIN32+DOS). Returns `None` if no `$FILE_NAME` attribute
    /// was present.
    pub fn canonical_filename(&self) -> Option<&FileNameAttribute> {
        self.filenames
            .iter()
            .min_by_key(|f| f.namespace.priority())
    }
}
