//! Domain entities
//!
//! Core business objects that represent the fundamental concepts of the
//! NTFS forensic reading domain: volume geometry, data runs, MFT records,
//! directory entries, and bad-cluster reports.

mod bad_cluster;
mod data_run;
mod directory_entry;
mod mft_record;
mod volume;

pub use bad_cluster::ByteRange;
pub use data_run::{DataRun, DataRunExtent};
pub use directory_entry::DirectoryEntry;
pub use mft_record::{
    Bitmap, DecodedMftRecord, FileNameAttribute, FileNamespace, FileTime, StandardInformation,
    Timestamps,
};
pub use volume::VolumeGeometry;
