//! NTFS on-disk structure decoding: boot sector, MFT records, data runs,
//! `$I30` directory indexes, and the volume context tying them together.

pub mod boot_sector;
pub mod cluster_reader;
pub mod data_run;
pub mod directory;
pub mod fixups;
pub mod mft;
pub mod safe_region;
pub mod volume;

pub use boot_sector::{parse_boot_sector, VolumeError, BOOT_SECTOR_SIZE};
pub use cluster_reader::VolumeClusterReader;
pub use fixups::{apply_fixups, FixupError};
pub use safe_region::SafeRegionIndex;
pub use volume::{VolumeContext, VolumeContextError};
