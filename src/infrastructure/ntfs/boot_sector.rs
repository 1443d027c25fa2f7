//! NTFS boot sector (BIOS Parameter Block) parsing.

use crate::domain::entities::VolumeGeometry;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use thiserror::Error;

pub const BOOT_SECTOR_OFFSET: u64 = 0;
pub const BOOT_SECTOR_SIZE: usize = 512;
const NTFS_OEM_ID: &[u8] = b"NTFS";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VolumeError {
    #[error("boot sector is shorter than {BOOT_SECTOR_SIZE} bytes")]
    Truncated,

    #[error("boot sector OEM id is not 'NTFS'")]
    NotNtfs,

    #[error("bytes-per-sector ({bytes_per_sector}) or sectors-per-cluster ({sectors_per_cluster}) is zero")]
    InvalidGeometry {
        bytes_per_sector: u16,
        sectors_per_cluster: u8,
    },

    #[error("MFT record size does not evenly divide the cluster size")]
    RecordSizeMismatch,
}

/// Parses the 512-byte NTFS boot sector into a [`VolumeGeometry`].
///
/// Field offsets (all little-endian): OEM id at +3 (4 bytes, "NTFS"; the
/// trailing 4 bytes of the 8-byte OEM field are not validated — they may
/// legally vary), bytes-per-sector u16 at +11, sectors-per-cluster u8 at
/// +13, total sectors u64 at +40, `$MFT` start cluster u64 at +48, `$MFT`
/// mirror start cluster u64 at +56, clusters-per-mft-record i8 at +64.
pub fn parse_boot_sector(bytes: &[u8]) -> Result<VolumeGeometry, VolumeError> {
    if bytes.len() < BOOT_SECTOR_SIZE {
        return Err(VolumeError::Truncated);
    }

    if &bytes[3..7] != NTFS_OEM_ID {
        return Err(VolumeError::NotNtfs);
    }

    let mut cursor = Cursor::new(bytes);

    cursor.set_position(11);
    let bytes_per_sector = cursor.read_u16::<LittleEndian>().map_err(|_| VolumeError::Truncated)?;

    cursor.set_position(13);
    let sectors_per_cluster = cursor.read_u8().map_err(|_| VolumeError::Truncated)?;

    if bytes_per_sector == 0 || sectors_per_cluster == 0 {
        return Err(VolumeError::InvalidGeometry {
            bytes_per_sector,
            sectors_per_cluster,
        });
    }

    cursor.set_position(40);
    let total_sectors = cursor.read_u64::<LittleEndian>().map_err(|_| VolumeError::Truncated)?;

    cursor.set_position(48);
    let mft_cluster = cursor.read_u64::<LittleEndian>().map_err(|_| VolumeError::Truncated)?;

    cursor.set_position(56);
    let mft_mirror_cluster = cursor.read_u64::<LittleEndian>().map_err(|_| VolumeError::Truncated)?;

    cursor.set_position(64);
    let clusters_per_mft_record_raw = cursor.read_i8().map_err(|_| VolumeError::Truncated)?;

    let geometry = VolumeGeometry {
        bytes_per_sector,
        sectors_per_cluster,
        mft_cluster,
        mft_mirror_cluster,
        clusters_per_mft_record_raw,
        total_sectors,
    };

    if geometry.mft_record_size() > geometry.cluster_size()
        || geometry.cluster_size() % geometry.mft_record_size() != 0
    {
        return Err(VolumeError::RecordSizeMismatch);
    }

    Ok(geometry)
}
