//! Volume context: opens an NTFS image, decodes its boot sector and the
//! `$MFT`'s own data run, and owns everything a caller needs to decode
//! further records and directories (spec §4.9).

use super::boot_sector::{parse_boot_sector, VolumeError, BOOT_SECTOR_SIZE};
use super::cluster_reader::VolumeClusterReader;
use super::{directory, mft};
use crate::domain::entities::{ByteRange, DataRun, DecodedMftRecord, VolumeGeometry};
use crate::domain::repositories::{BlockDeviceError, BlockDeviceReader, OverlayError, OverlayStore};
use crate::domain::services::{
    ClusterReadError, ClusterReader, DirectoryDecoder, IndexDecodeError, MftDecodeError, MftDecoder,
    SafeRegionOracle,
};
use crate::infrastructure::overlay::{NullOverlayStore, OverlayStoreFile};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VolumeContextError {
    #[error(transparent)]
    Volume(#[from] VolumeError),

    #[error("failed to read the boot sector: {0}")]
    BootSectorRead(#[source] BlockDeviceError),

    #[error("$MFT record could not be decoded from the MFT mirror: {0}")]
    Mft(#[from] MftDecodeError),

    #[error("$MFT's own record has no nonresident $DATA attribute describing its data run")]
    MftMissingDataRun,

    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error("could not read MFT mirror cluster: {0}")]
    Cluster(#[from] ClusterReadError),
}

/// Owns the opened image, decoded volume geometry, the `$MFT`'s own data
/// run (read from the **mirror** copy — see spec §9), and the cluster
/// reader every higher-level operation is built on.
pub struct VolumeContext {
    geometry: VolumeGeometry,
    cluster_reader: VolumeClusterReader,
    mft_data_run: DataRun,
}

impl VolumeContext {
    /// Opens a volume: parses the boot sector, then decodes `$MFT`'s own
    /// record from the MFT mirror to recover its full data run. Opens
    /// without an overlay; attach one afterwards with [`Self::with_overlay`].
    pub fn open(
        image: Arc<dyn BlockDeviceReader>,
        partition_offset: u64,
        safe_regions: Arc<dyn SafeRegionOracle>,
    ) -> Result<Self, VolumeContextError> {
        let boot_sector = image
            .read_at(partition_offset, BOOT_SECTOR_SIZE)
            .map_err(VolumeContextError::BootSectorRead)?;
        let geometry = parse_boot_sector(&boot_sector)?;

        let cluster_reader = VolumeClusterReader::new(
            image,
            safe_regions,
            Box::new(NullOverlayStore),
            geometry.cluster_size(),
            partition_offset,
        );

        let mft_data_run = Self::decode_own_mft_record(&cluster_reader, &geometry)?;

        Ok(Self {
            geometry,
            cluster_reader,
            mft_data_run,
        })
    }

    /// Attaches a real overlay backed by `base.dat`/`base.idx`, replacing
    /// the `NullOverlayStore` opened by [`Self::open`].
    pub fn with_overlay(&self, base: &Path) -> Result<(), VolumeContextError> {
        let store = OverlayStoreFile::open(base, self.geometry.cluster_size())?;
        self.cluster_reader.replace_overlay(Box::new(store));
        Ok(())
    }

    /// Decodes MFT record 0 (the `$MFT` itself) directly from the mirror
    /// cluster, bypassing `mft_index_to_location` since that mapping is
    /// only meaningful once the data run it depends on is known.
    fn decode_own_mft_record(
        cluster_reader: &VolumeClusterReader,
        geometry: &VolumeGeometry,
    ) -> Result<DataRun, VolumeContextError> {
        let record_size = geometry.mft_record_size() as usize;
        let cluster_size = geometry.cluster_size() as usize;
        let clusters_needed = record_size.div_ceil(cluster_size).max(1);

        let mut raw = Vec::with_capacity(clusters_needed * cluster_size);
        for i in 0..clusters_needed as u64 {
            let bytes = cluster_reader.read_cluster(geometry.mft_mirror_cluster + i)?;
            raw.extend_from_slice(&bytes);
        }
        raw.truncate(record_size);

        let record = mft::decode_record(
            &mut raw,
            0,
            geometry,
            |cluster| cluster_reader.read_cluster(cluster),
            |cluster| cluster_reader.note_bad_cluster(cluster, 0),
        )?;

        record.data_run.ok_or(VolumeContextError::MftMissingDataRun)
    }

    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    pub fn cluster_reader(&self) -> &VolumeClusterReader {
        &self.cluster_reader
    }

    /// Persists any clusters recovered into the overlay during this session.
    pub fn save_overlay(&self) -> Result<(), OverlayError> {
        self.cluster_reader.save_overlay()
    }

    /// Run-length-encoded byte ranges covering every cluster that turned
    /// out to be unreadable during this session (spec §4.6).
    pub fn bad_cluster_report(&self) -> Vec<ByteRange> {
        self.cluster_reader
            .bad_clusters()
            .byte_ranges(self.cluster_reader.partition_offset(), self.geometry.cluster_size())
    }

    /// Maps a linear `mft_index` to the `(cluster_id, offset_in_cluster)`
    /// it lives at, per spec §4.4's run-walk formula.
    fn locate_record(&self, mft_index: u64) -> Option<(u64, usize)> {
        locate_record_in_run(
            &self.mft_data_run,
            self.geometry.records_per_cluster(),
            self.geometry.mft_record_size() as usize,
            mft_index,
        )
    }

    /// Inverse of [`Self::locate_record`]: recovers the linear `mft_index`
    /// of the record at `slot` (`0..records_per_cluster()`) within
    /// `cluster_id`, if that cluster is part of the `$MFT`'s own
    /// (non-sparse) data run.
    pub fn mft_index_at(&self, cluster_id: u64, slot: u64) -> Option<u64> {
        let records_per_cluster = self.geometry.records_per_cluster();
        if slot >= records_per_cluster {
            return None;
        }
        let base = mft_index_of_cluster_in_run(&self.mft_data_run, records_per_cluster, cluster_id)?;
        Some(base + slot)
    }

    /// Total number of record slots described by the `$MFT`'s own data run
    /// (including any still-unallocated trailing slots within a cluster).
    pub fn mft_record_count(&self) -> u64 {
        let records_per_cluster = self.geometry.records_per_cluster();
        self.mft_data_run
            .extents
            .iter()
            .filter(|e| !e.sparse)
            .map(|e| e.count * records_per_cluster)
            .sum()
    }

    /// Iterates every record slot in the `$MFT`, in linear index order. Used
    /// by callers that need a full-volume pass (e.g. a future salvage mode)
    /// rather than a single directory-rooted walk.
    pub fn iter_mft_records(&self) -> impl Iterator<Item = Result<DecodedMftRecord, MftDecodeError>> + '_ {
        (0..self.mft_record_count()).map(move |index| self.decode_mft_record(index))
    }

    /// Decodes one MFT record by linear index.
    pub fn decode_mft_record(&self, mft_index: u64) -> Result<DecodedMftRecord, MftDecodeError> {
        let (cluster_id, offset) = self
            .locate_record(mft_index)
            .ok_or(MftDecodeError::RecordOutOfRange(mft_index))?;

        let record_size = self.geometry.mft_record_size() as usize;
        let cluster_bytes = self.cluster_reader.read_cluster(cluster_id)?;
        let mut buf = cluster_bytes
            .get(offset..offset + record_size)
            .ok_or(MftDecodeError::RecordOutOfRange(mft_index))?
            .to_vec();

        mft::decode_record(
            &mut buf,
            mft_index,
            &self.geometry,
            |cluster| self.cluster_reader.read_cluster(cluster),
            |cluster| self.cluster_reader.note_bad_cluster(cluster, mft_index),
        )
    }

    /// Extracts a record's content (resident bytes, or clusters from its
    /// nonresident `$DATA` run). Unreadable clusters are zero-filled and
    /// logged against `owner_mft_index` rather than surfacing stale image
    /// bytes (spec §4.7's zero-fill design choice).
    pub fn extract_data(&self, record: &DecodedMftRecord, owner_mft_index: u64) -> Vec<u8> {
        if let Some(resident) = &record.data_resident {
            return resident.clone();
        }

        let Some(run) = &record.data_run else {
            return Vec::new();
        };

        let cluster_size = self.geometry.cluster_size() as usize;
        let mut out = Vec::with_capacity(run.byte_size as usize);

        for cluster_opt in run.iter_clusters() {
            if out.len() as u64 >= run.byte_size {
                break;
            }
            match cluster_opt {
                None => out.extend(std::iter::repeat_n(0u8, cluster_size)),
                Some(cluster_id) => match self.cluster_reader.read_cluster(cluster_id) {
                    Ok(bytes) => out.extend_from_slice(&bytes),
                    Err(_) => {
                        self.cluster_reader.note_bad_cluster(cluster_id, owner_mft_index);
                        out.extend(std::iter::repeat_n(0u8, cluster_size));
                    }
                },
            }
        }

        out.truncate(run.byte_size as usize);
        out
    }
}

fn locate_record_in_run(
    mft_data_run: &DataRun,
    records_per_cluster: u64,
    record_size: usize,
    mft_index: u64,
) -> Option<(u64, usize)> {
    let mut base = 0u64;
    for extent in &mft_data_run.extents {
        if extent.sparse {
            continue;
        }
        let capacity = extent.count * records_per_cluster;
        if mft_index < base + capacity {
            let local = mft_index - base;
            let cluster = extent.cluster + local / records_per_cluster;
            let offset = (local % records_per_cluster) as usize * record_size;
            return Some((cluster, offset));
        }
        base += capacity;
    }
    None
}

/// Inverse of the non-sparse half of [`locate_record_in_run`]: the linear
/// `mft_index` of record slot `0` within `cluster_id`.
fn mft_index_of_cluster_in_run(
    mft_data_run: &DataRun,
    records_per_cluster: u64,
    cluster_id: u64,
) -> Option<u64> {
    let mut base = 0u64;
    for extent in &mft_data_run.extents {
        if extent.sparse {
            continue;
        }
        if cluster_id >= extent.cluster && cluster_id < extent.cluster + extent.count {
            let local_cluster = cluster_id - extent.cluster;
            return Some(base + local_cluster * records_per_cluster);
        }
        base += extent.count * records_per_cluster;
    }
    None
}

impl MftDecoder for VolumeContext {
    fn decode(&self, mft_index: u64) -> Result<DecodedMftRecord, MftDecodeError> {
        self.decode_mft_record(mft_index)
    }
}

impl DirectoryDecoder for VolumeContext {
    fn list_children(
        &self,
        dir_mft_index: u64,
    ) -> Result<Vec<crate::domain::entities::DirectoryEntry>, IndexDecodeError> {
        let record = self.decode_mft_record(dir_mft_index)?;
        let bitmap = record.bitmap.clone().unwrap_or_default();

        let Some(index_run) = record.index_allocation_run else {
            return Ok(Vec::new());
        };

        let mut merged = std::collections::HashMap::new();
        let mut position = 0u64;
        let sector_size = self.geometry.bytes_per_sector as usize;

        for cluster_opt in index_run.iter_clusters() {
            let Some(cluster_id) = cluster_opt else {
                continue;
            };

            let mut buf = match self.cluster_reader.read_cluster(cluster_id) {
                Ok(bytes) => bytes,
                Err(_) => {
                    self.cluster_reader.note_bad_cluster(cluster_id, dir_mft_index);
                    continue;
                }
            };

            if let Err(err) = directory::decode_indx_block(
                &mut buf,
                cluster_id,
                sector_size,
                &mut position,
                &bitmap,
                &mut merged,
            ) {
                log::warn!("directory {dir_mft_index}: INDX block at cluster {cluster_id} abandoned: {err}");
            }
        }

        let mut entries: Vec<_> = merged.into_values().collect();
        entries.sort_unstable_by_key(|e| e.mft_index);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::DataRunExtent;

    fn two_extent_run() -> DataRun {
        DataRun {
            extents: vec![
                DataRunExtent { cluster: 100, count: 3, sparse: false },
                DataRunExtent { cluster: 0, count: 2, sparse: true },
                DataRunExtent { cluster: 200, count: 4, sparse: false },
            ],
            byte_size: 0,
        }
    }

    #[test]
    fn cluster_and_slot_round_trip_through_locate_record() {
        let run = two_extent_run();
        let records_per_cluster = 4u64;
        let record_size = 1024usize;

        for mft_index in 0..(3 + 4) * records_per_cluster {
            let (cluster, offset) =
                locate_record_in_run(&run, records_per_cluster, record_size, mft_index).unwrap();
            let slot = (offset / record_size) as u64;
            let recovered = mft_index_of_cluster_in_run(&run, records_per_cluster, cluster).unwrap() + slot;
            assert_eq!(recovered, mft_index);
        }
    }

    #[test]
    fn mft_index_of_cluster_skips_sparse_extents() {
        let run = two_extent_run();
        // The second non-sparse extent starts right after the first's
        // capacity (3 * 4 = 12), since the sparse extent in between
        // contributes no linear index space.
        assert_eq!(mft_index_of_cluster_in_run(&run, 4, 200), Some(12));
        assert_eq!(mft_index_of_cluster_in_run(&run, 4, 201), Some(16));
        assert_eq!(mft_index_of_cluster_in_run(&run, 4, 0), None);
    }
}
