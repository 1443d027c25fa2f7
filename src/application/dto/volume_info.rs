//! Summary of a volume's geometry, for the `info` subcommand.

#[derive(Debug, Clone)]
pub struct VolumeInfo {
    pub image_path: String,
    pub partition_offset: u64,
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub cluster_size: u64,
    pub mft_record_size: u64,
    pub mft_cluster: u64,
    pub mft_mirror_cluster: u64,
    pub volume_size: u64,
}
