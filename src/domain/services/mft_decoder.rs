//! MFT record decoding: errors and the abstraction the directory decoder
//! and walker drive.

use crate::domain::entities::DecodedMftRecord;
use crate::domain::services::cluster_reader::ClusterReadError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MftDecodeError {
    #[error("record signature fix-up mismatch in sector {sector}")]
    FixupMismatch { sector: usize },

    #[error("fix-up array too small: {fixup_count} entries for {sectors_per_record} sectors")]
    FixupTruncated {
        fixup_count: usize,
        sectors_per_record: usize,
    },

    #[error("attribute {0:#x} has an encoded run-length field wider than 8 bytes")]
    RunFieldTooLarge(u32),

    #[error("record has more than 20 attributes, aborting to avoid a runaway walk")]
    AttributeRunaway,

    #[error("record {0} does not start with the MFT record signature")]
    BadSignature(u64),

    #[error("MFT index {0} falls outside every extent of the $MFT data run")]
    RecordOutOfRange(u64),

    #[error(transparent)]
    Read(#[from] ClusterReadError),
}

/// Decodes individual MFT records. The volume context drives this once per
/// `mft_index` it needs; record-local scratch allocations live only for the
/// duration of one `decode` call.
pub trait MftDecoder {
    fn decode(&self, mft_index: u64) -> Result<DecodedMftRecord, MftDecodeError>;
}
