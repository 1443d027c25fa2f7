//! Domain services
//!
//! Core business logic services that operate on domain entities: the
//! read-safety oracle, cluster reader, MFT/directory decoders, and the
//! bad-cluster tracker.

mod bad_cluster_tracker;
mod cluster_reader;
mod directory_decoder;
mod mft_decoder;
mod safe_region;

pub use bad_cluster_tracker::BadClusterTracker;
pub use cluster_reader::{ClusterReadError, ClusterReader};
pub use directory_decoder::{DirectoryDecoder, IndexDecodeError};
pub use mft_decoder::{MftDecodeError, MftDecoder};
pub use safe_region::SafeRegionOracle;
