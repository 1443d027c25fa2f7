//! Cluster reader: the single point that decides whether a cluster's bytes
//! may be trusted, consulting the overlay before falling back to the image.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterReadError {
    #[error("cluster {0} is outside the image or not covered by a safe region")]
    NotReadable(u64),
}

/// Resolves reads of individual clusters, preferring overlay content over
/// the underlying (possibly partial) image.
pub trait ClusterReader {
    fn cluster_size(&self) -> u64;

    /// Reads one cluster. Returns `NotReadable` without touching the image
    /// when the cluster is out of range or not covered by the safety
    /// oracle and absent from the overlay.
    fn read_cluster(&self, cluster_id: u64) -> Result<Vec<u8>, ClusterReadError>;

    /// Convenience: true iff `read_cluster` would succeed without doing the
    /// actual read.
    fn is_cluster_safe(&self, cluster_id: u64) -> bool;
}
