//! Overlay store trait: a cluster-addressed sidecar for recovered data.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("a previous save did not finish: {0} exists alongside the index; resolve manually")]
    NeedsManualRecovery(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("cluster {0} is not present in the overlay")]
    NotPresent(u64),

    #[error("overlay payload is not a whole number of clusters: {0} bytes / {1} cluster size")]
    MisalignedPayload(u64, u64),
}

/// Cluster-addressed store of clusters recovered directly from the source
/// device, layered on top of a partial image.
pub trait OverlayStore: Send + Sync {
    /// Returns the bytes previously stored for `cluster_id`, if any.
    fn get(&self, cluster_id: u64) -> Option<Vec<u8>>;

    /// True if this cluster has been recovered into the overlay.
    fn has(&self, cluster_id: u64) -> bool;

    /// Stores (or overwrites) one cluster's bytes. `bytes.len()` must equal
    /// the overlay's cluster size.
    fn put(&mut self, cluster_id: u64, bytes: &[u8]) -> Result<(), OverlayError>;

    /// Rewrites the on-disk index atomically (see the crash-safe protocol
    /// in the module docs of the concrete implementation).
    fn save(&mut self) -> Result<(), OverlayError>;

    /// Number of clusters currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
