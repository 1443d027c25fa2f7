//! No-op overlay used when a walk is run without `--overlay`: every lookup
//! misses, every `put` is silently dropped. Keeps `VolumeClusterReader`
//! from special-casing "no overlay configured".

use crate::domain::repositories::{OverlayError, OverlayStore};

#[derive(Debug, Default)]
pub struct NullOverlayStore;

impl OverlayStore for NullOverlayStore {
    fn get(&self, _cluster_id: u64) -> Option<Vec<u8>> {
        None
    }

    fn has(&self, _cluster_id: u64) -> bool {
        false
    }

    fn put(&mut self, _cluster_id: u64, _bytes: &[u8]) -> Result<(), OverlayError> {
        Ok(())
    }

    fn save(&mut self) -> Result<(), OverlayError> {
        Ok(())
    }

    fn len(&self) -> usize {
        0
    }
}
