//! Outcome of a `restore` or `bad-clusters` walk.

use crate::domain::entities::ByteRange;

#[derive(Debug, Clone, Default)]
pub struct RestoreReport {
    pub files_written: u64,
    pub directories_created: u64,
    pub bad_clusters: Vec<ByteRange>,
}

impl RestoreReport {
    pub fn summary(&self) -> String {
        format!(
            "{} file(s), {} directory(ies), {} bad cluster range(s)",
            self.files_written,
            self.directories_created,
            self.bad_clusters.len()
        )
    }
}
