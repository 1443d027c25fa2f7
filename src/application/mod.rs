//! Application layer
//!
//! Use cases that orchestrate the domain/infrastructure NTFS decoder into
//! the operations the CLI exposes: volume info, directory listing,
//! restore, bad-cluster reporting, and direct cluster recovery.

pub mod dto;
mod bad_clusters;
mod list_directory;
mod recover_cluster;
mod restore;
mod volume_info;

pub use bad_clusters::BadClustersUseCase;
pub use list_directory::ListDirectoryUseCase;
pub use recover_cluster::{RecoverClusterUseCase, RecoverError};
pub use restore::{RestoreError, RestoreUseCase};
pub use volume_info::VolumeInfoUseCase;
