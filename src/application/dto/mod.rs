//! Data Transfer Objects

mod restore_report;
mod volume_info;

pub use restore_report::RestoreReport;
pub use volume_info::VolumeInfo;
