//! `restore` use case: depth-first walk rooted at an MFT index, extracting
//! every live file under it to disk and recreating the directory tree.

use crate::application::dto::RestoreReport;
use crate::domain::entities::DirectoryEntry;
use crate::domain::services::{DirectoryDecoder, IndexDecodeError, MftDecodeError};
use crate::infrastructure::ntfs::VolumeContext;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RestoreError {
    #[error(transparent)]
    Index(#[from] IndexDecodeError),

    #[error(transparent)]
    Mft(#[from] MftDecodeError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct RestoreUseCase;

impl RestoreUseCase {
    /// Walks from `root_mft_index`, recreating the directory tree under
    /// `output_dir`. Individual unreadable records or directories are
    /// logged and skipped rather than aborting the whole restore.
    pub fn execute(
        volume: &VolumeContext,
        root_mft_index: u64,
        output_dir: &Path,
        mut on_file_written: Option<&mut dyn FnMut(u64)>,
    ) -> Result<RestoreReport, RestoreError> {
        let mut report = RestoreReport::default();
        Self::create_dir(output_dir)?;
        Self::walk(volume, root_mft_index, output_dir, &mut report, &mut on_file_written);
        report.bad_clusters = volume.bad_cluster_report();
        Ok(report)
    }

    fn walk(
        volume: &VolumeContext,
        dir_mft_index: u64,
        output_dir: &Path,
        report: &mut RestoreReport,
        on_file_written: &mut Option<&mut dyn FnMut(u64)>,
    ) {
        let children = match volume.list_children(dir_mft_index) {
            Ok(children) => children,
            Err(err) => {
                log::warn!("directory {dir_mft_index} could not be listed: {err}");
                return;
            }
        };

        for entry in children {
            if entry.deleted {
                continue;
            }

            let name = sanitize_name(&entry.display_name);

            if entry.is_directory() {
                let child_dir = output_dir.join(&name);
                if let Err(err) = Self::create_dir(&child_dir) {
                    log::warn!("could not create directory {}: {err}", child_dir.display());
                    continue;
                }
                report.directories_created += 1;
                Self::walk(volume, entry.mft_index as u64, &child_dir, report, on_file_written);
            } else {
                match Self::restore_file(volume, &entry, output_dir, &name) {
                    Ok(()) => {
                        report.files_written += 1;
                        if let Some(callback) = on_file_written.as_mut() {
                            callback(report.files_written);
                        }
                    }
                    Err(err) => log::warn!("could not restore {}: {err}", entry.display_name),
                }
            }
        }
    }

    fn restore_file(
        volume: &VolumeContext,
        entry: &DirectoryEntry,
        output_dir: &Path,
        name: &str,
    ) -> Result<(), RestoreError> {
        let record = volume.decode_mft_record(entry.mft_index as u64)?;
        if record.data_compressed {
            log::warn!("{}: compressed $DATA stream is out of scope, skipping content", entry.display_name);
        }
        let bytes = volume.extract_data(&record, entry.mft_index as u64);

        let path = output_dir.join(name);
        std::fs::write(&path, &bytes).map_err(|source| RestoreError::Io {
            path: path.clone(),
            source,
        })?;

        let mtime = filetime::FileTime::from_unix_time(entry.timestamps.modified.to_unix_seconds(), 0);
        let atime = filetime::FileTime::from_unix_time(entry.timestamps.accessed.to_unix_seconds(), 0);
        if let Err(err) = filetime::set_file_times(&path, atime, mtime) {
            log::warn!("could not set timestamps on {}: {err}", path.display());
        }

        Ok(())
    }

    fn create_dir(path: &Path) -> Result<(), RestoreError> {
        std::fs::create_dir_all(path).map_err(|source| RestoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Replaces path separators a corrupt or adversarial directory entry might
/// carry, and rejects `.`/`..` outright, so a restore can never write
/// outside `output_dir`.
fn sanitize_name(name: &str) -> String {
    if name.is_empty() || name == "." || name == ".." {
        return "_".to_string();
    }
    name.chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}
