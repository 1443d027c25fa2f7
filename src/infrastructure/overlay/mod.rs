//! Cluster-addressed overlay store with a crash-safe index rewrite
//! protocol.
//!
//! Three files make up one overlay: `<base>.dat` (raw concatenation of
//! recovered cluster payloads), `<base>.idx` (sorted 16-byte
//! `(cluster_id, payload_offset)` records, both little-endian u64), and a
//! transient `<base>.~dx` that exists only mid-rewrite. If `<base>.~dx` is
//! found at open time, a previous `save` did not finish and the store
//! refuses to open rather than guess which index is authoritative.

mod null;

pub use null::NullOverlayStore;

use crate::domain::repositories::{OverlayError, OverlayStore};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const RECORD_SIZE: u64 = 16;

pub struct OverlayStoreFile {
    data_path: PathBuf,
    index_path: PathBuf,
    backup_path: PathBuf,
    data: Mutex<File>,
    cluster_size: u64,
    data_len: u64,
    index: BTreeMap<u64, u64>,
}

impl OverlayStoreFile {
    pub fn open(base: &Path, cluster_size: u64) -> Result<Self, OverlayError> {
        let data_path = with_extension(base, "dat");
        let index_path = with_extension(base, "idx");
        let backup_path = with_extension(base, "~dx");

        if backup_path.exists() {
            return Err(OverlayError::NeedsManualRecovery(
                backup_path.display().to_string(),
            ));
        }

        let data = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&data_path)?;
        let data_len = data.metadata()?.len();
        if data_len % cluster_size != 0 {
            return Err(OverlayError::MisalignedPayload(data_len, cluster_size));
        }

        let mut index_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&index_path)?;
        let index = read_index(&mut index_file)?;

        Ok(Self {
            data_path,
            index_path,
            backup_path,
            data: Mutex::new(data),
            cluster_size,
            data_len,
            index,
        })
    }
}

fn with_extension(base: &Path, ext: &str) -> PathBuf {
    let mut os = base.as_os_str().to_owned();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}

fn read_index(file: &mut File) -> Result<BTreeMap<u64, u64>, OverlayError> {
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let mut map = BTreeMap::new();
    for chunk in bytes.chunks_exact(RECORD_SIZE as usize) {
        let cluster_id = u64::from_le_bytes(chunk[0..8].try_into().unwrap());
        let offset = u64::from_le_bytes(chunk[8..16].try_into().unwrap());
        map.insert(cluster_id, offset);
    }
    Ok(map)
}

impl OverlayStore for OverlayStoreFile {
    fn get(&self, cluster_id: u64) -> Option<Vec<u8>> {
        let offset = *self.index.get(&cluster_id)?;
        let mut data = self.data.lock();
        data.seek(SeekFrom::Start(offset)).ok()?;
        let mut buf = vec![0u8; self.cluster_size as usize];
        data.read_exact(&mut buf).ok()?;
        Some(buf)
    }

    fn has(&self, cluster_id: u64) -> bool {
        self.index.contains_key(&cluster_id)
    }

    fn put(&mut self, cluster_id: u64, bytes: &[u8]) -> Result<(), OverlayError> {
        if bytes.len() as u64 != self.cluster_size {
            return Err(OverlayError::MisalignedPayload(
                bytes.len() as u64,
                self.cluster_size,
            ));
        }

        let mut data = self.data.lock();
        let offset = if let Some(&existing) = self.index.get(&cluster_id) {
            existing
        } else {
            self.data_len
        };

        data.seek(SeekFrom::Start(offset))?;
        data.write_all(bytes)?;
        data.flush()?;
        drop(data);

        if !self.index.contains_key(&cluster_id) {
            self.data_len += self.cluster_size;
        }
        self.index.insert(cluster_id, offset);
        Ok(())
    }

    fn save(&mut self) -> Result<(), OverlayError> {
        self.save_with(write_index)
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}

impl OverlayStoreFile {
    /// Runs the rename-rewrite-restore protocol, delegating the actual
    /// index rewrite to `write`. Split out so tests can substitute a
    /// writer that fails partway through without touching the crash-safety
    /// logic itself.
    fn save_with(
        &mut self,
        write: impl FnOnce(&Path, &BTreeMap<u64, u64>) -> Result<(), OverlayError>,
    ) -> Result<(), OverlayError> {
        let needs_backup = self.index_path.exists() && self.index_path.metadata()?.len() > 0;
        if needs_backup {
            std::fs::rename(&self.index_path, &self.backup_path)?;
        }

        let result = write(&self.index_path, &self.index);

        match result {
            Ok(()) => {
                if self.backup_path.exists() {
                    std::fs::remove_file(&self.backup_path)?;
                }
                Ok(())
            }
            Err(err) => {
                let _ = std::fs::remove_file(&self.index_path);
                if needs_backup {
                    std::fs::rename(&self.backup_path, &self.index_path)?;
                }
                Err(err)
            }
        }
    }

    #[cfg(test)]
    fn save_failing_after(&mut self, records_before_failure: usize) -> Result<(), OverlayError> {
        self.save_with(move |path, index| write_index_failing(path, index, records_before_failure))
    }
}

fn write_index(path: &Path, index: &BTreeMap<u64, u64>) -> Result<(), OverlayError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    for (&cluster_id, &offset) in index {
        file.write_all(&cluster_id.to_le_bytes())?;
        file.write_all(&offset.to_le_bytes())?;
    }
    file.flush()?;
    Ok(())
}

/// Like [`write_index`], but returns an error after writing
/// `records_before_failure` whole records, leaving the file truncated
/// mid-rewrite. Used to exercise the crash-safety restore path without a
/// real crash.
#[cfg(test)]
fn write_index_failing(
    path: &Path,
    index: &BTreeMap<u64, u64>,
    records_before_failure: usize,
) -> Result<(), OverlayError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    for (i, (&cluster_id, &offset)) in index.iter().enumerate() {
        if i == records_before_failure {
            return Err(OverlayError::IoError(std::io::Error::other(
                "injected write failure",
            )));
        }
        file.write_all(&cluster_id.to_le_bytes())?;
        file.write_all(&offset.to_le_bytes())?;
    }
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn put_then_get_roundtrips() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("overlay");
        let mut store = OverlayStoreFile::open(&base, 4).unwrap();

        store.put(10, b"abcd").unwrap();
        assert_eq!(store.get(10), Some(b"abcd".to_vec()));
        assert!(store.has(10));
        assert!(!store.has(11));
    }

    #[test]
    fn overwrite_reuses_offset_without_growing_file() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("overlay");
        let mut store = OverlayStoreFile::open(&base, 4).unwrap();

        store.put(10, b"aaaa").unwrap();
        store.put(12, b"bbbb").unwrap();
        store.put(10, b"cccc").unwrap();

        assert_eq!(store.get(10), Some(b"cccc".to_vec()));
        assert_eq!(store.len(), 2);
        assert_eq!(std::fs::metadata(&store.data_path).unwrap().len(), 8);
    }

    #[test]
    fn save_then_reopen_preserves_index() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("overlay");
        {
            let mut store = OverlayStoreFile::open(&base, 4).unwrap();
            store.put(5, b"xxxx").unwrap();
            store.put(1, b"yyyy").unwrap();
            store.save().unwrap();
            assert!(!store.backup_path.exists());
        }

        let reopened = OverlayStoreFile::open(&base, 4).unwrap();
        assert_eq!(reopened.get(5), Some(b"xxxx".to_vec()));
        assert_eq!(reopened.get(1), Some(b"yyyy".to_vec()));
    }

    #[test]
    fn open_refuses_when_backup_present() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("overlay");
        std::fs::write(with_extension(&base, "~dx"), b"stale").unwrap();

        let result = OverlayStoreFile::open(&base, 4);
        assert!(matches!(result, Err(OverlayError::NeedsManualRecovery(_))));
    }

    #[test]
    fn crash_mid_save_restores_previous_index() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("overlay");
        let mut store = OverlayStoreFile::open(&base, 4).unwrap();

        store.put(1, b"aaaa").unwrap();
        store.put(2, b"bbbb").unwrap();
        store.put(3, b"cccc").unwrap();
        store.save().unwrap();
        let pre_save_bytes = std::fs::read(&store.index_path).unwrap();
        assert!(!pre_save_bytes.is_empty());

        store.put(4, b"dddd").unwrap();
        let err = store.save_failing_after(2).unwrap_err();
        assert!(matches!(err, OverlayError::IoError(_)));

        let post_failure_bytes = std::fs::read(&store.index_path).unwrap();
        assert_eq!(post_failure_bytes, pre_save_bytes);
        assert!(!store.backup_path.exists());
    }

    proptest::proptest! {
        #[test]
        fn put_get_law_holds_for_arbitrary_put_sequences(
            writes in proptest::collection::vec(
                (0u64..20, proptest::array::uniform8(proptest::prelude::any::<u8>())),
                1..30,
            ),
        ) {
            let dir = tempdir().unwrap();
            let base = dir.path().join("overlay");
            let mut store = OverlayStoreFile::open(&base, 8).unwrap();

            let mut last_write = std::collections::HashMap::new();
            for (cluster_id, bytes) in &writes {
                store.put(*cluster_id, bytes).unwrap();
                last_write.insert(*cluster_id, *bytes);
            }

            for (cluster_id, bytes) in &last_write {
                proptest::prop_assert_eq!(store.get(*cluster_id), Some(bytes.to_vec()));
            }
            proptest::prop_assert_eq!(store.len(), last_write.len());

            store.save().unwrap();
            let distinct_clusters = last_write.len() as u64;
            proptest::prop_assert_eq!(
                std::fs::metadata(&store.data_path).unwrap().len(),
                distinct_clusters * 8
            );
        }
    }
}
