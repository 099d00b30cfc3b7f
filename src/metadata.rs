//! Per-snapshot metadata record, persisted as `meta.json` inside each
//! work directory.
//!
//! Written once, after the capacity check and directory setup and before
//! archiving starts; read back in full during restore so that capacity
//! checks and exclusions are symmetric with the original backup.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ExclusionSet;
use crate::error::TarsyncError;

pub const META_FILE_NAME: &str = "meta.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Projected uncompressed size at creation time, in bytes.
    pub size_bytes: u64,
    /// The exclusion list the backup actually used.
    pub exclude: ExclusionSet,
    /// Creation timestamp in the store's stamp format.
    pub created: String,
}

impl SnapshotMetadata {
    pub fn new(size_bytes: u64, exclude: ExclusionSet, created: String) -> Self {
        SnapshotMetadata {
            size_bytes,
            exclude,
            created,
        }
    }

    /// Persist into `work_dir`. The record is owned by the work directory
    /// and is only ever deleted by deleting that directory.
    pub fn store(&self, work_dir: &Path) -> Result<(), TarsyncError> {
        let path = work_dir.join(META_FILE_NAME);
        let body = serde_json::to_string_pretty(self).map_err(|source| {
            TarsyncError::Malformed {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, body + "\n").map_err(TarsyncError::io(path))
    }

    pub fn load(work_dir: &Path) -> Result<Self, TarsyncError> {
        let path = work_dir.join(META_FILE_NAME);
        let raw = fs::read_to_string(&path).map_err(TarsyncError::io(&path))?;
        serde_json::from_str(&raw).map_err(|source| TarsyncError::Malformed { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn round_trip_preserves_size_and_exclusions() {
        let dir = tempfile::tempdir().unwrap();
        let meta = SnapshotMetadata::new(
            86_400_000_000,
            ExclusionSet::new(vec![PathBuf::from("/proc"), PathBuf::from("/tmp")]),
            "2025_02_28_AM_04_36_28".to_string(),
        );
        meta.store(dir.path()).unwrap();

        let loaded = SnapshotMetadata::load(dir.path()).unwrap();
        assert_eq!(loaded, meta);
    }

    #[test]
    fn missing_record_is_an_io_error_with_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = SnapshotMetadata::load(dir.path()).unwrap_err();
        match err {
            TarsyncError::Io { path, .. } => {
                assert!(path.ends_with(META_FILE_NAME));
            }
            other => panic!("expected Io error, got {other}"),
        }
    }
}
