//! Capacity planner: projects how many bytes an operation will consume
//! and verifies a destination can hold it, before anything destructive
//! or space-consuming runs.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::common::format_size;
use crate::config::ExclusionSet;
use crate::device::{self, DeviceInfo};
use crate::error::TarsyncError;

/// Project the size of backing up `device`, subtracting every exclusion
/// that actually occupies space on that device.
///
/// Per exclusion, in list order:
/// - a path that does not exist is skipped;
/// - a path on a different device is skipped (it cannot reduce what the
///   backup reads from *this* device);
/// - otherwise its single-filesystem disk usage is subtracted.
///
/// If accounting drives the total negative the result clamps to zero and
/// the anomaly is logged as a warning; downstream capacity checks depend
/// on the sign, never on the raw deficit.
pub fn project_operation_size(device: &DeviceInfo, exclusions: &ExclusionSet) -> u64 {
    let mut remaining = device.used_bytes as i128;

    for path in exclusions.iter() {
        if fs::symlink_metadata(path).is_err() {
            info!(path = %path.display(), "exclusion does not exist, skipping");
            continue;
        }
        match device::device_id_of(path) {
            Ok(id) if id != device.device_id => {
                info!(path = %path.display(), "exclusion is not on the backup device, skipping");
                continue;
            }
            Err(source) => {
                info!(path = %path.display(), error = %source, "exclusion is not statable, skipping");
                continue;
            }
            Ok(_) => {}
        }

        let excluded = directory_size(path, device.device_id);
        if excluded == 0 {
            info!(path = %path.display(), "exclusion occupies no disk space");
            continue;
        }
        remaining -= excluded as i128;
        info!(
            path = %path.display(),
            size = %format_size(excluded),
            "subtracting exclusion from projected size"
        );
    }

    if remaining < 0 {
        warn!(
            deficit = %format_size((-remaining) as u64),
            "exclusion accounting exceeded total usage; clamping projected size to zero"
        );
        return 0;
    }

    info!(
        used = %format_size(device.used_bytes),
        projected = %format_size(remaining as u64),
        mount = %device.mount_point.display(),
        "projected operation size"
    );
    remaining as u64
}

/// Fail when the destination cannot hold `required_bytes`. The boundary
/// is inclusive: exactly enough space passes.
pub fn ensure_capacity(destination: &DeviceInfo, required_bytes: u64) -> Result<(), TarsyncError> {
    if destination.available_bytes < required_bytes {
        return Err(TarsyncError::InsufficientCapacity {
            required: required_bytes,
            device: destination.clone(),
        });
    }
    Ok(())
}

/// On-disk usage of `path` in bytes, restricted to `device_id`.
///
/// Equivalent to `du -s --one-file-system`: subtrees on foreign devices
/// are pruned so mounted sub-filesystems are never counted, and sizes are
/// allocated blocks, not apparent lengths. Unreadable entries are skipped.
pub fn directory_size(path: &Path, device_id: u64) -> u64 {
    let mut total = 0u64;
    let walker = WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_entry(move |entry| {
            entry
                .metadata()
                .map(|m| m.dev() == device_id)
                .unwrap_or(false)
        });

    for entry in walker.flatten() {
        if let Ok(meta) = entry.metadata() {
            if meta.dev() == device_id {
                total += meta.blocks() * 512;
            }
        }
    }
    total
}
