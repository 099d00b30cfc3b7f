//! `df`-style device statistics for a path.
//!
//! Usage numbers come straight from `statvfs(3)` so that
//! `used + available <= total` holds exactly (the gap is the filesystem's
//! reserved blocks). The mount table from `sysinfo` only supplies the
//! device name and mount point for operator-facing reports.

use std::ffi::CString;
use std::fmt;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use sysinfo::Disks;

use crate::common::format_size;
use crate::error::TarsyncError;

/// One snapshot of a mounted filesystem's usage.
///
/// Constructed fresh per [`query`], immutable afterwards; a new query
/// produces a new instance.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Block device identifier, e.g. `/dev/sda1`.
    pub device: String,
    /// Kernel device id (`st_dev`) of the queried path. Cross-device
    /// comparisons use this rather than the device name string.
    pub device_id: u64,
    /// Where the filesystem is mounted.
    pub mount_point: PathBuf,
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
}

impl DeviceInfo {
    /// Used fraction in whole percent; 0 when the total is unknown.
    pub fn usage_percentage(&self) -> u64 {
        if self.total_bytes == 0 {
            0
        } else {
            self.used_bytes * 100 / self.total_bytes
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "device:      {}", self.device)?;
        writeln!(f, "mount point: {}", self.mount_point.display())?;
        writeln!(f, "total:       {}", format_size(self.total_bytes))?;
        writeln!(f, "used:        {}", format_size(self.used_bytes))?;
        writeln!(f, "available:   {}", format_size(self.available_bytes))?;
        write!(f, "usage:       {}%", self.usage_percentage())
    }
}

/// Resolve the device owning `path` and its usage statistics.
///
/// Fails with [`TarsyncError::DeviceQuery`] when the path does not exist
/// or the underlying stat call cannot complete.
pub fn query(path: &Path) -> Result<DeviceInfo, TarsyncError> {
    let device_query = |source| TarsyncError::DeviceQuery {
        path: path.to_path_buf(),
        source,
    };

    let meta = fs::metadata(path).map_err(device_query)?;
    let stats = statvfs(path).map_err(device_query)?;

    let block = if stats.f_frsize > 0 {
        stats.f_frsize as u64
    } else {
        stats.f_bsize as u64
    };
    let total_bytes = stats.f_blocks as u64 * block;
    let used_bytes = (stats.f_blocks as u64).saturating_sub(stats.f_bfree as u64) * block;
    let available_bytes = stats.f_bavail as u64 * block;

    let (device, mount_point) = resolve_mount(path);

    Ok(DeviceInfo {
        device,
        device_id: meta.dev(),
        mount_point,
        total_bytes,
        used_bytes,
        available_bytes,
    })
}

/// Query the device of `path`, or of its nearest existing ancestor.
///
/// Capacity checks run before directories are created, so the store or
/// restore root may not exist yet; its device is still well-defined.
pub fn query_nearest(path: &Path) -> Result<DeviceInfo, TarsyncError> {
    let mut candidate = path;
    loop {
        if candidate.exists() {
            return query(candidate);
        }
        match candidate.parent() {
            Some(parent) => candidate = parent,
            None => return query(path),
        }
    }
}

/// Kernel device id of `path` without following a trailing symlink.
pub fn device_id_of(path: &Path) -> io::Result<u64> {
    Ok(fs::symlink_metadata(path)?.dev())
}

fn statvfs(path: &Path) -> io::Result<libc::statvfs> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains a NUL byte"))?;
    let mut stats: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stats) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(stats)
}

/// Find the mount owning `path`: longest mount point that prefixes it.
/// Falls back to the path itself when the mount table has no match
/// (containers sometimes hide their mounts from sysinfo).
fn resolve_mount(path: &Path) -> (String, PathBuf) {
    let resolved = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let disks = Disks::new_with_refreshed_list();
    let owner = disks
        .list()
        .iter()
        .filter(|d| resolved.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len());
    match owner {
        Some(disk) => (
            disk.name().to_string_lossy().into_owned(),
            disk.mount_point().to_path_buf(),
        ),
        None => ("unknown".to_string(), resolved),
    }
}
