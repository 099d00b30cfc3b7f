use std::path::PathBuf;

use thiserror::Error;

use crate::common::format_size;
use crate::device::DeviceInfo;

/// The primary error type for all operations in the `tarsync` crate.
///
/// Every fatal condition a workflow can hit is a variant here; the
/// accounting anomaly (projected size going negative) is deliberately
/// *not* an error; the planner clamps and warns instead.
#[derive(Debug, Error)]
pub enum TarsyncError {
    /// A required external tool is not resolvable on `PATH`.
    #[error("'{tool}' is not installed. Install it with: {hint}")]
    ToolMissing { tool: String, hint: String },

    /// Device/mount statistics could not be queried for a path.
    #[error("could not query device statistics for '{}': {source}", .path.display())]
    DeviceQuery {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The snapshot store directory does not exist.
    #[error("store directory does not exist: {}", .0.display())]
    StoreNotFound(PathBuf),

    /// The named snapshot work directory is missing from the store.
    #[error("no snapshot named '{name}' under {}", .store_dir.display())]
    ArchiveNotFound { name: String, store_dir: PathBuf },

    /// The destination device cannot hold the projected operation size.
    #[error(
        "not enough free space: at least {} required\n{device}",
        format_size(*.required)
    )]
    InsufficientCapacity { required: u64, device: DeviceInfo },

    /// An archive/sync pipeline stage exited non-zero or failed to start.
    #[error("'{stage}' failed ({status}): {stderr}")]
    ExternalProcess {
        stage: String,
        status: String,
        stderr: String,
    },

    /// The sync tool's textual summary lacked an expected field.
    #[error("sync summary is missing the '{0}' field")]
    SummaryField(&'static str),

    /// An I/O error with the path where it happened.
    #[error("I/O error on path '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A snapshot metadata or config file could not be parsed.
    #[error("malformed record at '{}': {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl TarsyncError {
    /// Attach a path to a bare `io::Error`.
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| TarsyncError::Io { path, source }
    }
}
