//! Static configuration: what to back up, where to store it, and which
//! paths to leave out.
//!
//! The exclusion list is ordered and is used verbatim by the planner and
//! the archive/sync engines; duplicates are not removed and the paths are
//! not required to exist.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TarsyncError;

/// An ordered sequence of absolute paths excluded from an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionSet(Vec<PathBuf>);

impl ExclusionSet {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        ExclusionSet(paths)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `--exclude=<path>` arguments in list order, as both tar and rsync
    /// spell them.
    pub fn exclude_flags(&self) -> Vec<OsString> {
        self.0
            .iter()
            .map(|p| {
                let mut flag = OsString::from("--exclude=");
                flag.push(p.as_os_str());
                flag
            })
            .collect()
    }
}

/// Immutable per-invocation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the tree being backed up.
    pub backup_disk: PathBuf,
    /// Store root holding one work directory per snapshot.
    pub store_dir: PathBuf,
    pub exclude: ExcludeConfig,
}

/// Exclusion paths, split into the stock list and operator additions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeConfig {
    pub default: Vec<PathBuf>,
    pub custom: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backup_disk: PathBuf::from("/"),
            store_dir: PathBuf::from("/mnt/backup"),
            exclude: ExcludeConfig::default(),
        }
    }
}

impl Default for ExcludeConfig {
    fn default() -> Self {
        ExcludeConfig {
            default: [
                "/swap.img",
                "/swapfile",
                "/proc",
                "/sys",
                "/dev",
                "/run",
                "/tmp",
                "/mnt",
                "/media",
                "/cdrom",
                "/var/run",
                "/var/tmp",
                "/lost+found",
                "/var/lib/docker",
                "/var/lib/containerd",
                "/var/run/docker.sock",
            ]
            .into_iter()
            .map(PathBuf::from)
            .collect(),
            custom: Vec::new(),
        }
    }
}

impl Config {
    /// Load a JSON config file; missing fields fall back to the defaults.
    pub fn load(path: &Path) -> Result<Config, TarsyncError> {
        let raw = fs::read_to_string(path).map_err(TarsyncError::io(path))?;
        serde_json::from_str(&raw).map_err(|source| TarsyncError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Config, TarsyncError> {
        match path {
            Some(p) => Config::load(p),
            None => Ok(Config::default()),
        }
    }

    /// The full exclusion list for a backup, in order: the store itself
    /// (a snapshot must never swallow the store), then the stock list,
    /// then operator additions.
    pub fn exclusions(&self) -> ExclusionSet {
        let mut paths = Vec::with_capacity(1 + self.exclude.default.len() + self.exclude.custom.len());
        paths.push(self.store_dir.clone());
        paths.extend(self.exclude.default.iter().cloned());
        paths.extend(self.exclude.custom.iter().cloned());
        ExclusionSet(paths)
    }
}
