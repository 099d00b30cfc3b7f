//! Validation of the external collaborators before any workflow runs.
//!
//! The archiver, synchronizer and progress meter are opaque subprocesses;
//! the only thing this layer guarantees up front is that they resolve on
//! `PATH`, with an install hint when one does not.

use std::env;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::error::TarsyncError;

/// One required external tool and its remediation hint.
#[derive(Debug, Clone, Copy)]
pub struct Tool {
    pub name: &'static str,
    pub hint: &'static str,
}

/// The three collaborators both workflows depend on.
pub const REQUIRED_TOOLS: [Tool; 3] = [
    Tool {
        name: "tar",
        hint: "sudo apt install tar",
    },
    Tool {
        name: "rsync",
        hint: "sudo apt install rsync",
    },
    Tool {
        name: "pv",
        hint: "sudo apt install pv",
    },
];

/// Confirm every required tool is resolvable; the first missing one is
/// fatal with its install hint.
pub fn validate_required() -> Result<(), TarsyncError> {
    for tool in REQUIRED_TOOLS {
        ensure_tool(tool)?;
    }
    Ok(())
}

pub fn ensure_tool(tool: Tool) -> Result<(), TarsyncError> {
    if find_in_path(tool.name).is_none() {
        return Err(TarsyncError::ToolMissing {
            tool: tool.name.to_string(),
            hint: tool.hint.to_string(),
        });
    }
    Ok(())
}

/// Resolve `name` against the `PATH` environment variable.
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    search_dirs(name, env::split_paths(&path_var))
}

fn search_dirs(name: &str, dirs: impl Iterator<Item = PathBuf>) -> Option<PathBuf> {
    dirs.map(|dir| dir.join(name)).find(|p| is_executable(p))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
