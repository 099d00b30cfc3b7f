//! Operator logs: the optional per-snapshot `log.md` and the append-only
//! restore log at the restore destination root.

use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::Command;

use crate::common::timestamp_now;
use crate::error::TarsyncError;
use crate::sync::SyncSummary;

/// Free-form operator notes, one per work directory. Presence alone
/// drives the catalog's log marker.
pub const LOG_FILE_NAME: &str = "log.md";

/// Restore history, one per restore destination root.
pub const RESTORE_LOG_NAME: &str = "tarsync-restore.log";

/// Whether the backup workflow should offer to write `log.md`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogChoice {
    /// Ask on stdin, defaulting to yes, then open the editor.
    Prompt,
    /// Skip the log entirely (non-interactive runs).
    Skip,
}

/// Offer to write a snapshot log into `work_dir`.
pub fn offer_snapshot_log(work_dir: &Path, choice: LogChoice) -> Result<(), TarsyncError> {
    if choice == LogChoice::Skip {
        return Ok(());
    }
    if !prompt_yes("Write a log for this snapshot? [Y/n]: ")? {
        return Ok(());
    }
    edit_file(&work_dir.join(LOG_FILE_NAME))
}

/// Append a timestamped entry with the sync summary to the restore log
/// under `target_root`.
pub fn append_restore_entry(
    target_root: &Path,
    snapshot_name: &str,
    summary: &SyncSummary,
) -> Result<(), TarsyncError> {
    let path = target_root.join(RESTORE_LOG_NAME);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(TarsyncError::io(&path))?;
    writeln!(file, "[{}] restored '{}'", timestamp_now(), snapshot_name)
        .and_then(|_| writeln!(file, "{summary}"))
        .map_err(TarsyncError::io(&path))
}

fn prompt_yes(question: &str) -> Result<bool, TarsyncError> {
    print!("{question}");
    io::stdout().flush().map_err(TarsyncError::io("stdout"))?;
    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(TarsyncError::io("stdin"))?;
    let answer = answer.trim();
    Ok(answer.is_empty() || answer.eq_ignore_ascii_case("y"))
}

fn edit_file(path: &Path) -> Result<(), TarsyncError> {
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = Command::new(&editor)
        .arg(path)
        .status()
        .map_err(|err| TarsyncError::ExternalProcess {
            stage: editor.clone(),
            status: "failed to start".to_string(),
            stderr: err.to_string(),
        })?;
    if !status.success() {
        return Err(TarsyncError::ExternalProcess {
            stage: editor,
            status: status.to_string(),
            stderr: String::new(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn restore_entries_accumulate_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let summary = SyncSummary {
            sent_bytes: 100,
            received_bytes: 20,
            bytes_per_sec: 80.0,
            total_size: 1_000,
            speedup: 8.33,
            dry_run: false,
        };
        append_restore_entry(dir.path(), "2025_02_28_AM_04_36_28", &summary).unwrap();
        append_restore_entry(dir.path(), "2025_03_01_PM_10_00_00", &summary).unwrap();

        let log = fs::read_to_string(dir.path().join(RESTORE_LOG_NAME)).unwrap();
        let first = log.find("2025_02_28_AM_04_36_28").unwrap();
        let second = log.find("2025_03_01_PM_10_00_00").unwrap();
        assert!(first < second);
        assert!(log.contains("speedup 8.33"));
    }

    #[test]
    fn skip_choice_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        offer_snapshot_log(dir.path(), LogChoice::Skip).unwrap();
        assert!(!dir.path().join(LOG_FILE_NAME).exists());
    }
}
