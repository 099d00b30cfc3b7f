//! Archive Engine boundary: the `tar | pv | gzip` create pipeline and
//! the `pv | tar -x` extract pipeline.
//!
//! Each stage is an independent process; they stream bytes to each other
//! concurrently and this layer suspends until the whole pipeline is done.
//! Any non-zero exit anywhere is fatal; nothing here cleans up a partial
//! archive. The work directory is left for operator inspection.

use std::fs::File;
use std::io;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};

use tracing::info;

use crate::config::ExclusionSet;
use crate::error::TarsyncError;

/// File name of the compressed archive inside a work directory.
pub const ARCHIVE_FILE_NAME: &str = "tarsync.tar.gz";

/// Produce `archive_path` from `source_root`, honoring the exclusion
/// list. Absolute paths, ACLs and extended attributes are preserved and
/// the walk never crosses mount boundaries; capacity planning assumes
/// both properties.
pub fn create(
    source_root: &Path,
    archive_path: &Path,
    exclusions: &ExclusionSet,
) -> Result<(), TarsyncError> {
    info!(
        source = %source_root.display(),
        archive = %archive_path.display(),
        excluded = exclusions.len(),
        "starting archive pipeline"
    );

    let archive_file = File::create(archive_path).map_err(TarsyncError::io(archive_path))?;

    let mut tar = Command::new("tar");
    tar.arg("cf")
        .arg("-")
        .arg("-P")
        .arg("--one-file-system")
        .arg("--acls")
        .arg("--xattrs")
        .args(exclusions.exclude_flags())
        .arg(source_root)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut tar_child = tar.spawn().map_err(spawn_failed("tar"))?;
    let tar_out = piped_stdout(&mut tar_child, "tar")?;

    // pv draws its progress bar on stderr; let it through to the operator.
    let mut pv_child = Command::new("pv")
        .stdin(Stdio::from(tar_out))
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(spawn_failed("pv"))?;
    let pv_out = piped_stdout(&mut pv_child, "pv")?;

    let gzip_child = Command::new("gzip")
        .stdin(Stdio::from(pv_out))
        .stdout(Stdio::from(archive_file))
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_failed("gzip"))?;

    let tar_result = tar_child
        .wait_with_output()
        .map_err(spawn_failed("tar"))?;
    check_stage("tar", tar_result.status, &tar_result.stderr)?;

    let pv_status = pv_child.wait().map_err(spawn_failed("pv"))?;
    check_stage("pv", pv_status, &[])?;

    let gzip_result = gzip_child
        .wait_with_output()
        .map_err(spawn_failed("gzip"))?;
    check_stage("gzip", gzip_result.status, &gzip_result.stderr)?;

    info!(archive = %archive_path.display(), "archive pipeline finished");
    Ok(())
}

/// Unpack `archive_path` into `destination_dir` (which must exist).
pub fn extract(archive_path: &Path, destination_dir: &Path) -> Result<(), TarsyncError> {
    info!(
        archive = %archive_path.display(),
        destination = %destination_dir.display(),
        "starting extract pipeline"
    );

    let mut pv_child = Command::new("pv")
        .arg(archive_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(spawn_failed("pv"))?;
    let pv_out = piped_stdout(&mut pv_child, "pv")?;

    let tar_child = Command::new("tar")
        .arg("-xzf")
        .arg("-")
        .arg("-C")
        .arg(destination_dir)
        .stdin(Stdio::from(pv_out))
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_failed("tar"))?;

    let tar_result = tar_child
        .wait_with_output()
        .map_err(spawn_failed("tar"))?;
    check_stage("tar", tar_result.status, &tar_result.stderr)?;

    let pv_status = pv_child.wait().map_err(spawn_failed("pv"))?;
    check_stage("pv", pv_status, &[])?;

    Ok(())
}

fn piped_stdout(child: &mut Child, stage: &str) -> Result<ChildStdout, TarsyncError> {
    child.stdout.take().ok_or_else(|| TarsyncError::ExternalProcess {
        stage: stage.to_string(),
        status: "no stdout pipe".to_string(),
        stderr: String::new(),
    })
}

fn spawn_failed(stage: &'static str) -> impl FnOnce(io::Error) -> TarsyncError {
    move |source| TarsyncError::ExternalProcess {
        stage: stage.to_string(),
        status: "failed to start".to_string(),
        stderr: source.to_string(),
    }
}

fn check_stage(stage: &str, status: ExitStatus, stderr: &[u8]) -> Result<(), TarsyncError> {
    if status.success() {
        return Ok(());
    }
    Err(TarsyncError::ExternalProcess {
        stage: stage.to_string(),
        status: status.to_string(),
        stderr: String::from_utf8_lossy(stderr).trim_end().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_stage_reports_status_and_diagnostics() {
        let err = check_stage(
            "tar",
            fake_failure_status(),
            b"tar: /nope: Cannot stat: No such file or directory\n",
        )
        .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("'tar' failed"));
        assert!(text.contains("Cannot stat"));
    }

    fn fake_failure_status() -> ExitStatus {
        // A real failing child is the only portable way to make one.
        Command::new("false")
            .status()
            .expect("`false` must exist for this test")
    }
}
