//! Sync Engine boundary: the rsync invocation and a strict parser for
//! its trailing summary.
//!
//! rsync's summary is a text protocol we cannot avoid; instead of
//! best-effort scraping, every field is a named capture and a missing
//! field is an explicit error naming it.

use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::thread;

use regex::Regex;
use tracing::info;

use crate::config::ExclusionSet;
use crate::error::TarsyncError;

/// How a sync run should behave.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Remove destination files absent from the source snapshot.
    pub delete_extraneous: bool,
    /// Report what would change without writing anything.
    pub dry_run: bool,
}

/// The parsed tail of rsync's output.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSummary {
    pub sent_bytes: u64,
    pub received_bytes: u64,
    pub bytes_per_sec: f64,
    pub total_size: u64,
    pub speedup: f64,
    pub dry_run: bool,
}

impl std::fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "sent {} bytes, received {} bytes, {:.2} bytes/sec",
            self.sent_bytes, self.received_bytes, self.bytes_per_sec
        )?;
        write!(
            f,
            "total size {} bytes, speedup {:.2}{}",
            self.total_size,
            self.speedup,
            if self.dry_run { " (dry run)" } else { "" }
        )
    }
}

/// Synchronize `source/` onto `destination`, streaming rsync's output to
/// the operator while capturing it for the summary parse.
///
/// Contents, hard links, ACLs, xattrs and numeric ownership follow the
/// source; the exclusion list is applied verbatim.
pub fn run(
    source: &Path,
    destination: &Path,
    exclusions: &ExclusionSet,
    options: SyncOptions,
) -> Result<SyncSummary, TarsyncError> {
    let mut cmd = Command::new("rsync");
    cmd.arg("-aAXv")
        .arg("--hard-links")
        .arg("--progress")
        .arg("--numeric-ids");
    if options.delete_extraneous {
        cmd.arg("--delete");
    }
    if options.dry_run {
        cmd.arg("--dry-run");
    }
    cmd.args(exclusions.exclude_flags());

    // Trailing slash: sync the *contents* of the source tree.
    let mut source_arg = source.as_os_str().to_os_string();
    source_arg.push("/");
    cmd.arg(source_arg).arg(destination);

    info!(
        source = %source.display(),
        destination = %destination.display(),
        dry_run = options.dry_run,
        delete = options.delete_extraneous,
        "starting sync"
    );

    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| TarsyncError::ExternalProcess {
            stage: "rsync".to_string(),
            status: "failed to start".to_string(),
            stderr: err.to_string(),
        })?;

    // Drain stderr on its own thread. rsync interleaves per-file
    // diagnostics on stderr with transfer output on stdout; reading
    // them sequentially deadlocks once either pipe buffer fills.
    let stderr_pipe = child.stderr.take();
    let stderr_thread = thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = stderr_pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    });

    let mut captured = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        forward_output(stdout, io::stdout().lock(), &mut captured)
            .map_err(TarsyncError::io(source))?;
    }

    let status = child.wait().map_err(TarsyncError::io(source))?;
    let stderr_bytes = stderr_thread.join().unwrap_or_default();
    if !status.success() {
        return Err(TarsyncError::ExternalProcess {
            stage: "rsync".to_string(),
            status: status.to_string(),
            stderr: String::from_utf8_lossy(&stderr_bytes).trim_end().to_string(),
        });
    }

    parse_summary(&String::from_utf8_lossy(&captured))
}

/// Relay `reader` to `sink` chunk by chunk while keeping a copy for the
/// summary parse. Bytes pass through verbatim so the bare carriage
/// returns of `--progress` redraws keep the operator display live.
/// Display failures are ignored; the capture is what correctness needs.
fn forward_output(
    mut reader: impl Read,
    mut sink: impl Write,
    captured: &mut Vec<u8>,
) -> io::Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            return Ok(());
        }
        let _ = sink.write_all(&chunk[..n]);
        let _ = sink.flush();
        captured.extend_from_slice(&chunk[..n]);
    }
}

/// Parse the two summary lines rsync prints last, e.g.
///
/// ```text
/// sent 3,266,705 bytes  received 2,697,633 bytes  290,943.32 bytes/sec
/// total size is 4,865,994,599  speedup is 815.85 (DRY RUN)
/// ```
pub fn parse_summary(output: &str) -> Result<SyncSummary, TarsyncError> {
    static TRANSFER: OnceLock<Regex> = OnceLock::new();
    static TOTALS: OnceLock<Regex> = OnceLock::new();
    let transfer = TRANSFER.get_or_init(|| {
        Regex::new(
            r"sent (?P<sent>[\d,]+) bytes\s+received (?P<received>[\d,]+) bytes\s+(?P<rate>[\d,]+(?:\.\d+)?) bytes/sec",
        )
        .expect("static pattern")
    });
    let totals = TOTALS.get_or_init(|| {
        Regex::new(
            r"total size is (?P<total>[\d,]+)\s+speedup is (?P<speedup>[\d,]+(?:\.\d+)?)(?P<dry>\s*\(DRY RUN\))?",
        )
        .expect("static pattern")
    });

    let transfer_caps = transfer
        .captures(output)
        .ok_or(TarsyncError::SummaryField("sent/received"))?;
    let totals_caps = totals
        .captures(output)
        .ok_or(TarsyncError::SummaryField("total size"))?;

    Ok(SyncSummary {
        sent_bytes: grouped_u64(&transfer_caps, "sent")?,
        received_bytes: grouped_u64(&transfer_caps, "received")?,
        bytes_per_sec: grouped_f64(&transfer_caps, "rate")?,
        total_size: grouped_u64(&totals_caps, "total")?,
        speedup: grouped_f64(&totals_caps, "speedup")?,
        dry_run: totals_caps.name("dry").is_some(),
    })
}

fn grouped_u64(caps: &regex::Captures<'_>, field: &'static str) -> Result<u64, TarsyncError> {
    let raw = caps
        .name(field)
        .ok_or(TarsyncError::SummaryField(field))?
        .as_str()
        .replace(',', "");
    raw.parse().map_err(|_| TarsyncError::SummaryField(field))
}

fn grouped_f64(caps: &regex::Captures<'_>, field: &'static str) -> Result<f64, TarsyncError> {
    let raw = caps
        .name(field)
        .ok_or(TarsyncError::SummaryField(field))?
        .as_str()
        .replace(',', "");
    raw.parse().map_err(|_| TarsyncError::SummaryField(field))
}
