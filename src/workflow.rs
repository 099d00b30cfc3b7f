//! Workflow orchestrator: the backup and restore state machines.
//!
//! Both are linear sequences with fail-fast short-circuiting: every
//! precondition (tools, capacity, archive presence) is checked before
//! the first mutating step, and failures during archiving or syncing
//! abort without rollback, leaving on-disk artifacts for inspection.
//!
//! No locking is taken on the store; concurrent invocations against the
//! same store must be serialized by the caller.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::archive::{self, ARCHIVE_FILE_NAME};
use crate::catalog;
use crate::common::{format_size, timestamp_now};
use crate::config::Config;
use crate::device;
use crate::error::TarsyncError;
use crate::logger::{self, LogChoice};
use crate::metadata::SnapshotMetadata;
use crate::planner;
use crate::sync::{self, SyncOptions};
use crate::tools;

/// How many recent snapshots the post-backup report shows.
const RECENT_PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct BackupOptions {
    pub log: LogChoice,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreOptions {
    /// Remove target files absent from the snapshot.
    pub delete_extraneous: bool,
    /// Run a sync simulation and surface its summary before the real pass.
    pub dry_run: bool,
}

/// One configured backup/restore orchestrator. Holds no process-wide
/// state; everything flows from the [`Config`] passed in.
pub struct Tarsync {
    config: Config,
}

impl Tarsync {
    pub fn new(config: Config) -> Self {
        Tarsync { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create one snapshot of the configured backup disk in the store.
    ///
    /// Stages: validate tools, project size, check store capacity,
    /// prepare directories, write metadata, offer the operator log, run
    /// the archive pipeline, report the recent catalog.
    pub fn backup(&self, options: &BackupOptions) -> Result<(), TarsyncError> {
        tools::validate_required()?;

        let source_device = device::query(&self.config.backup_disk)?;
        let exclusions = self.config.exclusions();
        let projected = planner::project_operation_size(&source_device, &exclusions);
        println!("projected backup size: {}", format_size(projected));

        // Capacity is checked on the store's device, not the source's.
        let store_device = device::query_nearest(&self.config.store_dir)?;
        planner::ensure_capacity(&store_device, projected)?;

        fs::create_dir_all(&self.config.store_dir)
            .map_err(TarsyncError::io(&self.config.store_dir))?;
        let stamp = timestamp_now();
        let work_dir = fresh_dir(&self.config.store_dir, &stamp)?;
        info!(work_dir = %work_dir.display(), "prepared work directory");

        SnapshotMetadata::new(projected, exclusions.clone(), stamp).store(&work_dir)?;
        logger::offer_snapshot_log(&work_dir, options.log)?;

        let archive_path = work_dir.join(ARCHIVE_FILE_NAME);
        println!("starting backup");
        println!("archive: {}", archive_path.display());
        archive::create(&self.config.backup_disk, &archive_path, &exclusions)?;

        let entries = catalog::list_entries(&self.config.store_dir)?;
        let total = entries.len();
        let page = catalog::paginate(entries, RECENT_PAGE_SIZE, -1);
        println!(
            "{}",
            catalog::render_summary(&page, RECENT_PAGE_SIZE, 0, total, &self.config.store_dir)
        );
        Ok(())
    }

    /// Reconstruct `target` from the named snapshot.
    ///
    /// Stages: validate the archive exists, validate tools, load the
    /// snapshot metadata (original exclusions and size), check capacity
    /// on both the store device (extraction) and the target device
    /// (sync), extract, optionally dry-run the sync, sync for real,
    /// append to the restore log, drop the extracted copy.
    pub fn restore(
        &self,
        name: &str,
        target: &Path,
        options: &RestoreOptions,
    ) -> Result<(), TarsyncError> {
        let work_dir = self.config.store_dir.join(name);
        if !work_dir.is_dir() {
            return Err(TarsyncError::ArchiveNotFound {
                name: name.to_string(),
                store_dir: self.config.store_dir.clone(),
            });
        }
        tools::validate_required()?;

        let meta = SnapshotMetadata::load(&work_dir)?;
        info!(
            snapshot = name,
            size = %format_size(meta.size_bytes),
            excluded = meta.exclude.len(),
            "loaded snapshot metadata"
        );

        let store_device = device::query(&self.config.store_dir)?;
        planner::ensure_capacity(&store_device, meta.size_bytes)?;
        let target_device = device::query_nearest(target)?;
        planner::ensure_capacity(&target_device, meta.size_bytes)?;

        let restore_dir = fresh_dir(&work_dir, "restore")?;
        fs::create_dir_all(target).map_err(TarsyncError::io(target))?;

        archive::extract(&work_dir.join(ARCHIVE_FILE_NAME), &restore_dir)?;

        if options.dry_run {
            let preview = sync::run(
                &restore_dir,
                target,
                &meta.exclude,
                SyncOptions {
                    delete_extraneous: options.delete_extraneous,
                    dry_run: true,
                },
            )?;
            println!("dry run summary:\n{preview}");
        }

        let summary = sync::run(
            &restore_dir,
            target,
            &meta.exclude,
            SyncOptions {
                delete_extraneous: options.delete_extraneous,
                dry_run: false,
            },
        )?;
        println!("sync summary:\n{summary}");
        logger::append_restore_entry(target, name, &summary)?;

        // The extracted copy has served its purpose; leaving it would
        // count against the store and show up in the snapshot's size.
        // Failure paths above keep theirs for inspection.
        fs::remove_dir_all(&restore_dir).map_err(TarsyncError::io(&restore_dir))?;
        Ok(())
    }
}

/// Create a directory named `base` under `parent`, appending `-1`, `-2`,
/// … when the name is taken. Creation itself is the existence check, so
/// two racing invocations cannot claim the same directory.
fn fresh_dir(parent: &Path, base: &str) -> Result<PathBuf, TarsyncError> {
    for attempt in 0u32..=u32::MAX {
        let candidate = if attempt == 0 {
            parent.join(base)
        } else {
            parent.join(format!("{base}-{attempt}"))
        };
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(source) => {
                return Err(TarsyncError::Io {
                    path: candidate,
                    source,
                })
            }
        }
    }
    Err(TarsyncError::Io {
        path: parent.join(base),
        source: io::Error::new(io::ErrorKind::AlreadyExists, "no free work directory name"),
    })
}
