//! Snapshot catalog: listing, bidirectional pagination, selection and
//! the rendered operator report.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};

use crate::common::format_size;
use crate::error::TarsyncError;
use crate::logger::LOG_FILE_NAME;
use crate::planner;

/// One snapshot work directory as seen in the store listing.
///
/// Size and log presence are computed lazily, only when entries are
/// rendered; listing a large store for a count stays O(1) per entry.
#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub name: String,
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl SnapshotEntry {
    /// On-disk usage of the work directory (allocated blocks).
    pub fn size_on_disk(&self) -> u64 {
        match fs::metadata(&self.path) {
            Ok(meta) => planner::directory_size(&self.path, meta.dev()),
            Err(_) => 0,
        }
    }

    pub fn has_log(&self) -> bool {
        self.path.join(LOG_FILE_NAME).is_file()
    }

    fn modified_label(&self) -> String {
        DateTime::<Local>::from(self.modified)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    }
}

/// List the store's entries, ordered by modification time, oldest first.
pub fn list_entries(store_dir: &Path) -> Result<Vec<SnapshotEntry>, TarsyncError> {
    if !store_dir.is_dir() {
        return Err(TarsyncError::StoreNotFound(store_dir.to_path_buf()));
    }

    let mut entries = Vec::new();
    for dirent in fs::read_dir(store_dir).map_err(TarsyncError::io(store_dir))? {
        let dirent = dirent.map_err(TarsyncError::io(store_dir))?;
        let meta = match dirent.metadata() {
            Ok(m) => m,
            Err(_) => continue,
        };
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        entries.push(SnapshotEntry {
            name: dirent.file_name().to_string_lossy().into_owned(),
            path: dirent.path(),
            modified,
        });
    }

    // Name as tie-breaker so listing order is stable within one second.
    entries.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}

/// A view over an ordered entry sequence.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<SnapshotEntry>,
    /// 1-based, corrected into the valid range.
    pub page_number: usize,
    pub total_pages: usize,
}

/// Cut `entries` into pages of `page_size` and return page `page_num`.
///
/// A negative `page_num` counts from the end (`-1` is the last page).
/// Out-of-range numbers clamp into `[1, total_pages]`. The last page is
/// right-aligned: it always shows the most recent `page_size` (or fewer)
/// entries even when the entry count does not divide evenly.
pub fn paginate(entries: Vec<SnapshotEntry>, page_size: usize, page_num: i64) -> Page {
    let total_items = entries.len();
    if total_items == 0 || page_size == 0 {
        return Page {
            items: Vec::new(),
            page_number: 1,
            total_pages: 0,
        };
    }

    let total_pages = total_items.div_ceil(page_size);
    let corrected = if page_num < 0 {
        total_pages as i64 + page_num + 1
    } else {
        page_num
    }
    .clamp(1, total_pages as i64) as usize;

    let mut start = (corrected - 1) * page_size;
    if start + page_size > total_items {
        start = total_items.saturating_sub(page_size);
    }
    let end = (start + page_size).min(total_items);

    Page {
        items: entries[start..end].to_vec(),
        page_number: corrected,
        total_pages,
    }
}

/// Resolve a 1-based selection on the current page. Positive counts from
/// the front, negative from the back of the page, `0` selects nothing.
pub fn resolve_selection(page: &Page, select_list: i64) -> Option<&SnapshotEntry> {
    if select_list == 0 {
        return None;
    }
    let len = page.items.len() as i64;
    let index = if select_list < 0 {
        len + select_list
    } else {
        select_list - 1
    };
    if (0..len).contains(&index) {
        page.items.get(index as usize)
    } else {
        None
    }
}

/// Render the operator-facing catalog report for one page.
///
/// Per entry: a zero-padded sequence number (padded to the width of the
/// total entry count), a selection marker, a log marker, the entry's
/// human-readable size and its listing line. Followed by the store's
/// aggregate size, the page's aggregate size, a page footer, and, when
/// a selection resolves, the selected snapshot's log.
pub fn render_summary(
    page: &Page,
    page_size: usize,
    select_list: i64,
    total_entries: usize,
    store_dir: &Path,
) -> String {
    let selected = resolve_selection(page, select_list).map(|e| e.name.clone());
    let width = total_entries.max(1).to_string().len();
    let start_index = (page.page_number.saturating_sub(1)) * page_size + 1;

    let mut out = String::new();
    let mut page_total = 0u64;
    for (i, entry) in page.items.iter().enumerate() {
        let size = entry.size_on_disk();
        page_total += size;
        let marker = if selected.as_deref() == Some(entry.name.as_str()) {
            '*'
        } else {
            ' '
        };
        let log_marker = if entry.has_log() { 'L' } else { '-' };
        out.push_str(&format!(
            "{:0width$}. [{marker}] {log_marker} {:>10} {} {}\n",
            start_index + i,
            format_size(size),
            entry.modified_label(),
            entry.name,
            width = width,
        ));
    }

    let store_total = match fs::metadata(store_dir) {
        Ok(meta) => planner::directory_size(store_dir, meta.dev()),
        Err(_) => 0,
    };
    out.push('\n');
    out.push_str(&format!("store total: {}\n", format_size(store_total)));
    out.push_str(&format!("page total:  {}\n", format_size(page_total)));
    out.push_str(&format!(
        "Page {} / {} (Total: {} snapshots)\n",
        page.page_number, page.total_pages, total_entries
    ));

    if let Some(entry) = resolve_selection(page, select_list) {
        out.push_str(&render_log(entry));
    }
    out
}

fn render_log(entry: &SnapshotEntry) -> String {
    let log_path = entry.path.join(LOG_FILE_NAME);
    match fs::read_to_string(&log_path) {
        Ok(content) => format!(
            "\nlog ({}/{}):\n-----------------------------------\n{}\n-----------------------------------\n",
            entry.name,
            LOG_FILE_NAME,
            content.trim_end(),
        ),
        Err(_) => format!("\nno {} in selected snapshot: {}\n", LOG_FILE_NAME, entry.name),
    }
}
