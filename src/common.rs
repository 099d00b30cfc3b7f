//! Shared helpers: human-readable sizes and the snapshot timestamp format.

use chrono::Local;

/// Timestamp format shared by work-directory names and metadata records.
/// Lexicographic order matches chronological order within a 12-hour block,
/// which is why the catalog sorts by mtime rather than by name.
pub const STAMP_FORMAT: &str = "%Y_%m_%d_%p_%I_%M_%S";

/// Current local time rendered in [`STAMP_FORMAT`], e.g.
/// `2025_02_28_AM_04_36_28`.
pub fn timestamp_now() -> String {
    Local::now().format(STAMP_FORMAT).to_string()
}

/// Render a byte count the way operators expect to read it.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} Bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_size_picks_the_right_unit() {
        assert_eq!(format_size(512), "512 Bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(80 * 1024 * 1024 * 1024), "80.00 GB");
    }

    #[test]
    fn timestamp_has_the_expected_shape() {
        let stamp = timestamp_now();
        // e.g. 2025_02_28_AM_04_36_28
        assert_eq!(stamp.len(), 22);
        assert!(stamp.contains("_AM_") || stamp.contains("_PM_"));
    }
}
