//! Utility functions for sizes and output statistics
//!
//! Helpers shared by the reporter and the command-line front end.

use crate::error::Result;
use std::path::Path;
use walkdir::WalkDir;

/// Human-readable size with 1024-based units, e.g. `512 B` or `1.50 MB`
pub fn format_file_size(bytes: u64) -> String {
    const UNIT_STEP: f64 = 1024.0;
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if (bytes as f64) < UNIT_STEP {
        return format!("{} B", bytes);
    }

    let mut size = bytes as f64 / UNIT_STEP;
    let mut unit = UNITS[0];
    for &next in &UNITS[1..] {
        if size < UNIT_STEP {
            break;
        }
        size /= UNIT_STEP;
        unit = next;
    }

    format!("{:.2} {}", size, unit)
}

/// Percentage by which `compressed_size` undercuts `original_size`; negative
/// when the output grew
pub fn calculate_compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    match original_size {
        0 => 0.0,
        original => (1.0 - compressed_size as f64 / original as f64) * 100.0,
    }
}

/// File count and total size of a directory tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderStats {
    pub file_count: usize,
    pub total_bytes: u64,
}

/// Walks `dir` recursively and sums the sizes of all regular files.
///
/// A missing directory counts as empty.
pub fn folder_stats(dir: &Path) -> Result<FolderStats> {
    let mut stats = FolderStats::default();
    if !dir.exists() {
        return Ok(stats);
    }

    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if entry.file_type().is_file() {
            stats.file_count += 1;
            stats.total_bytes += entry.metadata()?.len();
        }
    }

    Ok(stats)
}
