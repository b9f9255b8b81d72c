//! Utility functions for tape-weave

use crate::error::{Result, TapeError};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::ops::RangeInclusive;
use std::path::Path;

/// Format bytes in human-readable format (B, KB, MB, GB, TB)
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    const THRESHOLD: u64 = 1024;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD as f64 && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD as f64;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Format duration in human-readable format
pub fn format_duration(duration_secs: f64) -> String {
    if duration_secs < 60.0 {
        format!("{:.1}s", duration_secs)
    } else if duration_secs < 3600.0 {
        let minutes = (duration_secs / 60.0) as u32;
        let seconds = duration_secs % 60.0;
        format!("{}m {:.1}s", minutes, seconds)
    } else {
        let hours = (duration_secs / 3600.0) as u32;
        let minutes = ((duration_secs % 3600.0) / 60.0) as u32;
        let seconds = duration_secs % 60.0;
        format!("{}h {}m {:.1}s", hours, minutes, seconds)
    }
}

/// Parse a block list such as `"10-12, 40"` into inclusive ranges.
///
/// Empty input yields no ranges. Descending ranges are rejected.
pub fn parse_block_ranges(text: &str) -> Result<Vec<RangeInclusive<u32>>> {
    let mut ranges = Vec::new();

    for entry in text.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let range = match entry.split_once('-') {
            Some((start, end)) => {
                let start = parse_block_number(start, entry)?;
                let end = parse_block_number(end, entry)?;
                if start > end {
                    return Err(TapeError::configuration(format!(
                        "Block range '{}' runs backwards",
                        entry
                    )));
                }
                start..=end
            }
            None => {
                let block = parse_block_number(entry, entry)?;
                block..=block
            }
        };
        ranges.push(range);
    }

    Ok(ranges)
}

/// Expand a block list string into a sorted, de-duplicated list of block numbers.
pub fn parse_block_list(text: &str) -> Result<Vec<u32>> {
    let mut blocks: Vec<u32> = parse_block_ranges(text)?
        .into_iter()
        .flatten()
        .collect();
    blocks.sort_unstable();
    blocks.dedup();
    Ok(blocks)
}

fn parse_block_number(text: &str, entry: &str) -> Result<u32> {
    text.trim().parse::<u32>().map_err(|e| {
        TapeError::configuration(format!("Invalid block number in '{}': {}", entry, e))
    })
}

/// Refuse to clobber an existing output file.
pub fn ensure_absent(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(TapeError::AlreadyExists(path.to_path_buf()));
    }
    Ok(())
}

/// Create `path` for writing, failing if anything already exists there.
pub fn create_new_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => TapeError::AlreadyExists(path.to_path_buf()),
            _ => TapeError::Io(e),
        })
}

/// Convert file path to display-friendly string
pub fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
