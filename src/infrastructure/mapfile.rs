//! Reader for the ddrescue-style map file the imaging tool produces.
//!
//! This is ambient plumbing, not part of the core's tested design surface
//! (see spec §4.8): it turns a text file into the `Vec<(u64, u64)>` of
//! byte ranges that [`crate::infrastructure::ntfs::SafeRegionIndex`] is
//! built from.
//!
//! Format: an optional run of `#`-prefixed comment lines, then a header
//! line `<current_pos> <current_status> <current_pass>`, then zero or
//! more data lines `<pos> <size> <status>`. `pos` and `size` are
//! hex-prefixed (`0x...`); `status` is a single character. Only data
//! lines whose status is `+` become safe regions.

use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapFileError {
    #[error("I/O error reading map file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed map file line {line}: {text:?}")]
    MalformedLine { line: usize, text: String },
}

const SAFE_STATUS: char = '+';

/// Parses a map file and returns the `(byte_offset, byte_length)` ranges
/// whose status is `+`. The header line (first non-comment line) is
/// consumed and discarded.
pub fn read_safe_regions(path: &Path) -> Result<Vec<(u64, u64)>, MapFileError> {
    let contents = std::fs::read_to_string(path)?;
    parse_safe_regions(&contents)
}

fn parse_safe_regions(contents: &str) -> Result<Vec<(u64, u64)>, MapFileError> {
    let mut regions = Vec::new();
    let mut seen_header = false;

    for (line_no, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();

        if !seen_header {
            seen_header = true;
            if fields.len() != 3 {
                return Err(MapFileError::MalformedLine {
                    line: line_no + 1,
                    text: raw_line.to_string(),
                });
            }
            continue;
        }

        let [pos, size, status]: [&str; 3] = fields.try_into().map_err(|_| {
            MapFileError::MalformedLine {
                line: line_no + 1,
                text: raw_line.to_string(),
            }
        })?;

        let offset = parse_hex(pos).ok_or_else(|| MapFileError::MalformedLine {
            line: line_no + 1,
            text: raw_line.to_string(),
        })?;
        let length = parse_hex(size).ok_or_else(|| MapFileError::MalformedLine {
            line: line_no + 1,
            text: raw_line.to_string(),
        })?;
        let status_char = status.chars().next().ok_or_else(|| MapFileError::MalformedLine {
            line: line_no + 1,
            text: raw_line.to_string(),
        })?;

        if status_char == SAFE_STATUS {
            regions.push((offset, length));
        }
    }

    Ok(regions)
}

fn parse_hex(field: &str) -> Option<u64> {
    let stripped = field.strip_prefix("0x").or_else(|| field.strip_prefix("0X")).unwrap_or(field);
    u64::from_str_radix(stripped, 16).ok()
}
