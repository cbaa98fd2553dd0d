//! Parser for the disk override table.
//!
//! One partition per line, six whitespace-separated columns:
//!
//! ```text
//! device  total  used  free  percentage  mountpoint
//! ```
//!
//! Sizes are already formatted and are carried through untouched. There is no
//! header row and no quoting.

use thiserror::Error;
use tracing::warn;

pub const FIELD_COUNT: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct OverrideRow {
    /// 1-based line number in the source table
    pub line: usize,
    pub device: String,
    pub total: String,
    pub used: String,
    pub free: String,
    pub percent: f64,
    pub mount_point: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OverrideError {
    #[error("line {line}: expected {FIELD_COUNT} fields, found {found}")]
    MissingFields { line: usize, found: usize },
    #[error("line {line}: invalid percentage {value:?}")]
    InvalidPercentage { line: usize, value: String },
}

impl OverrideError {
    pub fn line(&self) -> usize {
        match self {
            Self::MissingFields { line, .. } | Self::InvalidPercentage { line, .. } => *line,
        }
    }
}

/// Parse a single table line. A blank line is a row with no fields.
pub fn parse_line(line_no: usize, line: &str) -> Result<OverrideRow, OverrideError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < FIELD_COUNT {
        return Err(OverrideError::MissingFields {
            line: line_no,
            found: fields.len(),
        });
    }
    if fields.len() > FIELD_COUNT {
        warn!(
            "disk override line {}: ignoring {} extra field(s)",
            line_no,
            fields.len() - FIELD_COUNT
        );
    }

    let percent = parse_percentage(fields[4]).ok_or_else(|| OverrideError::InvalidPercentage {
        line: line_no,
        value: fields[4].to_string(),
    })?;

    Ok(OverrideRow {
        line: line_no,
        device: fields[0].to_string(),
        total: fields[1].to_string(),
        used: fields[2].to_string(),
        free: fields[3].to_string(),
        percent,
        mount_point: fields[5].to_string(),
    })
}

/// Parse a whole table. The first malformed line fails the table.
pub fn parse_table(content: &str) -> Result<Vec<OverrideRow>, OverrideError> {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| parse_line(idx + 1, line))
        .collect()
}

// `df` prints "45%", so a single trailing percent sign is accepted.
fn parse_percentage(raw: &str) -> Option<f64> {
    let digits = raw.strip_suffix('%').unwrap_or(raw);
    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}
