//! Duration window grouping.
//!
//! Splits a matrix into contiguous row windows using one column as a Unix
//! timestamp (seconds). Elapsed time accumulates from row to row and a window
//! closes as soon as the accumulated duration reaches the configured maximum.
//! Rows left over after the last closed window are not emitted.
//!
//! Text form: `Name,Index,Duration`, e.g. `Duration,0,1m`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::time::Duration;

use crate::dataset::Matrix;
use crate::error::{FitError, FitResult};

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Where the elapsed-time accumulator takes its first reference timestamp from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seed {
    /// Measure the first row against the zero time. Its elapsed duration
    /// saturates, so the first row always closes a window on its own.
    #[default]
    #[serde(alias = "epoch")]
    ZeroTime,
    /// Start from the first row's own timestamp
    FirstRow,
}

impl FromStr for Seed {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zero_time" | "zero-time" | "zerotime" | "epoch" => Ok(Seed::ZeroTime),
            "first_row" | "first-row" | "firstrow" => Ok(Seed::FirstRow),
            other => Err(FitError::ParseError(format!("unknown seed '{}'", other))),
        }
    }
}

/// A "group by elapsed duration" configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouping {
    /// Label of the time column
    pub name: String,
    /// Position of the time column in the matrix
    pub index: usize,
    #[serde(with = "duration_text")]
    pub max: Duration,
    #[serde(default)]
    pub seed: Seed,
}

impl Grouping {
    pub fn new(name: impl Into<String>, index: usize, max: Duration) -> Self {
        Self {
            name: name.into(),
            index,
            max,
            seed: Seed::default(),
        }
    }

    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    /// Parse `Name,Index,Duration`. Missing trailing parts default to index 0
    /// and a zero duration, which `group` rejects.
    pub fn parse(text: &str) -> FitResult<Self> {
        let mut parts = text.split(',');
        let name = parts.next().unwrap_or_default().trim().to_string();
        let index = match parts.next().map(str::trim) {
            Some(idx) if !idx.is_empty() => idx.parse::<usize>().map_err(|_| {
                FitError::ParseError(format!("invalid grouping column index '{}'", idx))
            })?,
            _ => 0,
        };
        let max = match parts.next().map(str::trim) {
            Some(d) if !d.is_empty() => parse_duration(d)?,
            _ => Duration::ZERO,
        };
        if parts.next().is_some() {
            return Err(FitError::ParseError(format!(
                "grouping '{}' has too many parts, expected Name,Index,Duration",
                text
            )));
        }
        Ok(Self::new(name, index, max))
    }

    /// Split `matrix` into closed windows
    pub fn group<'a>(&self, matrix: &'a Matrix) -> FitResult<Vec<Window<'a>>> {
        let max = self.max.as_nanos() as i128;
        if max == 0 {
            return Err(FitError::InvalidGrouping(
                "maximum duration must be greater than zero".to_string(),
            ));
        }
        if self.index >= matrix.column_count() {
            return Err(FitError::InvalidGrouping(format!(
                "time column index {} out of range for {} columns",
                self.index,
                matrix.column_count()
            )));
        }

        // None until a reference timestamp exists
        let mut previous: Option<i64> = match self.seed {
            Seed::ZeroTime => None,
            Seed::FirstRow => matrix.row(0).map(|row| unix_seconds(row[self.index])),
        };
        let mut elapsed: i128 = 0;
        let mut start = 0;
        let mut windows = Vec::new();

        for (k, row) in matrix.rows_iter().enumerate() {
            let current = unix_seconds(row[self.index]);
            elapsed = match previous {
                Some(prev) => elapsed + (current as i128 - prev as i128) * NANOS_PER_SEC,
                None => elapsed.max(max),
            };
            previous = Some(current);
            if elapsed >= max {
                windows.push(Window::new(matrix, start..k + 1));
                start = k + 1;
                elapsed = 0;
            }
        }

        tracing::debug!(
            "Grouped {} rows into {} windows of {} ({} trailing rows dropped)",
            matrix.row_count(),
            windows.len(),
            format_duration(self.max),
            matrix.row_count() - start
        );

        Ok(windows)
    }
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.name, self.index, format_duration(self.max))
    }
}

impl FromStr for Grouping {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Timestamps are whole seconds, any fraction is dropped
fn unix_seconds(value: f64) -> i64 {
    value as i64
}

/// A contiguous run of rows borrowed from a matrix
#[derive(Debug, Clone)]
pub struct Window<'a> {
    matrix: &'a Matrix,
    range: Range<usize>,
}

impl<'a> Window<'a> {
    pub fn new(matrix: &'a Matrix, range: Range<usize>) -> Self {
        let end = range.end.min(matrix.row_count());
        let start = range.start.min(end);
        Self {
            matrix,
            range: start..end,
        }
    }

    /// The whole matrix as one window
    pub fn all(matrix: &'a Matrix) -> Self {
        Self::new(matrix, 0..matrix.row_count())
    }

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.matrix.column_count()
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a [f64]> + '_ {
        let matrix = self.matrix;
        self.range.clone().filter_map(move |i| matrix.row(i))
    }

    /// Values of column `col` across the window's rows
    pub fn column(&self, col: usize) -> Vec<f64> {
        self.rows().filter_map(|row| row.get(col).copied()).collect()
    }
}

// ==================== Duration text ====================

/// Parse a duration such as `2s`, `1m`, `1h30m`, `1.5h` or `500ms`
pub fn parse_duration(text: &str) -> FitResult<Duration> {
    let invalid = || FitError::ParseError(format!("invalid duration '{}'", text));
    let s = text.trim();
    if s.is_empty() {
        return Err(invalid());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total: f64 = 0.0;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if num_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..num_len].parse().map_err(|_| invalid())?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        total += value * nanos_per_unit;
    }

    Ok(Duration::from_nanos(total.round() as u64))
}

/// Render a duration in the same notation `parse_duration` accepts
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }
    let mut out = String::new();
    let secs = duration.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let nanos = duration.subsec_nanos();
    let (ms, us, ns) = (nanos / 1_000_000, (nanos / 1_000) % 1_000, nanos % 1_000);
    for (value, unit) in [
        (h, "h"),
        (m, "m"),
        (s, "s"),
        (ms as u64, "ms"),
        (us as u64, "us"),
        (ns as u64, "ns"),
    ] {
        if value > 0 {
            out.push_str(&format!("{}{}", value, unit));
        }
    }
    out
}

mod duration_text {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
