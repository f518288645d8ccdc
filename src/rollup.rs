//! Time-stamped series and calendar rollups.
//!
//! A [`Series`] is an append-only list of rows, each carrying a UTC timestamp
//! and one value per key. Rolling a series up by [`Precision`] collapses all
//! rows sharing a calendar bucket into the first row of that bucket.
//!
//! Bucket keys are coarse composite integers, not calendar ordinals:
//! - year: `year`
//! - month: `year * 12 + month`
//! - day: `year * 12 + month * 31 + day`
//!
//! Buckets are kept in order of first appearance.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::dataset::Dataset;
use crate::error::{FitError, FitResult};
use crate::function::Function;

/// Calendar precision of a rollup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Day,
    Month,
    Year,
    #[default]
    None,
}

impl FromStr for Precision {
    type Err = FitError;

    fn from_str(s: &str) -> FitResult<Self> {
        match s.to_lowercase().as_str() {
            "day" | "days" => Ok(Precision::Day),
            "month" | "months" => Ok(Precision::Month),
            "year" | "years" => Ok(Precision::Year),
            "none" => Ok(Precision::None),
            other => Err(FitError::ParseError(format!(
                "unknown precision '{}', expected day, month, year or none",
                other
            ))),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Precision::Day => "day",
            Precision::Month => "month",
            Precision::Year => "year",
            Precision::None => "none",
        };
        f.write_str(s)
    }
}

/// Bucket key of `time` at `precision`. `None` has no bucket.
pub fn bucket_key(time: &DateTime<Utc>, precision: Precision) -> Option<i64> {
    let year = time.year() as i64;
    let month = time.month() as i64;
    let day = time.day() as i64;
    match precision {
        Precision::Year => Some(year),
        Precision::Month => Some(year * 12 + month),
        Precision::Day => Some(year * 12 + month * 31 + day),
        Precision::None => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub time: DateTime<Utc>,
    pub values: Vec<f64>,
}

/// Rows of a series that share one calendar bucket
#[derive(Debug, Clone)]
pub struct Bucket<'a> {
    pub key: i64,
    pub rows: Vec<&'a Row>,
}

impl Bucket<'_> {
    /// Values of key position `index` across the bucket
    pub fn values(&self, index: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.values.get(index).copied())
            .collect()
    }
}

/// Rows are only appended through [`Series::add`], so every row has one value
/// per key.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Series {
    pub name: String,
    keys: Vec<String>,
    rows: Vec<Row>,
}

impl Series {
    pub fn new(name: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            name: name.into(),
            keys,
            rows: Vec::new(),
        }
    }

    /// Build a series from a dataset, reading `time_column` as Unix seconds.
    /// Every other column becomes a value key, in dataset order.
    pub fn from_dataset(dataset: &Dataset, time_column: &str) -> FitResult<Self> {
        let time_index =
            dataset
                .column_position(time_column)
                .ok_or_else(|| FitError::ColumnNotFound {
                    dataset: dataset.name.clone(),
                    column: time_column.to_string(),
                })?;

        let keys = dataset
            .columns()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != time_index)
            .map(|(_, name)| name.clone())
            .collect();
        let mut series = Series::new(dataset.name.clone(), keys);

        for row in dataset.matrix().rows_iter() {
            let secs = row[time_index] as i64;
            let time = DateTime::from_timestamp(secs, 0).ok_or_else(|| {
                FitError::ParseError(format!("timestamp {} is out of range", secs))
            })?;
            let values = row
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != time_index)
                .map(|(_, v)| *v)
                .collect();
            series.add(time, values)?;
        }

        Ok(series)
    }

    /// Append a row. Rows stay in call order.
    pub fn add(&mut self, time: DateTime<Utc>, values: Vec<f64>) -> FitResult<()> {
        if values.len() != self.keys.len() {
            return Err(FitError::UnequalRowWidth {
                expected: self.keys.len(),
                actual: values.len(),
            });
        }
        self.rows.push(Row { time, values });
        Ok(())
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a value key
    pub fn position(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    /// All values of one key, in row order
    pub fn values(&self, key: &str) -> Option<Vec<f64>> {
        let index = self.position(key)?;
        Some(
            self.rows
                .iter()
                .filter_map(|row| row.values.get(index).copied())
                .collect(),
        )
    }

    /// Timestamp of the first row
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.rows.first().map(|row| row.time)
    }

    /// Stable sort of the rows by time
    pub fn sort_by_time(&mut self) {
        self.rows.sort_by_key(|row| row.time);
    }

    /// Group rows into calendar buckets. With `Precision::None` every row is
    /// its own bucket, keyed by its position.
    pub fn buckets(&self, precision: Precision) -> Vec<Bucket<'_>> {
        let mut order: HashMap<i64, usize> = HashMap::new();
        let mut buckets: Vec<Bucket<'_>> = Vec::new();

        for (i, row) in self.rows.iter().enumerate() {
            let key = bucket_key(&row.time, precision).unwrap_or(i as i64);
            match order.get(&key) {
                Some(&slot) => buckets[slot].rows.push(row),
                None => {
                    order.insert(key, buckets.len());
                    buckets.push(Bucket {
                        key,
                        rows: vec![row],
                    });
                }
            }
        }

        buckets
    }

    /// Collapse rows sharing a bucket into the bucket's first row, adding the
    /// values of later rows element-wise. The first row's time is kept.
    pub fn rollup(&self, precision: Precision) -> Series {
        if precision == Precision::None {
            return self.clone();
        }

        let rows: Vec<Row> = self
            .buckets(precision)
            .into_iter()
            .filter_map(|bucket| {
                let (first, rest) = bucket.rows.split_first()?;
                let mut acc = (*first).clone();
                for row in rest {
                    for (sum, value) in acc.values.iter_mut().zip(&row.values) {
                        *sum += value;
                    }
                }
                Some(acc)
            })
            .collect();

        tracing::debug!(
            "Rolled up {} rows of '{}' by {} into {} rows",
            self.rows.len(),
            self.name,
            precision,
            rows.len()
        );

        Series {
            name: self.name.clone(),
            keys: self.keys.clone(),
            rows,
        }
    }

    /// Reduce every bucket to one row with `function`, stamped with the time
    /// of the bucket's first row
    pub fn aggregate(&self, precision: Precision, function: Function) -> Series {
        let rows = self
            .buckets(precision)
            .iter()
            .filter_map(|bucket| {
                let first = bucket.rows.first()?;
                Some(Row {
                    time: first.time,
                    values: (0..self.keys.len())
                        .map(|i| function.reduce(&bucket.values(i)))
                        .collect(),
                })
            })
            .collect();

        Series {
            name: self.name.clone(),
            keys: self.keys.clone(),
            rows,
        }
    }
}
