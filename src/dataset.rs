//! Datasets and the dense matrix that carries their values.
//!
//! A dataset is a named, ordered list of columns over a row-major matrix of
//! `f64` values. Column order is significant: it defines index-based access
//! for everything downstream (query resolution, grouping, reduction).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{FitError, FitResult};

/// Dense row-major matrix of 64-bit floats
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Create a zero-filled matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Wrap a row-major buffer, checking that it is exactly `rows * cols` long
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> FitResult<Self> {
        if data.len() != rows * cols {
            return Err(FitError::UnequalRowWidth {
                expected: rows * cols,
                actual: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Build a matrix from a list of rows which must all share one width
    pub fn from_rows(rows: Vec<Vec<f64>>) -> FitResult<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in &rows {
            if row.len() != cols {
                return Err(FitError::UnequalRowWidth {
                    expected: cols,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// (rows, columns)
    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Value at (row, col), `None` when out of bounds
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Set the value at (row, col). Out-of-bounds writes are ignored.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        if row < self.rows && col < self.cols {
            self.data[row * self.cols + col] = value;
        }
    }

    /// Borrow one row
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row < self.rows {
            let start = row * self.cols;
            Some(&self.data[start..start + self.cols])
        } else {
            None
        }
    }

    /// Copy one column out of the matrix
    pub fn column(&self, col: usize) -> Option<Vec<f64>> {
        if col >= self.cols {
            return None;
        }
        Some(self.rows_iter().map(|row| row[col]).collect())
    }

    /// Iterate rows in order. A zero-width matrix still yields one empty
    /// slice per row.
    pub fn rows_iter(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.rows).map(move |i| &self.data[i * self.cols..(i + 1) * self.cols])
    }

    /// Raw row-major values
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Sum of every value in the matrix
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }
}

/// Row and column counts of a stored dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub rows: usize,
    pub columns: usize,
}

/// Dataset description without the matrix payload, as returned by listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMeta {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub stats: Stats,
}

/// A named table of named columns
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub name: String,
    columns: Vec<String>,
    matrix: Matrix,
}

impl Dataset {
    /// Create a dataset. Column names must be unique and match the matrix
    /// width one to one.
    pub fn new(name: impl Into<String>, columns: Vec<String>, matrix: Matrix) -> FitResult<Self> {
        let name = name.into();
        let duplicate = {
            let mut seen = HashSet::with_capacity(columns.len());
            columns.iter().find(|c| !seen.insert(c.as_str())).cloned()
        };
        if let Some(column) = duplicate {
            return Err(FitError::DuplicateColumn {
                dataset: name,
                column,
            });
        }
        Self::stacked(name, columns, matrix)
    }

    /// Create a dataset whose column names may repeat, as a resolved query
    /// keeps one output column per selected name
    pub(crate) fn stacked(
        name: impl Into<String>,
        columns: Vec<String>,
        matrix: Matrix,
    ) -> FitResult<Self> {
        let matrix = if matrix.column_count() == columns.len() {
            matrix
        } else if matrix.dims() == (0, 0) {
            Matrix::zeros(0, columns.len())
        } else {
            return Err(FitError::UnequalRowWidth {
                expected: columns.len(),
                actual: matrix.column_count(),
            });
        };
        Ok(Self {
            name: name.into(),
            columns,
            matrix,
        })
    }

    /// Convenience constructor from row vectors
    pub fn from_rows(
        name: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> FitResult<Self> {
        let matrix = if rows.is_empty() {
            Matrix::zeros(0, columns.len())
        } else {
            Matrix::from_rows(rows)?
        };
        Self::new(name, columns, matrix)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn into_matrix(self) -> Matrix {
        self.matrix
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.matrix.row_count()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }

    /// Index of a column by name
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of a named column
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        self.column_position(name)
            .and_then(|pos| self.matrix.column(pos))
    }

    pub fn stats(&self) -> Stats {
        Stats {
            rows: self.matrix.row_count(),
            columns: self.columns.len(),
        }
    }

    pub fn metadata(&self) -> DatasetMeta {
        DatasetMeta {
            name: self.name.clone(),
            columns: self.columns.clone(),
            stats: self.stats(),
        }
    }
}

/// Import form read by `fit write`:
/// `{"name": .., "columns": [..], "rows": [[..], ..]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetFile {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<f64>>,
}

impl DatasetFile {
    pub fn from_json(text: &str) -> FitResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Validate into a dataset
    pub fn into_dataset(self) -> FitResult<Dataset> {
        Dataset::from_rows(self.name, self.columns, self.rows)
    }
}
