//! Reducers applied per column to windows of rows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::dataset::Matrix;
use crate::error::{FitError, FitResult};
use crate::grouping::Window;

/// Named column reduction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Function {
    Sum,
    Min,
    Max,
    Avg,
}

impl Function {
    pub fn name(&self) -> &'static str {
        match self {
            Function::Sum => "sum",
            Function::Min => "min",
            Function::Max => "max",
            Function::Avg => "avg",
        }
    }

    /// Reduce a column of values to one scalar.
    ///
    /// An empty input sums to `0.0`; `avg`, `min` and `max` of nothing are `NaN`.
    pub fn reduce(&self, values: &[f64]) -> f64 {
        match self {
            Function::Sum => values.iter().sum(),
            Function::Avg => {
                if values.is_empty() {
                    f64::NAN
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            }
            Function::Min => sorted(values).first().copied().unwrap_or(f64::NAN),
            Function::Max => sorted(values).last().copied().unwrap_or(f64::NAN),
        }
    }

    /// One output row per window, columns in input order
    pub fn apply(&self, windows: &[Window<'_>]) -> Matrix {
        let cols = match windows.first() {
            Some(w) => w.column_count(),
            None => return Matrix::zeros(0, 0),
        };
        let mut result = Matrix::zeros(windows.len(), cols);
        for (i, window) in windows.iter().enumerate() {
            for j in 0..cols {
                result.set(i, j, self.reduce(&window.column(j)));
            }
        }
        result
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut values = values.to_vec();
    values.sort_by(f64::total_cmp);
    values
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Function {
    type Err = FitError;

    fn from_str(s: &str) -> FitResult<Self> {
        match s.to_lowercase().as_str() {
            "sum" => Ok(Function::Sum),
            "min" => Ok(Function::Min),
            "max" => Ok(Function::Max),
            "avg" | "average" => Ok(Function::Avg),
            other => Err(FitError::ParseError(format!(
                "unknown function '{}', expected one of sum, min, max, avg",
                other
            ))),
        }
    }
}
