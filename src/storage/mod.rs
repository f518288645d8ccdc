//! Column store: persistence of datasets by name.
//!
//! The query engine only reads through [`ColumnStore`]; writes, deletes and
//! listings are used by the CLI and tests. Isolation between concurrent
//! readers and the single writer is the store's job.

pub mod engine;
pub mod memory;

pub use engine::RocksStore;
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::dataset::{Dataset, DatasetMeta};
use crate::error::{FitError, FitResult};

/// Storage backend holding datasets by name
pub trait ColumnStore {
    /// Read a dataset with its matrix
    fn get(&self, name: &str) -> FitResult<Dataset>;

    /// Insert or replace a dataset
    fn put(&self, dataset: &Dataset) -> FitResult<()>;

    /// Remove a dataset
    fn delete(&self, name: &str) -> FitResult<()>;

    /// Describe every stored dataset, ordered by name, without matrices
    fn list(&self) -> FitResult<Vec<DatasetMeta>>;
}

impl<S: ColumnStore + ?Sized> ColumnStore for &S {
    fn get(&self, name: &str) -> FitResult<Dataset> {
        (**self).get(name)
    }

    fn put(&self, dataset: &Dataset) -> FitResult<()> {
        (**self).put(dataset)
    }

    fn delete(&self, name: &str) -> FitResult<()> {
        (**self).delete(name)
    }

    fn list(&self) -> FitResult<Vec<DatasetMeta>> {
        (**self).list()
    }
}

/// Compression applied to stored matrices
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    #[default]
    Lz4,
}

impl FromStr for Compression {
    type Err = FitError;

    fn from_str(s: &str) -> FitResult<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "lz4" => Ok(Compression::Lz4),
            other => Err(FitError::ParseError(format!(
                "unknown compression '{}'",
                other
            ))),
        }
    }
}
