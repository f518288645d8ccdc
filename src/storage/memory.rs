use std::collections::BTreeMap;
use std::sync::RwLock;

use super::ColumnStore;
use crate::dataset::{Dataset, DatasetMeta};
use crate::error::{FitError, FitResult};

/// In-memory column store for tests and scratch work
#[derive(Debug, Default)]
pub struct MemoryStore {
    datasets: RwLock<BTreeMap<String, Dataset>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with `datasets`
    pub fn with_datasets(datasets: Vec<Dataset>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.datasets.write() {
            for ds in datasets {
                map.insert(ds.name.clone(), ds);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.datasets.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ColumnStore for MemoryStore {
    fn get(&self, name: &str) -> FitResult<Dataset> {
        let map = self
            .datasets
            .read()
            .map_err(|e| FitError::InternalError(e.to_string()))?;
        map.get(name)
            .cloned()
            .ok_or_else(|| FitError::DatasetNotFound(name.to_string()))
    }

    fn put(&self, dataset: &Dataset) -> FitResult<()> {
        let mut map = self
            .datasets
            .write()
            .map_err(|e| FitError::InternalError(e.to_string()))?;
        map.insert(dataset.name.clone(), dataset.clone());
        Ok(())
    }

    fn delete(&self, name: &str) -> FitResult<()> {
        let mut map = self
            .datasets
            .write()
            .map_err(|e| FitError::InternalError(e.to_string()))?;
        map.remove(name)
            .map(|_| ())
            .ok_or_else(|| FitError::DatasetNotFound(name.to_string()))
    }

    fn list(&self) -> FitResult<Vec<DatasetMeta>> {
        let map = self
            .datasets
            .read()
            .map_err(|e| FitError::InternalError(e.to_string()))?;
        Ok(map.values().map(Dataset::metadata).collect())
    }
}
