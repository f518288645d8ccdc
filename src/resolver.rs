//! Query resolution over a [`ColumnStore`].
//!
//! Resolving a query stacks the selected column vectors side by side. The
//! result has as many rows as all distinct touched datasets combined, and every
//! column shorter than that is zero-filled from its own row count down. Rows
//! are never matched by key.

use std::collections::HashMap;

use crate::dataset::{Dataset, Matrix};
use crate::error::{FitError, FitResult};
use crate::function::Function;
use crate::query::Query;
use crate::storage::ColumnStore;

/// Name given to every resolved dataset
pub const RESULT_NAME: &str = "QueryResult";

/// One output column: which cached dataset it reads and at which position
struct ColumnSource<'q> {
    dataset: &'q str,
    position: usize,
}

pub struct Resolver<S: ColumnStore> {
    store: S,
}

impl<S: ColumnStore> Resolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Combine every selected column into one zero-padded matrix.
    ///
    /// Each distinct dataset is read from the store once per call. Any missing
    /// dataset or column aborts the whole query.
    pub fn resolve(&self, query: &Query) -> FitResult<Dataset> {
        let mut loaded: HashMap<&str, Dataset> = HashMap::new();
        let mut rows = 0usize;
        let mut columns: Vec<String> = Vec::new();
        let mut sources: Vec<ColumnSource<'_>> = Vec::new();

        for selector in &query.selectors {
            let name = selector.dataset.as_str();
            if !loaded.contains_key(name) {
                let dataset = self.load(name)?;
                rows += dataset.len();
                loaded.insert(name, dataset);
            }
            let dataset = loaded
                .get(name)
                .ok_or_else(|| FitError::DatasetNotFound(name.to_string()))?;

            let requested: Vec<String> = if selector.is_wildcard() {
                dataset.columns().to_vec()
            } else {
                selector.columns.clone()
            };

            for column in requested {
                let position =
                    dataset
                        .column_position(&column)
                        .ok_or_else(|| FitError::ColumnNotFound {
                            dataset: name.to_string(),
                            column: column.clone(),
                        })?;
                sources.push(ColumnSource {
                    dataset: name,
                    position,
                });
                columns.push(column);
            }
        }

        let mut matrix = Matrix::zeros(rows, columns.len());
        for (j, source) in sources.iter().enumerate() {
            let values = loaded
                .get(source.dataset)
                .and_then(|ds| ds.matrix().column(source.position))
                .ok_or_else(|| {
                    FitError::InternalError(format!(
                        "column {} of '{}' vanished during resolve",
                        source.position, source.dataset
                    ))
                })?;
            for (i, value) in values.into_iter().enumerate() {
                matrix.set(i, j, value);
            }
        }

        tracing::debug!(
            "Resolved {} selectors over {} datasets into {} rows x {} columns",
            query.len(),
            loaded.len(),
            rows,
            columns.len()
        );

        Dataset::stacked(RESULT_NAME, columns, matrix)
    }

    /// Resolve `query`, then window and reduce it when it carries a grouping.
    ///
    /// A grouping without a function reduces with `avg`. Without a grouping the
    /// resolved dataset is returned as is.
    pub fn execute(&self, query: &Query) -> FitResult<Dataset> {
        let resolved = self.resolve(query)?;
        let grouping = match &query.grouping {
            Some(grouping) => grouping,
            None => return Ok(resolved),
        };

        let function = query.function.unwrap_or(Function::Avg);
        let reduced = {
            let windows = grouping.group(resolved.matrix())?;
            function.apply(&windows)
        };

        tracing::debug!(
            "Reduced {} rows into {} windows with {}",
            resolved.len(),
            reduced.row_count(),
            function
        );

        Dataset::stacked(resolved.name.clone(), resolved.columns().to_vec(), reduced)
    }

    fn load(&self, name: &str) -> FitResult<Dataset> {
        // Width and unique names are enforced when a Dataset is built
        let dataset = self.store.get(name)?;
        tracing::debug!("Loaded dataset '{}' ({} rows)", name, dataset.len());
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::Grouping;
    use crate::storage::MemoryStore;
    use std::time::Duration;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    fn store() -> MemoryStore {
        let mx1 = Dataset::from_rows(
            "mx1",
            names(&["A", "B", "C", "D"]),
            vec![vec![1.0; 4], vec![2.0; 4]],
        )
        .unwrap();
        let mx2 = Dataset::from_rows(
            "mx2",
            names(&["E", "F", "G", "H"]),
            vec![vec![3.0; 4], vec![2.0; 4], vec![1.0; 4]],
        )
        .unwrap();
        MemoryStore::with_datasets(vec![mx1, mx2])
    }

    #[test]
    fn test_resolve_stacks_and_pads() {
        let store = store();
        let query = Query::new(&["mx1,A,B,C", "mx2,E,F,G"], None, None).unwrap();
        let ds = Resolver::new(&store).resolve(&query).unwrap();

        assert_eq!(ds.name, RESULT_NAME);
        assert_eq!(ds.columns(), names(&["A", "B", "C", "E", "F", "G"]).as_slice());
        assert_eq!(ds.matrix().dims(), (5, 6));
        assert_eq!(ds.column("A").unwrap(), vec![1.0, 2.0, 0.0, 0.0, 0.0]);
        assert_eq!(ds.column("E").unwrap(), vec![3.0, 2.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_resolve_wildcard() {
        let store = store();
        let query = Query::new(&["mx1,*"], None, None).unwrap();
        let ds = Resolver::new(&store).resolve(&query).unwrap();
        assert_eq!(ds.columns(), names(&["A", "B", "C", "D"]).as_slice());
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_repeated_dataset_counts_once() {
        let store = store();
        let query = Query::new(&["mx2,E", "mx2,F", "mx1,A"], None, None).unwrap();
        let ds = Resolver::new(&store).resolve(&query).unwrap();
        assert_eq!(ds.matrix().dims(), (5, 3));
        assert_eq!(ds.column("F").unwrap(), vec![3.0, 2.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_bare_selectors_keep_row_count() {
        let store = store();
        let query = Query::new(&["mx1", "mx2"], None, None).unwrap();
        let ds = Resolver::new(&store).resolve(&query).unwrap();
        assert_eq!(ds.matrix().dims(), (5, 0));
        assert_eq!(ds.matrix().rows_iter().count(), 5);
    }

    #[test]
    fn test_missing_column_and_dataset() {
        let store = store();
        let resolver = Resolver::new(&store);

        let err = resolver
            .resolve(&Query::new(&["mx1,A", "mx2,Z"], None, None).unwrap())
            .unwrap_err();
        assert!(matches!(err, FitError::ColumnNotFound { ref column, .. } if column == "Z"));

        let err = resolver
            .resolve(&Query::new(&["nope,A"], None, None).unwrap())
            .unwrap_err();
        assert!(matches!(err, FitError::DatasetNotFound(ref name) if name == "nope"));
    }

    #[test]
    fn test_execute_without_grouping_is_resolve() {
        let store = store();
        let resolver = Resolver::new(&store);
        let query = Query::new(&["mx1,A"], Some("sum"), None).unwrap();
        assert_eq!(
            resolver.execute(&query).unwrap(),
            resolver.resolve(&query).unwrap()
        );
    }

    #[test]
    fn test_execute_with_grouping() {
        // one row per second from 2001-01-01T00:00:01Z
        let rows = (0..10)
            .map(|i| vec![978_307_201.0 + i as f64, 1.0])
            .collect();
        let ds = Dataset::from_rows("clock", names(&["T", "V"]), rows).unwrap();
        let store = MemoryStore::with_datasets(vec![ds]);

        let query = Query::new(&["clock,T,V"], Some("sum"), None)
            .unwrap()
            .with_grouping(Grouping::new("T", 0, Duration::from_secs(2)));
        let out = Resolver::new(&store).execute(&query).unwrap();

        assert_eq!(out.columns(), names(&["T", "V"]).as_slice());
        assert_eq!(out.len(), 5);
        assert_eq!(out.column("V").unwrap(), vec![1.0, 2.0, 2.0, 2.0, 2.0]);
    }
}
