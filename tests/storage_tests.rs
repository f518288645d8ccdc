//! Column Store Tests
//!
//! Exercises the RocksDB-backed store and the in-memory store through the
//! shared `ColumnStore` trait:
//! - Put / get / overwrite / delete
//! - Listing without matrix payloads
//! - Compressed and uncompressed matrices
//! - Reopening a store from disk

use fit::{
    ColumnStore, Compression, Dataset, DatasetFile, FitError, MemoryStore, Query, Resolver,
    RocksStore,
};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn create_test_store() -> (RocksStore, TempDir) {
    let tmp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = RocksStore::open(tmp_dir.path()).expect("Failed to open store");
    (store, tmp_dir)
}

fn names(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

fn sample(name: &str, rows: usize) -> Dataset {
    Dataset::from_rows(
        name,
        names(&["Time", "Distance", "HeartRate"]),
        (0..rows)
            .map(|i| vec![1_600_000_000.0 + i as f64, i as f64 * 2.5, 120.0 + i as f64])
            .collect(),
    )
    .unwrap()
}

/// Run the same scenario against any backend
fn check_crud<S: ColumnStore>(store: &S) {
    store.put(&sample("run", 4)).unwrap();
    let ds = store.get("run").unwrap();
    assert_eq!(ds, sample("run", 4));

    // Overwrite by name
    store.put(&sample("run", 2)).unwrap();
    assert_eq!(store.get("run").unwrap().len(), 2);

    store.delete("run").unwrap();
    assert!(matches!(store.get("run"), Err(FitError::DatasetNotFound(_))));
    assert!(matches!(
        store.delete("run"),
        Err(FitError::DatasetNotFound(_))
    ));
}

// ============================================================================
// RocksDB Store
// ============================================================================

#[test]
fn test_rocks_crud() {
    let (store, _tmp) = create_test_store();
    check_crud(&store);
}

#[test]
fn test_memory_crud() {
    check_crud(&MemoryStore::new());
}

#[test]
fn test_rocks_uncompressed_crud() {
    let tmp_dir = TempDir::new().unwrap();
    let store = RocksStore::with_compression(tmp_dir.path(), Compression::None).unwrap();
    assert_eq!(store.compression(), Compression::None);
    check_crud(&store);
}

#[test]
fn test_list_sorted_without_payload() {
    let (store, _tmp) = create_test_store();
    store.put(&sample("zeta", 3)).unwrap();
    store.put(&sample("alpha", 1)).unwrap();
    store.put(&sample("mid", 0)).unwrap();

    let listed = store.list().unwrap();
    let listed_names: Vec<&str> = listed.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(listed_names, vec!["alpha", "mid", "zeta"]);

    let zeta = &listed[2];
    assert_eq!(zeta.columns, names(&["Time", "Distance", "HeartRate"]));
    assert_eq!(zeta.stats.rows, 3);
    assert_eq!(zeta.stats.columns, 3);
}

#[test]
fn test_list_empty_store() {
    let (store, _tmp) = create_test_store();
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_empty_dataset_roundtrip() {
    let (store, _tmp) = create_test_store();
    store.put(&sample("empty", 0)).unwrap();

    let ds = store.get("empty").unwrap();
    assert!(ds.is_empty());
    assert_eq!(ds.columns().len(), 3);
    assert_eq!(ds.matrix().dims(), (0, 3));
}

#[test]
fn test_reopen_persists_data() {
    let tmp_dir = TempDir::new().unwrap();
    {
        let store = RocksStore::open(tmp_dir.path()).unwrap();
        store.put(&sample("kept", 5)).unwrap();
        store.flush().unwrap();
    }

    // Reading does not depend on the compression setting used for writing
    let store = RocksStore::with_compression(tmp_dir.path(), Compression::None).unwrap();
    let ds = store.get("kept").unwrap();
    assert_eq!(ds, sample("kept", 5));
    assert_eq!(store.path(), tmp_dir.path());
}

#[test]
fn test_clone_shares_database() {
    let (store, _tmp) = create_test_store();
    let cloned = store.clone();
    store.put(&sample("shared", 1)).unwrap();
    assert_eq!(cloned.get("shared").unwrap().len(), 1);
}

#[test]
fn test_large_matrix_roundtrip() {
    let (store, _tmp) = create_test_store();
    let ds = sample("big", 10_000);
    store.put(&ds).unwrap();
    let back = store.get("big").unwrap();
    assert_eq!(back.matrix().sum(), ds.matrix().sum());
    assert_eq!(back.len(), 10_000);
}

// ============================================================================
// Import Files
// ============================================================================

#[test]
fn test_import_file_roundtrip() {
    let (store, _tmp) = create_test_store();
    let file = DatasetFile::from_json(
        r#"{"name": "laps", "columns": ["Time", "Speed"], "rows": [[1.0, 3.5], [2.0, 4.0]]}"#,
    )
    .unwrap();
    store.put(&file.into_dataset().unwrap()).unwrap();

    let ds = store.get("laps").unwrap();
    assert_eq!(ds.column("Speed").unwrap(), vec![3.5, 4.0]);
}

#[test]
fn test_import_rejects_duplicate_columns() {
    let (store, _tmp) = create_test_store();
    let file = DatasetFile::from_json(
        r#"{"name": "dup", "columns": ["A", "A"], "rows": [[1.0, 2.0]]}"#,
    )
    .unwrap();

    let err = file.into_dataset().unwrap_err();
    assert!(matches!(err, FitError::DuplicateColumn { ref column, .. } if column == "A"));
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn test_import_rejects_ragged_rows() {
    let file = DatasetFile::from_json(
        r#"{"name": "bad", "columns": ["A", "B"], "rows": [[1.0, 2.0], [3.0]]}"#,
    )
    .unwrap();
    assert!(matches!(
        file.into_dataset(),
        Err(FitError::UnequalRowWidth { .. })
    ));
}

// ============================================================================
// Resolver Over RocksDB
// ============================================================================

#[test]
fn test_resolve_from_disk() {
    let (store, _tmp) = create_test_store();
    store.put(&sample("a", 2)).unwrap();
    store.put(&sample("b", 3)).unwrap();

    let query = Query::new(&["a,Distance", "b,HeartRate,Distance"], None, None).unwrap();
    let result = Resolver::new(&store).resolve(&query).unwrap();

    assert_eq!(result.matrix().dims(), (5, 3));
    assert_eq!(
        result.columns(),
        names(&["Distance", "HeartRate", "Distance"]).as_slice()
    );
    assert_eq!(
        result.matrix().column(1).unwrap(),
        vec![120.0, 121.0, 122.0, 0.0, 0.0]
    );
}
