use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::{ColumnStore, Compression};
use crate::dataset::{Dataset, DatasetMeta, Matrix};
use crate::error::{FitError, FitResult};

/// Column family holding JSON `DatasetMeta` by dataset name
const DATASETS_CF: &str = "datasets";
/// Column family holding encoded matrices by dataset name
const MATRICES_CF: &str = "matrices";

/// Leading byte of a stored matrix, so readers don't depend on the current setting
const TAG_RAW: u8 = 0;
const TAG_LZ4: u8 = 1;

#[derive(Serialize, Deserialize)]
struct MatrixRecord {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

/// Column store backed by RocksDB
pub struct RocksStore {
    /// RocksDB instance; writers take the write half of the lock
    db: Arc<RwLock<DB>>,
    path: PathBuf,
    compression: Compression,
}

impl Clone for RocksStore {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            path: self.path.clone(),
            compression: self.compression,
        }
    }
}

impl std::fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksStore")
            .field("path", &self.path)
            .field("compression", &self.compression)
            .finish()
    }
}

impl RocksStore {
    /// Open (or create) a store with LZ4-compressed matrices
    pub fn open<P: AsRef<Path>>(data_dir: P) -> FitResult<Self> {
        Self::with_compression(data_dir, Compression::default())
    }

    pub fn with_compression<P: AsRef<Path>>(
        data_dir: P,
        compression: Compression,
    ) -> FitResult<Self> {
        let path = data_dir.as_ref().to_path_buf();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        // Keep fewer LOG files (RocksDB info logs, not WALs)
        opts.set_keep_log_file_num(5);

        let cf_descriptors = [DATASETS_CF, MATRICES_CF]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, &path, cf_descriptors)
            .map_err(|e| FitError::InternalError(format!("Failed to open RocksDB: {}", e)))?;

        tracing::info!("Opened column store at {}", path.display());

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
            path,
            compression,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> FitResult<()> {
        let db = self
            .db
            .read()
            .map_err(|e| FitError::InternalError(e.to_string()))?;
        db.flush()
            .map_err(|e| FitError::InternalError(format!("Failed to flush: {}", e)))
    }

    fn encode_matrix(&self, matrix: &Matrix) -> FitResult<Vec<u8>> {
        let (rows, cols) = matrix.dims();
        let record = MatrixRecord {
            rows,
            cols,
            data: matrix.as_slice().to_vec(),
        };
        let bytes = bincode::serialize(&record)?;

        let mut out = Vec::with_capacity(bytes.len() + 1);
        match self.compression {
            Compression::None => {
                out.push(TAG_RAW);
                out.extend_from_slice(&bytes);
            }
            Compression::Lz4 => {
                out.push(TAG_LZ4);
                out.extend_from_slice(&compress_prepend_size(&bytes));
            }
        }
        Ok(out)
    }

    fn decode_matrix(bytes: &[u8]) -> FitResult<Matrix> {
        let (tag, payload) = bytes
            .split_first()
            .ok_or_else(|| FitError::EncodingError("empty matrix entry".to_string()))?;
        let raw = match *tag {
            TAG_RAW => payload.to_vec(),
            TAG_LZ4 => decompress_size_prepended(payload).map_err(|e| {
                FitError::EncodingError(format!("LZ4 decompression failed: {}", e))
            })?,
            other => {
                return Err(FitError::EncodingError(format!(
                    "unknown matrix encoding tag {}",
                    other
                )))
            }
        };
        let record: MatrixRecord = bincode::deserialize(&raw)?;
        Matrix::from_vec(record.rows, record.cols, record.data)
    }
}

fn missing_cf(name: &str) -> FitError {
    FitError::InternalError(format!("Column family '{}' not found", name))
}

impl ColumnStore for RocksStore {
    fn get(&self, name: &str) -> FitResult<Dataset> {
        let db = self
            .db
            .read()
            .map_err(|e| FitError::InternalError(e.to_string()))?;
        let meta_cf = db.cf_handle(DATASETS_CF).ok_or_else(|| missing_cf(DATASETS_CF))?;
        let matrix_cf = db.cf_handle(MATRICES_CF).ok_or_else(|| missing_cf(MATRICES_CF))?;

        let raw = db
            .get_cf(meta_cf, name.as_bytes())?
            .ok_or_else(|| FitError::DatasetNotFound(name.to_string()))?;
        let meta: DatasetMeta = serde_json::from_slice(&raw)?;

        let matrix = match db.get_cf(matrix_cf, name.as_bytes())? {
            Some(bytes) => Self::decode_matrix(&bytes)?,
            None => {
                tracing::warn!("Dataset '{}' has no stored matrix, reading it as empty", name);
                Matrix::zeros(0, meta.columns.len())
            }
        };

        Dataset::new(meta.name, meta.columns, matrix)
    }

    fn put(&self, dataset: &Dataset) -> FitResult<()> {
        let meta_bytes = serde_json::to_vec(&dataset.metadata())?;
        let matrix_bytes = self.encode_matrix(dataset.matrix())?;

        let db = self
            .db
            .write()
            .map_err(|e| FitError::InternalError(e.to_string()))?;
        let meta_cf = db.cf_handle(DATASETS_CF).ok_or_else(|| missing_cf(DATASETS_CF))?;
        let matrix_cf = db.cf_handle(MATRICES_CF).ok_or_else(|| missing_cf(MATRICES_CF))?;

        let mut batch = WriteBatch::default();
        batch.put_cf(meta_cf, dataset.name.as_bytes(), &meta_bytes);
        batch.put_cf(matrix_cf, dataset.name.as_bytes(), &matrix_bytes);
        db.write(batch)?;

        tracing::debug!(
            "Stored dataset '{}' ({} rows x {} columns)",
            dataset.name,
            dataset.len(),
            dataset.columns().len()
        );
        Ok(())
    }

    fn delete(&self, name: &str) -> FitResult<()> {
        let db = self
            .db
            .write()
            .map_err(|e| FitError::InternalError(e.to_string()))?;
        let meta_cf = db.cf_handle(DATASETS_CF).ok_or_else(|| missing_cf(DATASETS_CF))?;
        let matrix_cf = db.cf_handle(MATRICES_CF).ok_or_else(|| missing_cf(MATRICES_CF))?;

        if db.get_cf(meta_cf, name.as_bytes())?.is_none() {
            return Err(FitError::DatasetNotFound(name.to_string()));
        }

        let mut batch = WriteBatch::default();
        batch.delete_cf(meta_cf, name.as_bytes());
        batch.delete_cf(matrix_cf, name.as_bytes());
        db.write(batch)?;

        tracing::debug!("Deleted dataset '{}'", name);
        Ok(())
    }

    fn list(&self) -> FitResult<Vec<DatasetMeta>> {
        let db = self
            .db
            .read()
            .map_err(|e| FitError::InternalError(e.to_string()))?;
        let meta_cf = db.cf_handle(DATASETS_CF).ok_or_else(|| missing_cf(DATASETS_CF))?;

        db.iterator_cf(meta_cf, IteratorMode::Start)
            .map(|item| {
                let (_, value) = item?;
                Ok(serde_json::from_slice::<DatasetMeta>(&value)?)
            })
            .collect()
    }
}
