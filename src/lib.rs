pub mod config;
pub mod dataset;
pub mod error;
pub mod function;
pub mod grouping;
pub mod query;
pub mod resolver;
pub mod rollup;
pub mod storage;

pub use config::Config;
pub use dataset::{Dataset, DatasetFile, DatasetMeta, Matrix, Stats};
pub use error::{FitError, FitResult};
pub use function::Function;
pub use grouping::{format_duration, parse_duration, Grouping, Seed, Window};
pub use query::{Query, Selector, WILDCARD};
pub use resolver::{Resolver, RESULT_NAME};
pub use rollup::{bucket_key, Bucket, Precision, Row, Series};
pub use storage::{ColumnStore, Compression, MemoryStore, RocksStore};
