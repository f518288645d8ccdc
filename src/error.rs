use thiserror::Error;

#[derive(Error, Debug)]
pub enum FitError {
    #[error("Dataset '{0}' not found")]
    DatasetNotFound(String),

    #[error("Column '{column}' not found in dataset '{dataset}'")]
    ColumnNotFound { dataset: String, column: String },

    #[error("Column '{column}' appears more than once in dataset '{dataset}'")]
    DuplicateColumn { dataset: String, column: String },

    #[error("Invalid grouping: {0}")]
    InvalidGrouping(String),

    #[error("Unequal row width: expected {expected} values, got {actual}")]
    UnequalRowWidth { expected: usize, actual: usize },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type FitResult<T> = Result<T, FitError>;

impl serde::Serialize for FitError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl From<rocksdb::Error> for FitError {
    fn from(err: rocksdb::Error) -> Self {
        FitError::InternalError(err.into_string())
    }
}

impl From<bincode::Error> for FitError {
    fn from(err: bincode::Error) -> Self {
        FitError::EncodingError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = FitError::DatasetNotFound("mx3".to_string());
        assert_eq!(err.to_string(), "Dataset 'mx3' not found");

        let err = FitError::ColumnNotFound {
            dataset: "mx1".to_string(),
            column: "H".to_string(),
        };
        assert_eq!(err.to_string(), "Column 'H' not found in dataset 'mx1'");

        let err = FitError::UnequalRowWidth {
            expected: 4,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Unequal row width: expected 4 values, got 3"
        );
    }

    #[test]
    fn test_error_serializes_as_message() {
        let err = FitError::InvalidGrouping("max duration must be positive".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"Invalid grouping: max duration must be positive\"");
    }
}
