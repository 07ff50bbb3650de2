//! Store error type
//!
//! Only infrastructure failures surface as errors: file I/O, JSON parsing
//! and SQL. Lookup misses are modeled as `Option`/`bool` returns and
//! malformed fields degrade to sentinel defaults during deserialization.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse JSON cache {file}: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("sqlite error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("sqlite database is not available")]
    DatabaseUnavailable,
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(file: impl Into<String>, source: serde_json::Error) -> Self {
        StoreError::Json {
            file: file.into(),
            source,
        }
    }
}
