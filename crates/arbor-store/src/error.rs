use std::io;
use std::path::PathBuf;

use arbor_core::ArborError;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("stored json is unreadable: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("quota exceeded: {size} needed, {quota} allowed")]
    QuotaExceeded { size: String, quota: String },

    #[error("stored state is corrupt: {0}")]
    Corrupt(String),

    #[error("invalid store key: {0:?}")]
    InvalidKey(String),

    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Store failures reach the engine as retryable storage errors.
impl From<StoreError> for ArborError {
    fn from(e: StoreError) -> Self {
        ArborError::storage(e.to_string())
    }
}
