use thiserror::Error;

/// Failures while turning a file into import records.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unsupported import format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("unexpected document shape: {0}")]
    Shape(String),
}

impl ImportError {
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }
}

/// Failures while rendering an export document.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("csv output is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("csv writer could not be flushed: {0}")]
    Flush(String),
}
