use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum WcrError {
    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("region out of bounds: {0}")]
    RegionOutOfBounds(String),

    #[error("unknown table '{0}'. Run `wcr tables` to list the known tables and labels")]
    SchemaUnknown(String),

    #[error("document '{reference}' is unavailable: {reason}")]
    DocumentUnavailable { reference: String, reason: String },

    #[error("{service} is unavailable: {reason}")]
    ExternalServiceUnavailable { service: String, reason: String },

    #[error(
        "{tool} not found. Install poppler-utils/tesseract or set the path in the config file"
    )]
    ToolNotFound { tool: String },

    #[error("{tool} failed with exit code {code}: {stderr}")]
    ToolFailed {
        tool: String,
        code: i32,
        stderr: String,
    },

    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("canonical store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("failed to load config from {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WcrError {
    pub(crate) fn service_unavailable(service: &str, reason: impl Into<String>) -> Self {
        WcrError::ExternalServiceUnavailable {
            service: service.to_string(),
            reason: reason.into(),
        }
    }
}
