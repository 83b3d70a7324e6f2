//! Error types for the renderer facade

use last_change::CollectorError;
use output::OutputError;
use state_store::StoreError;

/// Errors returned by renderer operations
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("LastChange error: {0}")]
    Collector(#[from] CollectorError),

    #[error("Variable error: {0}")]
    Store(#[from] StoreError),

    /// A time value that is not `H:MM:SS[.fff]`
    #[error("Invalid time value: '{0}'")]
    InvalidTime(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Track metadata encoding failed: {0}")]
    Metadata(#[from] quick_xml::Error),
}

/// Result type for renderer operations
pub type Result<T> = std::result::Result<T, RendererError>;
