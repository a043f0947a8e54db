//! Error types for the speed heatmap

use thiserror::Error;

/// Errors that can occur while loading, querying or rendering speed data
#[derive(Debug, Error)]
pub enum HeatmapError {
    #[error("Failed to establish query on '{collection}': {reason}")]
    QueryEstablish { collection: String, reason: String },

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse documents: {0}")]
    ParseError(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Store does not accept writes to '{0}'")]
    ReadOnlyStore(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}
