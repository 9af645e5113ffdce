use thiserror::Error;

/// Errors a delivery sink can report for one batch.
///
/// The bus logs these and moves on; a failed batch is never re-buffered.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("sink rejected batch with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to serialize batch: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {message}")]
    Parse { path: String, message: String },
}
