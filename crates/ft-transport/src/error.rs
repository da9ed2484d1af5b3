use ft_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("connect failed: {0}")]
    Connect(String),

    #[error("connect timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),

    #[error("channel closed")]
    Closed,

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no tokio runtime to run the transport on")]
    NoRuntime,
}

pub type TransportResult<T> = Result<T, TransportError>;
