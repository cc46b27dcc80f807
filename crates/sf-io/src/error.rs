//! Error types for sf-io

use thiserror::Error;

/// IO and wire-format error type
#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record error: {0}")]
    Record(#[from] sf_core::CoreError),

    #[error("truncated mini-SEED record: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("invalid mini-SEED header: {0}")]
    BadHeader(String),

    #[error("unsupported data encoding: {0}")]
    UnsupportedEncoding(u8),

    #[error("corrupt {encoding} payload: {message}")]
    BadPayload {
        encoding: &'static str,
        message: String,
    },

    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("operation timed out")]
    Timeout,

    #[error("operation cancelled")]
    Cancelled,
}

/// Result type alias
pub type IoResult<T> = Result<T, IoError>;
