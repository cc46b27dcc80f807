//! Error types for sf-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid sampling rate: {0}")]
    InvalidSamplingRate(f64),

    #[error("invalid timing quality: {0} (expected 0..=100)")]
    InvalidTimingQuality(u8),

    #[error("invalid stream id: {0}")]
    InvalidStreamId(String),

    #[error("record has no samples")]
    EmptyRecord,

    #[error("record out of order: {0}")]
    OutOfOrder(String),
}

/// Result type alias
pub type CoreResult<T> = Result<T, CoreError>;
