//! Error types for sf-filter

use thiserror::Error;

/// Filter error type
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("sampling rate not initialized")]
    SamplingRateNotSet,

    #[error("sampling rate already locked by processed data")]
    SamplingRateLocked,

    #[error("invalid sampling rate: {0}")]
    InvalidSamplingRate(f64),

    #[error("invalid filter parameter: {0}")]
    InvalidParameter(String),

    #[error("corner frequency {frequency} Hz not below Nyquist ({nyquist} Hz)")]
    FrequencyAboveNyquist { frequency: f64, nyquist: f64 },

    #[error("unknown filter '{name}' at offset {offset}")]
    UnknownFilter { name: String, offset: usize },

    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },
}

/// Result type alias
pub type FilterResult<T> = Result<T, FilterError>;
