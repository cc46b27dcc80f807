//! Processor status and error types
//!
//! Typed codes throughout, never panics for flow control. Configuration
//! errors are fatal and surface synchronously at setup time; input and
//! result conditions become the termination cause of the processor.

use thiserror::Error;

/// Life-cycle of a waveform processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    WaitingForData,
    InProgress,
    Finished,
    Terminated(TerminationCause),
}

impl Status {
    /// True while the processor still accepts data.
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, Status::WaitingForData | Status::InProgress)
    }
}

/// Why a processor stopped without (or after) producing a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationCause {
    LowSnr,
    BadTimeReference,
    DataClipped,
    DataOutlier,
    MissingGain,
    MissingResponse,
    IncompleteData,
    ProcessorError,
    Unspecified,
}

/// Configuration errors, fatal at setup time.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    #[error("bad parameter {name}: {message}")]
    BadParameter { name: String, message: String },

    #[error(transparent)]
    UnknownFilter(#[from] sf_filter::FilterError),
}

/// Result codes of a magnitude computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagnitudeStatus {
    DistanceOutOfRange,
    DepthOutOfRange,
    AmplitudeOutOfRange,
    PeriodOutOfRange,
    SnrOutOfRange,
    InvalidAmplitudeUnit,
    Error,
}

/// Errors surfaced by the multi-component operators.
#[derive(Error, Debug)]
pub enum OperatorError {
    #[error("sampling rate mismatch: {0} vs {1}")]
    SampleRateMismatch(f64, f64),

    #[error("streams are not sample-aligned (offset {offset_seconds} s)")]
    AlignmentMismatch { offset_seconds: f64 },

    #[error("record belongs to a different sensor: {0}")]
    ForeignStream(String),

    #[error("unexpected component '{0}'")]
    UnknownComponent(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
