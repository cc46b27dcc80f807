//! sf-core: Shared types for the SeisForge processing stack
//!
//! This crate provides the foundational types used across all SeisForge
//! crates: microsecond-precision time, stream identifiers, waveform records
//! and record sequences, and the cancellation token handed to blocking
//! record sources.

mod cancel;
mod error;
mod record;
mod sequence;
mod stream_id;
mod time;

pub use cancel::*;
pub use error::*;
pub use record::*;
pub use sequence::*;
pub use stream_id::*;
pub use time::*;
