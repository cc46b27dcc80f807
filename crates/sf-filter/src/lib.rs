//! sf-filter: Time-domain filter library for SeisForge
//!
//! A family of in-place single-channel digital filters behind one trait,
//! plus the textual filter expression language (`BW(4,0.5,5)>>STALTA(1,60)`)
//! that instantiates them.
//!
//! ## Catalogue
//! - `biquad` - TDF-II biquad sections and cascades
//! - `butterworth` - lowpass/highpass/bandpass/bandstop/high+low designs
//! - `average` - sliding-window mean and running-mean highpass
//! - `minmax` - windowed minimum / maximum
//! - `cutoff` - sample-to-sample jump limiter
//! - `stalta` - classic and thresholded STA/LTA detectors
//! - `random` - uniform / normal synthetic noise
//! - `envelope` - narrow band pass + envelope
//! - `restitution` - time-domain seismometer deconvolution
//! - `seismometer` - Wood-Anderson / 5-second response simulation
//! - `taper` - initial cosine taper
//! - `chain` - ordered filter chains
//! - `demux` - per-stream filter instantiation
//! - `parser` - expression grammar and the constructor registry

mod average;
mod biquad;
mod butterworth;
mod chain;
mod cutoff;
mod demux;
mod envelope;
mod error;
mod minmax;
mod parser;
mod random;
mod restitution;
mod seismometer;
mod stalta;
mod taper;

pub use average::*;
pub use biquad::*;
pub use butterworth::*;
pub use chain::*;
pub use cutoff::*;
pub use demux::*;
pub use envelope::*;
pub use error::*;
pub use minmax::*;
pub use parser::*;
pub use random::*;
pub use restitution::*;
pub use seismometer::*;
pub use stalta::*;
pub use taper::*;

use std::any::Any;

use sf_core::{StreamId, Time};

/// Outcome of a [`Filter::set_parameters`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamCode {
    /// All parameters were accepted; carries the number consumed.
    Accepted(usize),
    /// Wrong number of parameters; carries the expected count.
    WrongCount { expected: usize },
    /// A parameter value is out of its valid domain.
    BadValue { index: usize },
}

impl ParamCode {
    #[inline]
    pub fn is_accepted(self) -> bool {
        matches!(self, ParamCode::Accepted(_))
    }
}

/// Uniform in-place filter contract.
///
/// The sampling rate must be configured exactly once before the first
/// `apply`; applying without it fails, reconfiguring after data has flowed
/// fails too. `clone_fresh` copies configuration but not state, so a clone
/// fed the same samples produces the same output.
pub trait Filter: Any + Send + std::fmt::Debug {
    /// Short registry name, e.g. `BW` or `STALTA`.
    fn name(&self) -> &'static str;

    /// Configure the sampling rate in Hz.
    fn set_sampling_rate(&mut self, rate: f64) -> FilterResult<()>;

    /// Filter `data` in place.
    fn apply(&mut self, data: &mut [f64]) -> FilterResult<()>;

    /// Reconfigure from a flat parameter list (expression language hook).
    fn set_parameters(&mut self, params: &[f64]) -> ParamCode;

    /// Drop all transient state, keeping the configuration.
    fn reset(&mut self);

    /// Configuration clone with fresh state.
    fn clone_fresh(&self) -> Box<dyn Filter>;

    /// Time of the first sample of the next `apply` call. Most filters
    /// ignore it; chains forward it.
    fn set_start_time(&mut self, _time: Time) {}

    /// Identity of the stream about to be filtered.
    fn set_stream_id(&mut self, _id: &StreamId) {}

    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn Filter> {
    fn clone(&self) -> Self {
        self.clone_fresh()
    }
}
