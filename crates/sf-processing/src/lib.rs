//! sf-processing: Waveform processors for SeisForge
//!
//! The waveform-processor state machine and everything built on it: the
//! buffered time-window processor, multi-component operators, the
//! Baer-Kradolfer picker, amplitude processors with their two-horizontal
//! proxies, magnitude processors with parametric and non-parametric
//! calibration, and the supporting services (unit conversion, geographic
//! regions, calibration locales, per-station settings).

pub mod amplitude;
mod error;
mod geo;
mod locale;
pub mod magnitude;
pub mod operator;
pub mod picker;
mod regions;
mod settings;
mod stream_meta;
mod time_window;
mod travel_time;
mod units;
mod waveform;

pub use amplitude::*;
pub use error::*;
pub use geo::*;
pub use magnitude::*;
pub use operator::{FnOp, L2Norm, NCompsOperator, Projection, VectorOp};
pub use picker::{BkPicker, PickAlgorithm, PickEstimate, Picker, PickerConfig, PickResult};
pub use locale::*;
pub use regions::*;
pub use settings::*;
pub use stream_meta::*;
pub use time_window::*;
pub use travel_time::*;
pub use units::*;
pub use waveform::*;
