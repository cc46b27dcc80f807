//! sf-model: Public objects for the SeisForge processing stack
//!
//! Picks, amplitudes and magnitudes carry a stable public id and are
//! tracked by a process-wide weak registry, so that any holder of an id can
//! recover the object for as long as somebody keeps it alive. The
//! time-span cache layers a freshness-bounded strong reference on top.

mod cache;
mod objects;
mod public_object;

pub use cache::*;
pub use objects::*;
pub use public_object::*;
