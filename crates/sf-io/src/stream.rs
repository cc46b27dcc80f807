//! Record stream interface
//!
//! A pull source of records, addressable by stream id and time window.
//! Sources that block on I/O poll the cancellation token between
//! operations and surface `Cancelled` once it fires.

use std::sync::Arc;

use sf_core::{CancellationToken, Record, StreamId, TimeWindow};

use crate::IoResult;

pub trait RecordStream: Send {
    /// Subscribe a stream, optionally restricted to a time window.
    fn add_stream(&mut self, id: &StreamId, window: Option<TimeWindow>) -> IoResult<()>;

    /// Restrict all subscribed streams without their own window.
    fn set_time_window(&mut self, window: TimeWindow) -> IoResult<()>;

    /// The next record, or `None` when the source is exhausted.
    fn next_record(&mut self) -> IoResult<Option<Arc<Record>>>;

    /// Release all resources. Idempotent.
    fn close(&mut self);

    /// Install a cancellation token. Sources that never block may ignore
    /// it.
    fn set_cancellation(&mut self, _token: CancellationToken) {}
}
