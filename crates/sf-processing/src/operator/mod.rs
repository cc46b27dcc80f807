//! Multi-component operators
//!
//! Aligns samples across the 2 or 3 streams of one sensor, applies a
//! per-sample vector function, and republishes the result as a synthesized
//! record under a caller-supplied channel code. Gaps in any input produce a
//! corresponding gap in the output; a stream whose partners never show up
//! is dropped after the alignment timeout.

mod ops;

pub use ops::*;

use std::collections::VecDeque;
use std::sync::Arc;

use sf_core::{Record, StreamId, Time, TimeSpan};

use crate::OperatorError;

/// A pure per-sample function over n aligned components.
pub trait VectorOp: Send {
    fn apply(&self, components: &[f64]) -> f64;
}

type StoreFunc = Box<dyn FnMut(Arc<Record>) -> bool + Send>;

#[derive(Debug)]
struct Segment {
    start: Time,
    samples: Vec<f64>,
}

impl Segment {
    fn end(&self, rate: f64) -> Time {
        self.start + TimeSpan::from_samples(self.samples.len(), rate)
    }
}

#[derive(Debug, Default)]
struct ChannelBuffer {
    segments: VecDeque<Segment>,
}

pub struct NCompsOperator {
    components: Vec<String>,
    op: Box<dyn VectorOp>,
    output_channel: String,
    alignment_timeout: TimeSpan,
    buffers: Vec<ChannelBuffer>,
    rate: Option<f64>,
    sensor: Option<StreamId>,
    latest_end: Option<Time>,
    store: Option<StoreFunc>,
}

impl NCompsOperator {
    /// `components` are the expected channel codes (2 or 3 of them);
    /// `output_channel` labels the synthesized records.
    pub fn new(
        components: Vec<String>,
        op: Box<dyn VectorOp>,
        output_channel: impl Into<String>,
    ) -> Self {
        let n = components.len();
        Self {
            components,
            op,
            output_channel: output_channel.into(),
            alignment_timeout: TimeSpan::from_seconds(60.0),
            buffers: (0..n).map(|_| ChannelBuffer::default()).collect(),
            rate: None,
            sensor: None,
            latest_end: None,
            store: None,
        }
    }

    pub fn set_alignment_timeout(&mut self, timeout: TimeSpan) {
        self.alignment_timeout = timeout;
    }

    /// Sink for synthesized records.
    pub fn set_store_func(&mut self, store: impl FnMut(Arc<Record>) -> bool + Send + 'static) {
        self.store = Some(Box::new(store));
    }

    pub fn feed(&mut self, record: &Arc<Record>) -> Result<(), OperatorError> {
        let index = self
            .components
            .iter()
            .position(|c| c == record.stream_id().channel())
            .ok_or_else(|| {
                OperatorError::UnknownComponent(record.stream_id().channel().to_string())
            })?;

        match &self.sensor {
            Some(sensor) if !sensor.same_sensor(record.stream_id()) => {
                return Err(OperatorError::ForeignStream(record.stream_id().to_string()));
            }
            Some(_) => {}
            None => self.sensor = Some(record.stream_id().clone()),
        }

        let rate = record.sampling_rate();
        match self.rate {
            Some(expected) if (expected - rate).abs() > 1e-6 => {
                return Err(OperatorError::SampleRateMismatch(expected, rate));
            }
            Some(_) => {}
            None => self.rate = Some(rate),
        }

        // Append, merging into the trailing segment when contiguous
        let jitter = TimeSpan::from_seconds(0.5 / rate);
        let buffer = &mut self.buffers[index];
        let samples = record.data().to_f64_vec();
        match buffer.segments.back_mut() {
            Some(seg) if (record.start_time() - seg.end(rate)).abs() <= jitter => {
                seg.samples.extend(samples);
            }
            _ => buffer.segments.push_back(Segment {
                start: record.start_time(),
                samples,
            }),
        }

        self.latest_end = Some(match self.latest_end {
            Some(t) => t.max(record.end_time()),
            None => record.end_time(),
        });

        self.emit_ready()
    }

    fn emit_ready(&mut self) -> Result<(), OperatorError> {
        let Some(rate) = self.rate else {
            return Ok(());
        };

        loop {
            // Expire fronts whose partners never arrived: only while some
            // channel is starved, otherwise the overlap logic advances.
            let starving = self.buffers.iter().any(|b| b.segments.is_empty());
            if starving {
                if let Some(latest) = self.latest_end {
                    let timeout = self.alignment_timeout;
                    for buffer in &mut self.buffers {
                        while buffer
                            .segments
                            .front()
                            .is_some_and(|seg| seg.end(rate) + timeout < latest)
                        {
                            let seg = buffer.segments.pop_front().expect("checked front");
                            log::debug!(
                                "operator: dropping unmatched stretch starting {}",
                                seg.start
                            );
                        }
                    }
                }
            }

            if self.buffers.iter().any(|b| b.segments.is_empty()) {
                return Ok(());
            }

            // Overlap of the front segments
            let t0 = self
                .buffers
                .iter()
                .map(|b| b.segments.front().expect("checked").start)
                .max()
                .expect("non-empty");
            let t1 = self
                .buffers
                .iter()
                .map(|b| b.segments.front().expect("checked").end(rate))
                .min()
                .expect("non-empty");

            if t1 <= t0 {
                // Fronts ending before the overlap can never be matched
                for buffer in &mut self.buffers {
                    if buffer
                        .segments
                        .front()
                        .is_some_and(|seg| seg.end(rate) <= t0)
                    {
                        buffer.segments.pop_front();
                    }
                }
                continue;
            }

            // Per-sample alignment check
            let mut offsets = Vec::with_capacity(self.buffers.len());
            for buffer in &self.buffers {
                let seg = buffer.segments.front().expect("checked");
                let offset = (t0 - seg.start).seconds() * rate;
                let frac = (offset - offset.round()).abs();
                if frac > 0.5 {
                    return Err(OperatorError::AlignmentMismatch {
                        offset_seconds: frac / rate,
                    });
                }
                offsets.push(offset.round() as usize);
            }

            let count = ((t1 - t0).seconds() * rate).round() as usize;
            if count == 0 {
                return Ok(());
            }

            let mut out = Vec::with_capacity(count);
            let mut components = vec![0.0; self.buffers.len()];
            for j in 0..count {
                for (k, buffer) in self.buffers.iter().enumerate() {
                    let seg = buffer.segments.front().expect("checked");
                    components[k] = seg.samples[offsets[k] + j];
                }
                out.push(self.op.apply(&components));
            }

            let sensor = self.sensor.as_ref().expect("sensor known once data flowed");
            let out_id = StreamId::new(
                sensor.network(),
                sensor.station(),
                sensor.location(),
                self.output_channel.clone(),
            );
            let record = Record::new(out_id, t0, rate, out)
                .expect("rate validated on input")
                .into_shared();
            if let Some(store) = self.store.as_mut() {
                store(record);
            }

            // Consume everything before t1 from each front
            for buffer in &mut self.buffers {
                let seg = buffer.segments.front_mut().expect("checked");
                let consumed = ((t1 - seg.start).seconds() * rate).round() as usize;
                if consumed >= seg.samples.len() {
                    buffer.segments.pop_front();
                } else {
                    seg.samples.drain(..consumed);
                    seg.start = seg.start + TimeSpan::from_samples(consumed, rate);
                }
            }
        }
    }

}
