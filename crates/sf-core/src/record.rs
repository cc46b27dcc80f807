//! Waveform records
//!
//! A record is an immutable carrier of contiguous samples for one stream.
//! Sample data is polymorphic over the four wire sample types; processing
//! code converts to `f64` at the edge and never mutates a record in place.
//! Records are shared via `Arc` between sequence buffers and processors.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult, StreamId, Time, TimeSpan, TimeWindow};

/// Sample type carried by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    Int16,
    Int32,
    Float32,
    Float64,
}

/// Typed sample storage.
#[derive(Debug, Clone, PartialEq)]
pub enum DataArray {
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl DataArray {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            DataArray::Int16(v) => v.len(),
            DataArray::Int32(v) => v.len(),
            DataArray::Float32(v) => v.len(),
            DataArray::Float64(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn sample_type(&self) -> SampleType {
        match self {
            DataArray::Int16(_) => SampleType::Int16,
            DataArray::Int32(_) => SampleType::Int32,
            DataArray::Float32(_) => SampleType::Float32,
            DataArray::Float64(_) => SampleType::Float64,
        }
    }

    /// Sample at `index` widened to f64.
    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        match self {
            DataArray::Int16(v) => f64::from(v[index]),
            DataArray::Int32(v) => f64::from(v[index]),
            DataArray::Float32(v) => f64::from(v[index]),
            DataArray::Float64(v) => v[index],
        }
    }

    /// All samples widened to f64.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            DataArray::Int16(v) => v.iter().map(|&x| f64::from(x)).collect(),
            DataArray::Int32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            DataArray::Float32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            DataArray::Float64(v) => v.clone(),
        }
    }

    /// Convert to the sample type of `T`, casting as needed.
    pub fn convert<T: Sample>(&self) -> Vec<T> {
        match self {
            DataArray::Int16(v) => v.iter().map(|&x| T::from_f64(f64::from(x))).collect(),
            DataArray::Int32(v) => v.iter().map(|&x| T::from_f64(f64::from(x))).collect(),
            DataArray::Float32(v) => v.iter().map(|&x| T::from_f64(f64::from(x))).collect(),
            DataArray::Float64(v) => v.iter().map(|&x| T::from_f64(x)).collect(),
        }
    }
}

impl From<Vec<i16>> for DataArray {
    fn from(v: Vec<i16>) -> Self {
        DataArray::Int16(v)
    }
}

impl From<Vec<i32>> for DataArray {
    fn from(v: Vec<i32>) -> Self {
        DataArray::Int32(v)
    }
}

impl From<Vec<f32>> for DataArray {
    fn from(v: Vec<f32>) -> Self {
        DataArray::Float32(v)
    }
}

impl From<Vec<f64>> for DataArray {
    fn from(v: Vec<f64>) -> Self {
        DataArray::Float64(v)
    }
}

/// A primitive sample type storable in a [`DataArray`].
pub trait Sample: Copy {
    const TYPE: SampleType;

    fn from_f64(v: f64) -> Self;
    fn into_f64(self) -> f64;
    fn wrap(samples: Vec<Self>) -> DataArray;
}

impl Sample for i16 {
    const TYPE: SampleType = SampleType::Int16;

    #[inline]
    fn from_f64(v: f64) -> Self {
        v.round() as i16
    }

    #[inline]
    fn into_f64(self) -> f64 {
        f64::from(self)
    }

    fn wrap(samples: Vec<Self>) -> DataArray {
        DataArray::Int16(samples)
    }
}

impl Sample for i32 {
    const TYPE: SampleType = SampleType::Int32;

    #[inline]
    fn from_f64(v: f64) -> Self {
        v.round() as i32
    }

    #[inline]
    fn into_f64(self) -> f64 {
        f64::from(self)
    }

    fn wrap(samples: Vec<Self>) -> DataArray {
        DataArray::Int32(samples)
    }
}

impl Sample for f32 {
    const TYPE: SampleType = SampleType::Float32;

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    #[inline]
    fn into_f64(self) -> f64 {
        f64::from(self)
    }

    fn wrap(samples: Vec<Self>) -> DataArray {
        DataArray::Float32(samples)
    }
}

impl Sample for f64 {
    const TYPE: SampleType = SampleType::Float64;

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }

    #[inline]
    fn into_f64(self) -> f64 {
        self
    }

    fn wrap(samples: Vec<Self>) -> DataArray {
        DataArray::Float64(samples)
    }
}

/// An immutable waveform record.
///
/// `start_time` is the time of the first sample. The end time is derived
/// from the sample count and never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    stream_id: StreamId,
    start_time: Time,
    sampling_rate: f64,
    data: DataArray,
    timing_quality: Option<u8>,
}

impl Record {
    pub fn new(
        stream_id: StreamId,
        start_time: Time,
        sampling_rate: f64,
        data: impl Into<DataArray>,
    ) -> CoreResult<Self> {
        if !(sampling_rate > 0.0) || !sampling_rate.is_finite() {
            return Err(CoreError::InvalidSamplingRate(sampling_rate));
        }
        Ok(Self {
            stream_id,
            start_time,
            sampling_rate,
            data: data.into(),
            timing_quality: None,
        })
    }

    /// Attach a timing quality percentage (0..=100).
    pub fn with_timing_quality(mut self, quality: u8) -> CoreResult<Self> {
        if quality > 100 {
            return Err(CoreError::InvalidTimingQuality(quality));
        }
        self.timing_quality = Some(quality);
        Ok(self)
    }

    #[inline]
    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    #[inline]
    pub fn start_time(&self) -> Time {
        self.start_time
    }

    #[inline]
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    #[inline]
    pub fn sample_count(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn data(&self) -> &DataArray {
        &self.data
    }

    #[inline]
    pub fn sample_type(&self) -> SampleType {
        self.data.sample_type()
    }

    #[inline]
    pub fn timing_quality(&self) -> Option<u8> {
        self.timing_quality
    }

    /// Time just past the last sample: `start + count / rate`.
    pub fn end_time(&self) -> Time {
        self.start_time + TimeSpan::from_samples(self.data.len(), self.sampling_rate)
    }

    pub fn time_window(&self) -> TimeWindow {
        TimeWindow::new(self.start_time, self.end_time())
    }

    /// Duration of one sample period.
    #[inline]
    pub fn sample_period(&self) -> TimeSpan {
        TimeSpan::from_seconds(1.0 / self.sampling_rate)
    }

    /// Shared handle for fan-out to sequences and processors.
    pub fn into_shared(self) -> Arc<Record> {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_20hz(n: usize) -> Record {
        let samples: Vec<i32> = (0..n as i32).collect();
        Record::new(
            StreamId::new("XX", "STA", "", "BHZ"),
            Time::from_ymd_hms_micro(2019, 1, 1, 0, 0, 0, 8543).unwrap(),
            20.0,
            samples,
        )
        .unwrap()
    }

    #[test]
    fn test_end_time_exact() {
        let rec = record_20hz(100);
        // 100 samples at 20 Hz = 5 s
        let span = rec.end_time() - rec.start_time();
        assert!((span.seconds() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_timing_quality_range() {
        assert!(record_20hz(10).with_timing_quality(30).is_ok());
        assert!(record_20hz(10).with_timing_quality(101).is_err());
    }

    #[test]
    fn test_rejects_bad_rate() {
        let r = Record::new(
            StreamId::new("XX", "STA", "", "BHZ"),
            Time::EPOCH,
            0.0,
            vec![0i32],
        );
        assert!(r.is_err());
    }

    #[test]
    fn test_data_conversion() {
        let rec = record_20hz(4);
        assert_eq!(rec.sample_type(), SampleType::Int32);
        assert_eq!(rec.data().to_f64_vec(), vec![0.0, 1.0, 2.0, 3.0]);
        let as_f32: Vec<f32> = rec.data().convert();
        assert_eq!(as_f32, vec![0.0, 1.0, 2.0, 3.0]);
    }
}
