//! Time types for waveform processing
//!
//! All internal timestamps are microseconds since the Unix epoch. Records
//! carry the time of their first sample; everything derived from sample
//! counts stays within 1 µs of the exact value.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Microseconds per second.
pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// A point in time with microsecond precision.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Time(i64);

impl Time {
    pub const EPOCH: Self = Self(0);

    /// Create from raw microseconds since the Unix epoch.
    #[inline]
    pub fn from_epoch_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Create from a calendar date and time (UTC).
    pub fn from_ymd_hms_micro(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        min: u32,
        sec: u32,
        micro: u32,
    ) -> Option<Self> {
        let dt = Utc
            .with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()?;
        Some(Self(dt.timestamp() * MICROS_PER_SECOND + i64::from(micro)))
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    #[inline]
    pub fn epoch_micros(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn epoch_seconds(self) -> f64 {
        self.0 as f64 / MICROS_PER_SECOND as f64
    }

    /// Julian day of the year (1-based) and year, used by archive layouts.
    pub fn year_and_day_of_year(self) -> (i32, u32) {
        use chrono::Datelike;
        let dt = self.to_datetime();
        (dt.year(), dt.ordinal())
    }

    pub fn to_datetime(self) -> DateTime<Utc> {
        let secs = self.0.div_euclid(MICROS_PER_SECOND);
        let micros = self.0.rem_euclid(MICROS_PER_SECOND) as u32;
        DateTime::from_timestamp(secs, micros * 1000).unwrap_or_default()
    }
}

impl From<DateTime<Utc>> for Time {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp() * MICROS_PER_SECOND + i64::from(dt.timestamp_subsec_micros()))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_datetime().format("%Y-%m-%dT%H:%M:%S%.6fZ"))
    }
}

impl std::ops::Add<TimeSpan> for Time {
    type Output = Time;

    #[inline]
    fn add(self, rhs: TimeSpan) -> Time {
        Time(self.0 + rhs.0)
    }
}

impl std::ops::Sub<TimeSpan> for Time {
    type Output = Time;

    #[inline]
    fn sub(self, rhs: TimeSpan) -> Time {
        Time(self.0 - rhs.0)
    }
}

impl std::ops::Sub for Time {
    type Output = TimeSpan;

    #[inline]
    fn sub(self, rhs: Time) -> TimeSpan {
        TimeSpan(self.0 - rhs.0)
    }
}

/// A signed duration with microsecond precision.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TimeSpan(i64);

impl TimeSpan {
    pub const ZERO: Self = Self(0);

    #[inline]
    pub fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    #[inline]
    pub fn from_seconds(seconds: f64) -> Self {
        Self((seconds * MICROS_PER_SECOND as f64).round() as i64)
    }

    /// Duration covered by `count` samples at `rate` Hz.
    #[inline]
    pub fn from_samples(count: usize, rate: f64) -> Self {
        Self::from_seconds(count as f64 / rate)
    }

    #[inline]
    pub fn micros(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn seconds(self) -> f64 {
        self.0 as f64 / MICROS_PER_SECOND as f64
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }
}

impl std::ops::Add for TimeSpan {
    type Output = TimeSpan;

    #[inline]
    fn add(self, rhs: TimeSpan) -> TimeSpan {
        TimeSpan(self.0 + rhs.0)
    }
}

impl std::ops::Sub for TimeSpan {
    type Output = TimeSpan;

    #[inline]
    fn sub(self, rhs: TimeSpan) -> TimeSpan {
        TimeSpan(self.0 - rhs.0)
    }
}

impl std::ops::Mul<i64> for TimeSpan {
    type Output = TimeSpan;

    #[inline]
    fn mul(self, rhs: i64) -> TimeSpan {
        TimeSpan(self.0 * rhs)
    }
}

/// A half-open time interval `[start, end)`.
///
/// An empty window (`start == end == EPOCH`) evaluates to "unset".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: Time,
    end: Time,
}

impl TimeWindow {
    pub fn new(start: Time, end: Time) -> Self {
        Self { start, end }
    }

    pub fn from_start_and_length(start: Time, length: TimeSpan) -> Self {
        Self {
            start,
            end: start + length,
        }
    }

    #[inline]
    pub fn start(&self) -> Time {
        self.start
    }

    #[inline]
    pub fn end(&self) -> Time {
        self.end
    }

    #[inline]
    pub fn length(&self) -> TimeSpan {
        self.end - self.start
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.start != Time::EPOCH || self.end != Time::EPOCH
    }

    #[inline]
    pub fn contains(&self, t: Time) -> bool {
        t >= self.start && t < self.end
    }

    /// True if `other` lies entirely within this window.
    pub fn covers(&self, other: &TimeWindow) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The smallest window containing both operands. An unset operand is
    /// ignored.
    pub fn merge(&self, other: &TimeWindow) -> TimeWindow {
        if !self.is_set() {
            return *other;
        }
        if !other.is_set() {
            return *self;
        }
        TimeWindow {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl std::ops::BitOr for TimeWindow {
    type Output = TimeWindow;

    fn bitor(self, rhs: TimeWindow) -> TimeWindow {
        self.merge(&rhs)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_construction() {
        let t = Time::from_ymd_hms_micro(2019, 1, 1, 0, 0, 0, 8543).unwrap();
        assert_eq!(t.to_string(), "2019-01-01T00:00:00.008543Z");
        assert_eq!(t.epoch_micros() % MICROS_PER_SECOND, 8543);
    }

    #[test]
    fn test_time_arithmetic() {
        let t = Time::from_epoch_micros(1_000_000);
        let dt = TimeSpan::from_seconds(2.5);
        assert_eq!((t + dt).epoch_micros(), 3_500_000);
        assert_eq!((t + dt) - t, dt);
    }

    #[test]
    fn test_sample_span() {
        // 100 samples at 20 Hz cover exactly 5 s
        assert_eq!(TimeSpan::from_samples(100, 20.0).seconds(), 5.0);
    }

    #[test]
    fn test_window_merge() {
        let start = Time::from_ymd_hms_micro(2024, 12, 1, 10, 38, 42, 0).unwrap();
        let mid = start + TimeSpan::from_seconds(3600.0);
        let end = mid + TimeSpan::from_seconds(1282.0);

        let tw1 = TimeWindow::new(start, mid);
        let tw2 = TimeWindow::new(mid, end);

        let tw = tw1 | tw2;
        assert_eq!(tw.start(), start);
        assert_eq!(tw.end(), end);

        let tw = TimeWindow::default() | tw1;
        assert_eq!(tw, tw1);
    }

    #[test]
    fn test_window_cover() {
        let start = Time::from_epoch_micros(0);
        let outer = TimeWindow::from_start_and_length(start, TimeSpan::from_seconds(10.0));
        let inner = TimeWindow::from_start_and_length(
            start + TimeSpan::from_seconds(1.0),
            TimeSpan::from_seconds(5.0),
        );
        assert!(outer.covers(&inner));
        assert!(!inner.covers(&outer));
        assert!(outer.overlaps(&inner));
    }

    #[test]
    fn test_julian_day() {
        let t = Time::from_ymd_hms_micro(2019, 5, 2, 0, 0, 0, 0).unwrap();
        assert_eq!(t.year_and_day_of_year(), (2019, 122));
    }
}
