//! End-to-end processing scenarios
//!
//! Records flow from an in-memory mini-SEED source through the operators
//! and processors down to a station magnitude, exercising the crate
//! boundaries the way a real-time pipeline does.

use std::sync::Arc;

use sf_core::{Record, RingBuffer, StreamId, Time, TimeSpan};
use sf_io::mseed::{encode_record, EncodeOptions};
use sf_io::{MemoryStream, RecordStream};
use sf_processing::{
    AmplitudeConfig, AmplitudeProcessor, L2Norm, MagnitudeInput, MagnitudeProcessor,
    MeasurementRule, Ms20, NCompsOperator, Status, StreamMeta,
};

fn sine_record(id: &StreamId, start: Time, rate: f64, seconds: f64, freq: f64, amp: f64) -> Record {
    let n = (rate * seconds) as usize;
    let t0 = start.epoch_seconds();
    let samples: Vec<f64> = (0..n)
        .map(|i| {
            let t = t0 + i as f64 / rate;
            amp * (2.0 * std::f64::consts::PI * freq * t).sin()
        })
        .collect();
    Record::new(id.clone(), start, rate, samples).unwrap()
}

#[test]
fn memory_stream_feeds_operator() {
    // Two horizontals with constant values 3 and 4, shipped as mini-SEED
    // float64 and pulled back through the in-memory source.
    let north = StreamId::new("XX", "ABCD", "", "BHN");
    let east = StreamId::new("XX", "ABCD", "", "BHE");
    let start = Time::from_ymd_hms_micro(2024, 12, 20, 0, 0, 0, 0).unwrap();

    let mut buffer = Vec::new();
    for (id, value) in [(&north, 3.0f64), (&east, 4.0f64)] {
        let rec = Record::new(id.clone(), start, 20.0, vec![value; 40]).unwrap();
        buffer.extend(encode_record(&rec, &EncodeOptions::default()).unwrap());
    }

    let mut source = MemoryStream::new(buffer);
    let seq = Arc::new(parking_lot::Mutex::new(RingBuffer::new(0)));
    let sink = seq.clone();
    let mut operator = NCompsOperator::new(
        vec!["BHN".into(), "BHE".into()],
        Box::new(L2Norm),
        "BHL",
    );
    operator.set_store_func(move |rec| {
        sink.lock().feed(rec);
        true
    });

    while let Some(rec) = source.next_record().unwrap() {
        operator.feed(&rec).unwrap();
    }

    let seq = seq.lock();
    assert_eq!(seq.len(), 1);
    let out = seq.front().unwrap();
    assert_eq!(out.sample_count(), 40);
    assert_eq!(out.start_time(), start);
    for i in 0..out.sample_count() {
        assert!((out.data().get(i) - 5.0).abs() < 1e-9);
    }
}

#[test]
fn amplitude_to_magnitude_chain() {
    // A 20 s surface-wave packet measured half peak-to-peak and handed to
    // the Ms_20 calibration.
    let id = StreamId::new("GE", "MORC", "", "BHZ");
    let trigger = Time::from_ymd_hms_micro(2019, 5, 1, 12, 0, 0, 0).unwrap();
    let rate = 20.0;

    let config = AmplitudeConfig {
        amplitude_type: "Ms_20".into(),
        unit: "nm".into(),
        measurement: MeasurementRule::HalfPeakToPeak,
        noise_begin: -60.0,
        noise_end: -10.0,
        signal_begin: -10.0,
        signal_end: 120.0,
        min_snr: 2.0,
        ..Default::default()
    };
    let mut amplitude =
        AmplitudeProcessor::new(config, StreamMeta::with_gain(1.0, "m")).unwrap();
    amplitude.set_trigger(trigger);

    let mut result = None;
    let mut t = trigger - TimeSpan::from_seconds(90.0);
    while t < trigger + TimeSpan::from_seconds(140.0) {
        // A 100 000 nm packet at 0.05 Hz starts at the trigger and decays
        // slowly, so the first swing carries the extremes.
        let amp = if t >= trigger {
            100_000.0 * (-(t - trigger).seconds() / 200.0).exp()
        } else {
            10.0
        };
        let rec = sine_record(&id, t, rate, 10.0, 0.05, amp);
        if let Some(r) = amplitude.feed(&rec) {
            result = Some(r.clone());
        }
        t = t + TimeSpan::from_seconds(10.0);
    }

    let result = result.expect("amplitude measured");
    assert_eq!(amplitude.status(), Status::Finished);
    assert!((result.value.value - 100_000.0).abs() / 100_000.0 < 0.1);
    let period = result.period.expect("period from peak-to-trough");
    assert!((period - 20.0).abs() < 2.0, "period was {period}");

    // Station magnitude at 40 degrees, 10 km depth
    let input = MagnitudeInput::new(result.value.value, &result.unit, 40.0, 10.0)
        .with_period(period.clamp(18.0, 22.0));
    let magnitude = Ms20::default().compute(&input).unwrap();
    let expected = (result.value.value / input.period).log10() + 1.66 * 40.0f64.log10() + 0.3;
    assert!((magnitude - expected).abs() < 1e-9);
}
