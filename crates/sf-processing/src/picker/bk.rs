//! Baer-Kradolfer onset estimation
//!
//! Integrates a running characteristic function built from the squared
//! trace and its scaled derivative; a pick is declared when the function
//! crosses `threshold1`, and the statistics backing the standardization
//! are only updated while the function stays below `threshold2`. The onset
//! is refined by walking back to where the function last sat in the noise,
//! and polarity comes from the signed slope in a short window after the
//! onset.

use sf_model::Polarity;

use crate::picker::{PickAlgorithm, PickEstimate};

#[derive(Debug, Clone)]
pub struct BkPicker {
    /// Trigger threshold of the standardized characteristic function.
    pub threshold1: f64,
    /// Above this level the noise statistics are frozen.
    pub threshold2: f64,
    /// Seconds of slope window for the polarity decision.
    pub polarity_window: f64,
}

impl Default for BkPicker {
    fn default() -> Self {
        Self {
            threshold1: 10.0,
            threshold2: 20.0,
            polarity_window: 0.25,
        }
    }
}

impl BkPicker {
    fn characteristic_function(&self, data: &[f64]) -> Vec<f64> {
        let n = data.len();
        let mut cf = vec![0.0; n];
        if n < 2 {
            return cf;
        }

        // Power ratio scaling the derivative into the amplitude domain
        let mut sum_y2 = 0.0;
        let mut sum_d2 = 0.0;
        // Running moments of the envelope, frozen above threshold2
        let mut mean = 0.0;
        let mut m2 = 0.0;
        let mut count: f64 = 0.0;

        let mut prev = data[0];
        for i in 1..n {
            let y = data[i];
            let dy = y - prev;
            prev = y;
            sum_y2 += y * y;
            sum_d2 += dy * dy;

            let weight = if sum_d2 > 0.0 { sum_y2 / sum_d2 } else { 0.0 };
            let env = y * y + weight * dy * dy;
            let e4 = env * env;

            let std = (m2 / count.max(1.0)).sqrt();
            let value = if std > 0.0 { (e4 - mean) / std } else { 0.0 };
            cf[i] = value;

            if value < self.threshold2 || count < 2.0 {
                count += 1.0;
                let delta = e4 - mean;
                mean += delta / count;
                m2 += delta * (e4 - mean);
            }
        }
        cf
    }

    fn polarity(&self, data: &[f64], onset: usize, rate: f64, noise_level: f64) -> Polarity {
        let window = ((self.polarity_window * rate) as usize).max(2);
        let end = (onset + window).min(data.len());
        let reference = data[onset];
        // Sign of the first excursion that clears the noise; flat segments
        // stay undecidable rather than flipping on noise.
        let threshold = 4.0 * noise_level;
        for &y in &data[onset + 1..end] {
            let excursion = y - reference;
            if excursion.abs() > threshold {
                return if excursion > 0.0 {
                    Polarity::Positive
                } else {
                    Polarity::Negative
                };
            }
        }
        Polarity::Undecidable
    }
}

impl PickAlgorithm for BkPicker {
    fn method_id(&self) -> &'static str {
        "BK"
    }

    fn calculate_pick(
        &self,
        data: &[f64],
        signal_start: usize,
        signal_end: usize,
        sampling_rate: f64,
    ) -> Option<PickEstimate> {
        if data.len() < 4 || signal_start >= data.len() {
            return None;
        }
        let signal_end = signal_end.min(data.len());
        let cf = self.characteristic_function(data);

        // First crossing of threshold1 inside the signal window
        let crossing = (signal_start.max(1)..signal_end).find(|&i| cf[i] > self.threshold1)?;

        // Refine: walk back to where the function was still in the noise
        let mut onset = crossing;
        while onset > signal_start && cf[onset - 1] > 1.0 {
            onset -= 1;
        }

        // Noise / signal RMS around the onset
        let noise_window = ((2.0 * sampling_rate) as usize).max(1);
        let noise_from = onset.saturating_sub(noise_window);
        let noise_rms = rms(&data[noise_from..onset.max(noise_from + 1)]);
        let signal_to = (onset + noise_window).min(data.len());
        let signal_rms = rms(&data[onset..signal_to]);
        let snr = if noise_rms > 0.0 {
            signal_rms / noise_rms
        } else {
            signal_rms
        };

        let polarity = self.polarity(data, onset, sampling_rate, noise_rms);

        Some(PickEstimate {
            index: onset,
            lower_uncertainty: (crossing - onset) as f64,
            upper_uncertainty: ((crossing - onset) as f64 / 2.0).max(1.0),
            snr,
            polarity: Some(polarity),
        })
    }
}

fn rms(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    (data.iter().map(|x| x * x).sum::<f64>() / data.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic low-level noise plus a strong onset at `onset_idx`.
    fn synthetic(n: usize, onset_idx: usize, rate: f64, positive: bool) -> Vec<f64> {
        let mut data = Vec::with_capacity(n);
        let mut x = 0x12345u64;
        for i in 0..n {
            // Small linear-congruential noise floor
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let noise = ((x >> 33) as f64 / (1u64 << 31) as f64 - 0.5) * 0.1;
            let signal = if i >= onset_idx {
                let t = (i - onset_idx) as f64 / rate;
                let s = 5.0 * (2.0 * std::f64::consts::PI * 2.0 * t).sin()
                    * (1.0 - (-t * 8.0).exp());
                if positive { s } else { -s }
            } else {
                0.0
            };
            data.push(noise + signal);
        }
        data
    }

    #[test]
    fn test_picks_near_onset() {
        let rate = 100.0;
        let data = synthetic(2000, 1000, rate, true);
        let bk = BkPicker::default();
        let estimate = bk.calculate_pick(&data, 500, 2000, rate).expect("pick");
        let error = (estimate.index as f64 - 1000.0).abs() / rate;
        assert!(error < 0.25, "onset error was {error} s");
        assert!(estimate.snr > 3.0, "snr was {}", estimate.snr);
    }

    #[test]
    fn test_polarity_tracks_first_motion() {
        let rate = 100.0;
        let bk = BkPicker::default();

        let up = synthetic(2000, 1000, rate, true);
        let estimate = bk.calculate_pick(&up, 500, 2000, rate).unwrap();
        assert_eq!(estimate.polarity, Some(Polarity::Positive));

        let down = synthetic(2000, 1000, rate, false);
        let estimate = bk.calculate_pick(&down, 500, 2000, rate).unwrap();
        assert_eq!(estimate.polarity, Some(Polarity::Negative));
    }

    #[test]
    fn test_flat_trace_yields_no_pick() {
        let bk = BkPicker::default();
        let flat = vec![0.0; 1000];
        assert!(bk.calculate_pick(&flat, 100, 1000, 100.0).is_none());
    }

    #[test]
    fn test_uncertainties_nonnegative() {
        let rate = 100.0;
        let data = synthetic(2000, 1000, rate, true);
        let estimate = BkPicker::default()
            .calculate_pick(&data, 500, 2000, rate)
            .unwrap();
        assert!(estimate.lower_uncertainty >= 0.0);
        assert!(estimate.upper_uncertainty > 0.0);
    }
}
