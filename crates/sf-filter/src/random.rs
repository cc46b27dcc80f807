//! Synthetic noise generators
//!
//! Replace the input with uniform or normal noise. Deterministic when
//! seeded, which the test data generators rely on.

use std::any::Any;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{Filter, FilterError, FilterResult, ParamCode};

fn default_rng() -> ChaCha8Rng {
    ChaCha8Rng::from_os_rng()
}

/// Uniform noise in `[min, max)`.
#[derive(Debug, Clone)]
pub struct RandomUniform {
    minimum: f64,
    maximum: f64,
    seed: Option<u64>,
    rng: ChaCha8Rng,
}

impl RandomUniform {
    pub fn new(minimum: f64, maximum: f64) -> Self {
        Self {
            minimum,
            maximum,
            seed: None,
            rng: default_rng(),
        }
    }

    /// Deterministic variant.
    pub fn with_seed(minimum: f64, maximum: f64, seed: u64) -> Self {
        Self {
            minimum,
            maximum,
            seed: Some(seed),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Filter for RandomUniform {
    fn name(&self) -> &'static str {
        "RUD"
    }

    fn set_sampling_rate(&mut self, rate: f64) -> FilterResult<()> {
        if !(rate > 0.0) {
            return Err(FilterError::InvalidSamplingRate(rate));
        }
        Ok(())
    }

    fn apply(&mut self, data: &mut [f64]) -> FilterResult<()> {
        for x in data.iter_mut() {
            let u: f64 = self.rng.random();
            *x = u * (self.maximum - self.minimum) + self.minimum;
        }
        Ok(())
    }

    fn set_parameters(&mut self, params: &[f64]) -> ParamCode {
        if params.len() != 2 {
            return ParamCode::WrongCount { expected: 2 };
        }
        self.minimum = params[0];
        self.maximum = params[1];
        ParamCode::Accepted(2)
    }

    fn reset(&mut self) {
        self.rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => default_rng(),
        };
    }

    fn clone_fresh(&self) -> Box<dyn Filter> {
        Box::new(match self.seed {
            Some(seed) => RandomUniform::with_seed(self.minimum, self.maximum, seed),
            None => RandomUniform::new(self.minimum, self.maximum),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Gaussian noise with configurable mean and standard deviation.
#[derive(Debug, Clone)]
pub struct RandomNormal {
    mean: f64,
    std_dev: f64,
    seed: Option<u64>,
    rng: ChaCha8Rng,
    spare: Option<f64>,
}

impl RandomNormal {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self {
            mean,
            std_dev,
            seed: None,
            rng: default_rng(),
            spare: None,
        }
    }

    /// Deterministic variant.
    pub fn with_seed(mean: f64, std_dev: f64, seed: u64) -> Self {
        Self {
            mean,
            std_dev,
            seed: Some(seed),
            rng: ChaCha8Rng::seed_from_u64(seed),
            spare: None,
        }
    }

    /// Box-Muller transform, producing pairs of independent deviates.
    fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.spare.take() {
            return z;
        }
        let u1: f64 = loop {
            let u: f64 = self.rng.random();
            if u > 0.0 {
                break u;
            }
        };
        let u2: f64 = self.rng.random();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * std::f64::consts::PI * u2;
        self.spare = Some(r * theta.sin());
        r * theta.cos()
    }
}

impl Filter for RandomNormal {
    fn name(&self) -> &'static str {
        "RND"
    }

    fn set_sampling_rate(&mut self, rate: f64) -> FilterResult<()> {
        if !(rate > 0.0) {
            return Err(FilterError::InvalidSamplingRate(rate));
        }
        Ok(())
    }

    fn apply(&mut self, data: &mut [f64]) -> FilterResult<()> {
        for x in data.iter_mut() {
            *x = self.mean + self.std_dev * self.standard_normal();
        }
        Ok(())
    }

    fn set_parameters(&mut self, params: &[f64]) -> ParamCode {
        if params.len() != 2 {
            return ParamCode::WrongCount { expected: 2 };
        }
        if params[1] < 0.0 {
            return ParamCode::BadValue { index: 1 };
        }
        self.mean = params[0];
        self.std_dev = params[1];
        ParamCode::Accepted(2)
    }

    fn reset(&mut self) {
        self.spare = None;
        self.rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => default_rng(),
        };
    }

    fn clone_fresh(&self) -> Box<dyn Filter> {
        Box::new(match self.seed {
            Some(seed) => RandomNormal::with_seed(self.mean, self.std_dev, seed),
            None => RandomNormal::new(self.mean, self.std_dev),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
