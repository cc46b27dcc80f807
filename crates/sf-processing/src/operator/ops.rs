//! Per-sample vector functions
//!
//! The operators shipped with the framework: Euclidean norm, projection
//! onto a unit direction, and 3-axis rotation expressed as a projection
//! derived from azimuth and incidence.

use nalgebra::Vector3;

use crate::operator::VectorOp;

/// `sqrt(sum(x_i^2))` over however many components are wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct L2Norm;

impl VectorOp for L2Norm {
    fn apply(&self, components: &[f64]) -> f64 {
        components.iter().map(|x| x * x).sum::<f64>().sqrt()
    }
}

/// Scalar projection onto a fixed direction; one weight per component.
#[derive(Debug, Clone)]
pub struct Projection {
    weights: Vec<f64>,
}

impl Projection {
    pub fn new(weights: Vec<f64>) -> Self {
        Self { weights }
    }

    /// Projection of a (Z, N, E) component triple onto the ray described
    /// by `azimuth` (degrees clockwise from north) and `incidence`
    /// (degrees down from vertical).
    pub fn from_azimuth_incidence(azimuth_deg: f64, incidence_deg: f64) -> Self {
        let azi = azimuth_deg.to_radians();
        let inc = incidence_deg.to_radians();
        let direction = Vector3::new(inc.cos(), inc.sin() * azi.cos(), inc.sin() * azi.sin());
        Self {
            weights: vec![direction.x, direction.y, direction.z],
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl VectorOp for Projection {
    fn apply(&self, components: &[f64]) -> f64 {
        components
            .iter()
            .zip(&self.weights)
            .map(|(x, w)| x * w)
            .sum()
    }
}

/// A user-supplied closure as an operator.
pub struct FnOp<F: Fn(&[f64]) -> f64 + Send>(pub F);

impl<F: Fn(&[f64]) -> f64 + Send> VectorOp for FnOp<F> {
    fn apply(&self, components: &[f64]) -> f64 {
        (self.0)(components)
    }
}
