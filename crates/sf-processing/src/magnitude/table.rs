//! Piecewise-linear calibration tables
//!
//! Non-parametric magnitude calibrations are distance-amplitude correction
//! tables interpolated linearly between the sampled distances. What
//! happens outside the sampled range is an explicit policy.

use crate::{ConfigError, ConfigResult};

/// Behavior outside the sampled range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extrapolation {
    /// Clamp to the nearest sampled value.
    #[default]
    Nearest,
    /// Continue the slope of the outermost segment.
    Linear,
    /// Refuse the lookup.
    Reject,
}

/// A `log10(A0)` distance correction table.
#[derive(Debug, Clone)]
pub struct LogA0Table {
    /// Sorted sample distances (km) and their values.
    nodes: Vec<(f64, f64)>,
    extrapolation: Extrapolation,
}

impl LogA0Table {
    pub fn new(mut nodes: Vec<(f64, f64)>, extrapolation: Extrapolation) -> ConfigResult<Self> {
        if nodes.len() < 2 {
            return Err(ConfigError::BadParameter {
                name: "logA0".into(),
                message: "at least two nodes required".into(),
            });
        }
        nodes.sort_by(|a, b| a.0.total_cmp(&b.0));
        if nodes.windows(2).any(|w| w[0].0 == w[1].0) {
            return Err(ConfigError::BadParameter {
                name: "logA0".into(),
                message: "duplicate distance node".into(),
            });
        }
        Ok(Self {
            nodes,
            extrapolation,
        })
    }

    /// Parse the `dist1:val1,dist2:val2,...` notation.
    pub fn parse(text: &str, extrapolation: Extrapolation) -> ConfigResult<Self> {
        let mut nodes = Vec::new();
        for item in text.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (d, v) = item.split_once(':').ok_or_else(|| ConfigError::BadParameter {
                name: "logA0".into(),
                message: format!("expected 'distance:value', got '{item}'"),
            })?;
            let parse = |s: &str| {
                s.trim().parse::<f64>().map_err(|_| ConfigError::BadParameter {
                    name: "logA0".into(),
                    message: format!("'{s}' is not a number"),
                })
            };
            nodes.push((parse(d)?, parse(v)?));
        }
        Self::new(nodes, extrapolation)
    }

    /// Interpolated value at `distance` km, or `None` under the reject
    /// policy outside the range.
    pub fn value_at(&self, distance: f64) -> Option<f64> {
        let first = self.nodes.first().expect("validated in new");
        let last = self.nodes.last().expect("validated in new");

        if distance < first.0 || distance > last.0 {
            return match self.extrapolation {
                Extrapolation::Reject => None,
                Extrapolation::Nearest => {
                    Some(if distance < first.0 { first.1 } else { last.1 })
                }
                Extrapolation::Linear => {
                    let (a, b) = if distance < first.0 {
                        (self.nodes[0], self.nodes[1])
                    } else {
                        (
                            self.nodes[self.nodes.len() - 2],
                            self.nodes[self.nodes.len() - 1],
                        )
                    };
                    Some(lerp(a, b, distance))
                }
            };
        }

        let upper = self
            .nodes
            .iter()
            .position(|(d, _)| *d >= distance)
            .expect("within range");
        if self.nodes[upper].0 == distance {
            return Some(self.nodes[upper].1);
        }
        Some(lerp(self.nodes[upper - 1], self.nodes[upper], distance))
    }
}

fn lerp(a: (f64, f64), b: (f64, f64), x: f64) -> f64 {
    a.1 + (b.1 - a.1) * (x - a.0) / (b.0 - a.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(extrapolation: Extrapolation) -> LogA0Table {
        LogA0Table::parse("0:-1.3,60:-2.8,100:-3.0,400:-4.5", extrapolation).unwrap()
    }

    #[test]
    fn test_interpolation_between_nodes() {
        let t = table(Extrapolation::Nearest);
        assert_eq!(t.value_at(60.0).unwrap(), -2.8);
        // Halfway between 60 and 100
        assert!((t.value_at(80.0).unwrap() - -2.9).abs() < 1e-12);
    }

    #[test]
    fn test_extrapolation_policies() {
        assert_eq!(table(Extrapolation::Nearest).value_at(500.0).unwrap(), -4.5);
        assert!(table(Extrapolation::Reject).value_at(500.0).is_none());
        // Linear continues the last segment: slope (-4.5+3.0)/300 per km
        let v = table(Extrapolation::Linear).value_at(500.0).unwrap();
        assert!((v - (-4.5 + 100.0 * (-1.5 / 300.0))).abs() < 1e-9);
    }

    #[test]
    fn test_parse_errors() {
        assert!(LogA0Table::parse("60", Extrapolation::Nearest).is_err());
        assert!(LogA0Table::parse("60:abc", Extrapolation::Nearest).is_err());
        assert!(LogA0Table::parse("60:-2.8", Extrapolation::Nearest).is_err());
        assert!(LogA0Table::parse("60:-2.8,60:-3.0", Extrapolation::Nearest).is_err());
    }
}
