//! Unit conversion table
//!
//! Maps source-side unit spellings, SI and legacy alike, to their SI target
//! with a scale factor. Lookups are case-insensitive. Unknown units make
//! amplitude and magnitude processors refuse the input.

use std::collections::HashMap;
use std::sync::OnceLock;

/// One conversion: scale from `from_unit` into `to_unit`.
#[derive(Debug, Clone)]
pub struct UnitConversion {
    pub from_unit: &'static str,
    pub to_unit: &'static str,
    pub to_qml_unit: &'static str,
    pub scale: f64,
}

impl UnitConversion {
    /// Convert from the input unit to the SI unit.
    #[inline]
    pub fn convert(&self, value: f64) -> f64 {
        value * self.scale
    }

    /// Convert from the SI unit back to the input unit.
    #[inline]
    pub fn revert(&self, value: f64) -> f64 {
        value / self.scale
    }
}

fn table() -> &'static HashMap<String, UnitConversion> {
    static TABLE: OnceLock<HashMap<String, UnitConversion>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let entries: &[(&'static str, &'static str, &'static str, f64)] = &[
            // Displacement
            ("m", "m", "m", 1.0),
            ("dm", "m", "m", 1e-1),
            ("cm", "m", "m", 1e-2),
            ("mm", "m", "m", 1e-3),
            ("um", "m", "m", 1e-6),
            ("nm", "m", "m", 1e-9),
            // Displacement-time integral
            ("m*s", "m*s", "m*s", 1.0),
            ("cm*s", "m*s", "m*s", 1e-2),
            ("nm*s", "m*s", "m*s", 1e-9),
            // Velocity
            ("m/s", "m/s", "m/s", 1.0),
            ("cm/s", "m/s", "m/s", 1e-2),
            ("mm/s", "m/s", "m/s", 1e-3),
            ("um/s", "m/s", "m/s", 1e-6),
            ("nm/s", "m/s", "m/s", 1e-9),
            // Acceleration, both spellings
            ("m/s/s", "m/s**2", "m/(s*s)", 1.0),
            ("m/s**2", "m/s**2", "m/(s*s)", 1.0),
            ("cm/s/s", "m/s**2", "m/(s*s)", 1e-2),
            ("cm/s**2", "m/s**2", "m/(s*s)", 1e-2),
            ("nm/s/s", "m/s**2", "m/(s*s)", 1e-9),
            ("nm/s**2", "m/s**2", "m/(s*s)", 1e-9),
            ("g", "m/s**2", "m/(s*s)", 9.80665),
        ];
        entries
            .iter()
            .map(|&(from, to, qml, scale)| {
                (
                    from.to_lowercase(),
                    UnitConversion {
                        from_unit: from,
                        to_unit: to,
                        to_qml_unit: qml,
                        scale,
                    },
                )
            })
            .collect()
    })
}

/// Look up the conversion for an input unit, or `None` when unknown.
pub fn unit_conversion(from_unit: &str) -> Option<&'static UnitConversion> {
    table().get(&from_unit.trim().to_lowercase())
}

/// Convert `value` from `from_unit` into `to_unit` when both share the same
/// SI target.
pub fn convert_unit(value: f64, from_unit: &str, to_unit: &str) -> Option<f64> {
    let from = unit_conversion(from_unit)?;
    let to = unit_conversion(to_unit)?;
    if from.to_unit != to.to_unit {
        return None;
    }
    Some(to.revert(from.convert(value)))
}
