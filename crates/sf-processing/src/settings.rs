//! Per-station settings lookup
//!
//! Processors resolve configuration through a layered lookup: the fully
//! qualified `module.network.station.parameter` key in the application
//! configuration first, then the per-station key-value file. Missing keys
//! surface as typed configuration errors at setup time.

use std::collections::HashMap;
use std::path::Path;

use crate::{ConfigError, ConfigResult};

/// Recognized configuration keys of the processing layer.
pub mod keys {
    pub const FILTER: &str = "filter";
    pub const PRE_FILTER: &str = "preFilter";
    pub const NOISE_BEGIN: &str = "noiseBegin";
    pub const NOISE_END: &str = "noiseEnd";
    pub const SIGNAL_BEGIN: &str = "signalBegin";
    pub const SIGNAL_END: &str = "signalEnd";
    pub const MIN_SNR: &str = "minSNR";
    pub const MAXIMUM_GAP: &str = "maximumGap";
    pub const SATURATION_THRESHOLD: &str = "saturationThreshold";
    pub const COMBINER: &str = "combiner";
    pub const DISTANCE_MODE: &str = "distanceMode";
    pub const MIN_DISTANCE: &str = "minDistance";
    pub const MAX_DISTANCE: &str = "maxDistance";
    pub const MIN_DEPTH: &str = "minDepth";
    pub const MAX_DEPTH: &str = "maxDepth";
    pub const CALIBRATION_TYPE: &str = "calibrationType";
}

/// Settings view for one module/stream combination.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub module: String,
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
    /// Application-wide configuration.
    global: HashMap<String, String>,
    /// Station key-value parameters.
    station_keys: HashMap<String, String>,
}

impl Settings {
    pub fn new(
        module: impl Into<String>,
        network: impl Into<String>,
        station: impl Into<String>,
        location: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            network: network.into(),
            station: station.into(),
            location: location.into(),
            channel: channel.into(),
            global: HashMap::new(),
            station_keys: HashMap::new(),
        }
    }

    pub fn with_global(mut self, global: HashMap<String, String>) -> Self {
        self.global = global;
        self
    }

    pub fn with_station_keys(mut self, keys: HashMap<String, String>) -> Self {
        self.station_keys = keys;
        self
    }

    /// Load station keys from a flat JSON object file.
    pub fn load_station_keys(mut self, path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::BadParameter {
            name: path.display().to_string(),
            message: e.to_string(),
        })?;
        let parsed: HashMap<String, serde_json::Value> =
            serde_json::from_str(&text).map_err(|e| ConfigError::BadParameter {
                name: path.display().to_string(),
                message: e.to_string(),
            })?;
        self.station_keys = parsed
            .into_iter()
            .map(|(k, v)| {
                let s = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, s)
            })
            .collect();
        Ok(self)
    }

    /// Raw lookup: qualified application key first, then the station keys.
    pub fn value(&self, parameter: &str) -> Option<&str> {
        let qualified = format!(
            "{}.{}.{}.{parameter}",
            self.module, self.network, self.station
        );
        if let Some(v) = self.global.get(&qualified) {
            return Some(v.as_str());
        }
        self.station_keys.get(parameter).map(String::as_str)
    }

    pub fn get_string(&self, parameter: &str) -> ConfigResult<String> {
        self.value(parameter)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::MissingParameter(parameter.to_string()))
    }

    pub fn get_double(&self, parameter: &str) -> ConfigResult<f64> {
        let raw = self.get_string(parameter)?;
        raw.trim().parse().map_err(|_| ConfigError::BadParameter {
            name: parameter.to_string(),
            message: format!("'{raw}' is not a number"),
        })
    }

    pub fn get_int(&self, parameter: &str) -> ConfigResult<i64> {
        let raw = self.get_string(parameter)?;
        raw.trim().parse().map_err(|_| ConfigError::BadParameter {
            name: parameter.to_string(),
            message: format!("'{raw}' is not an integer"),
        })
    }

    pub fn get_bool(&self, parameter: &str) -> ConfigResult<bool> {
        let raw = self.get_string(parameter)?;
        match raw.trim() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(ConfigError::BadParameter {
                name: parameter.to_string(),
                message: format!("'{other}' is not a boolean"),
            }),
        }
    }

    /// Optional typed lookup: absent keys yield `None`, malformed values
    /// still error.
    pub fn try_double(&self, parameter: &str) -> ConfigResult<Option<f64>> {
        match self.value(parameter) {
            None => Ok(None),
            Some(_) => self.get_double(parameter).map(Some),
        }
    }

    pub fn try_string(&self, parameter: &str) -> Option<String> {
        self.value(parameter).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        let mut global = HashMap::new();
        global.insert("amp.GE.MORC.minSNR".to_string(), "4".to_string());
        let mut station = HashMap::new();
        station.insert("minSNR".to_string(), "2".to_string());
        station.insert("filter".to_string(), "BW(3,0.7,2)".to_string());
        Settings::new("amp", "GE", "MORC", "", "BHZ")
            .with_global(global)
            .with_station_keys(station)
    }

    #[test]
    fn test_qualified_key_wins() {
        let s = settings();
        assert_eq!(s.get_double("minSNR").unwrap(), 4.0);
    }

    #[test]
    fn test_station_key_fallback() {
        let s = settings();
        assert_eq!(s.get_string("filter").unwrap(), "BW(3,0.7,2)");
    }

    #[test]
    fn test_missing_and_malformed() {
        let s = settings();
        assert!(matches!(
            s.get_string("nope"),
            Err(ConfigError::MissingParameter(_))
        ));
        assert!(s.try_double("nope").unwrap().is_none());
        assert!(matches!(
            s.get_double("filter"),
            Err(ConfigError::BadParameter { .. })
        ));
    }

    #[test]
    fn test_load_station_keys_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("GE.MORC.json");
        std::fs::write(&path, r#"{"minSNR": 3.5, "combiner": "max"}"#).unwrap();
        let s = Settings::new("amp", "GE", "MORC", "", "BHZ")
            .load_station_keys(&path)
            .unwrap();
        assert_eq!(s.get_double("minSNR").unwrap(), 3.5);
        assert_eq!(s.get_string("combiner").unwrap(), "max");
    }
}
