//! Configuration
//!
//! Settings come from an optional JSON file, then `HEATMAP_*` environment
//! variables, then command-line flags (applied by the binary).

use crate::error::HeatmapError;
use crate::store::DEFAULT_COLLECTION;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default UTC offset of the measurement site (Indochina Time)
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;

/// Default interval of the current-hour ticker
pub const DEFAULT_TICK_SECONDS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    /// Collection holding the speed documents
    pub collection: String,
    /// Offset used for wall-clock time and local query days
    pub utc_offset_hours: i32,
    /// Document dump loaded into the in-process store
    pub data: Option<PathBuf>,
    /// Seconds between current-hour ticks
    pub tick_seconds: u64,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            data: None,
            tick_seconds: DEFAULT_TICK_SECONDS,
            log_level: "info".to_string(),
        }
    }
}

impl HeatmapConfig {
    pub fn from_json(json: &str) -> Result<Self, HeatmapError> {
        serde_json::from_str(json).map_err(|e| HeatmapError::ConfigError(e.to_string()))
    }

    /// Load from a file (if given) and apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, HeatmapError> {
        let mut config = match path {
            Some(path) => Self::from_json(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `HEATMAP_*` overrides from a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), HeatmapError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(collection) = lookup("HEATMAP_COLLECTION") {
            self.collection = collection;
        }
        if let Some(offset) = lookup("HEATMAP_UTC_OFFSET_HOURS") {
            self.utc_offset_hours = offset.trim().parse().map_err(|_| {
                HeatmapError::ConfigError(format!("HEATMAP_UTC_OFFSET_HOURS is not an integer: {}", offset))
            })?;
        }
        if let Some(data) = lookup("HEATMAP_DATA") {
            self.data = Some(PathBuf::from(data));
        }
        if let Some(tick) = lookup("HEATMAP_TICK_SECONDS") {
            self.tick_seconds = tick.trim().parse().map_err(|_| {
                HeatmapError::ConfigError(format!("HEATMAP_TICK_SECONDS is not an integer: {}", tick))
            })?;
        }
        if let Some(level) = lookup("HEATMAP_LOG_LEVEL") {
            self.log_level = level;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), HeatmapError> {
        if self.collection.trim().is_empty() {
            return Err(HeatmapError::ConfigError("collection is empty".to_string()));
        }
        if self.tick_seconds == 0 {
            return Err(HeatmapError::ConfigError("tick_seconds must be positive".to_string()));
        }
        self.utc_offset().map(|_| ())
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, HeatmapError> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| {
            HeatmapError::ConfigError(format!(
                "utc_offset_hours out of range: {}",
                self.utc_offset_hours
            ))
        })
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = HeatmapConfig::default();
        assert_eq!(config.collection, "slot");
        assert_eq!(config.utc_offset().unwrap().local_minus_utc(), 7 * 3600);
        assert_eq!(config.tick_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = HeatmapConfig::from_json(r#"{"utc_offset_hours": 9}"#).unwrap();
        assert_eq!(config.utc_offset_hours, 9);
        assert_eq!(config.collection, "slot");
        assert_eq!(config.tick_seconds, 60);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("HEATMAP_COLLECTION", "speeds"),
            ("HEATMAP_UTC_OFFSET_HOURS", "-3"),
            ("HEATMAP_DATA", "/tmp/slots.ndjson"),
        ]
        .into_iter()
        .collect();

        let mut config = HeatmapConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.collection, "speeds");
        assert_eq!(config.utc_offset_hours, -3);
        assert_eq!(config.data, Some(PathBuf::from("/tmp/slots.ndjson")));
    }

    #[test]
    fn test_invalid_overrides() {
        let mut config = HeatmapConfig::default();
        let err = config
            .apply_overrides(|key| (key == "HEATMAP_UTC_OFFSET_HOURS").then(|| "abc".to_string()))
            .unwrap_err();
        assert!(matches!(err, HeatmapError::ConfigError(_)));

        let mut config = HeatmapConfig::default();
        assert!(config
            .apply_overrides(|key| (key == "HEATMAP_UTC_OFFSET_HOURS").then(|| "30".to_string()))
            .is_err());

        let mut config = HeatmapConfig::default();
        assert!(config
            .apply_overrides(|key| (key == "HEATMAP_TICK_SECONDS").then(|| "0".to_string()))
            .is_err());
    }
}
