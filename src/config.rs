use crate::activity::TerrainThresholds;
use crate::error::{Result, TrackerError};
use crate::source::WatchOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Maximum number of GPS points retained per activity
pub const MAX_GPS_POINTS: usize = 1000;

/// Tracker configuration. Every field has a default, so a partial JSON file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Retention buffer cap; older samples are evicted
    pub max_samples: usize,
    /// Elapsed-time tick cadence
    pub tick_interval_ms: u64,
    /// Fix acquisition timeout forwarded to the source
    pub fix_timeout_ms: u64,
    pub high_accuracy: bool,
    pub terrain: TerrainThresholds,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_samples: MAX_GPS_POINTS,
            tick_interval_ms: 1000,
            fix_timeout_ms: 15_000,
            high_accuracy: true,
            terrain: TerrainThresholds::default(),
        }
    }
}

impl TrackerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TrackerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            TrackerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_samples == 0 {
            return Err(TrackerError::Config(
                "max_samples must be greater than zero".to_string(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(TrackerError::Config(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.terrain.hilly > self.terrain.mountainous {
            return Err(TrackerError::Config(format!(
                "terrain.hilly ({}) exceeds terrain.mountainous ({})",
                self.terrain.hilly, self.terrain.mountainous
            )));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            high_accuracy: self.high_accuracy,
            timeout_ms: self.fix_timeout_ms,
            maximum_age_ms: 0,
        }
    }
}
