use crate::sample::GeoSample;
use serde::{Deserialize, Serialize};

/// Incremental gain between two elevation readings.
///
/// Zero when either reading is missing or the current one is not higher.
pub fn elevation_gain(previous: Option<f64>, current: Option<f64>) -> f64 {
    match (previous, current) {
        (Some(prev), Some(curr)) if curr > prev => curr - prev,
        _ => 0.0,
    }
}

/// Running elevation aggregate over the elevation-bearing samples of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElevationStats {
    pub gain: f64,
    pub loss: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Last elevation reading seen
    pub last: Option<f64>,
}

impl ElevationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one reading and return the gain it contributed.
    ///
    /// The first reading only seeds min/max.
    pub fn observe(&mut self, elevation: f64) -> f64 {
        let gained = elevation_gain(self.last, Some(elevation));
        if let Some(prev) = self.last {
            if elevation < prev {
                self.loss += prev - elevation;
            }
        }
        self.gain += gained;

        self.min = Some(self.min.map_or(elevation, |m| m.min(elevation)));
        self.max = Some(self.max.map_or(elevation, |m| m.max(elevation)));
        self.last = Some(elevation);

        gained
    }

    /// Batch summary over a track; samples without elevation are skipped
    pub fn from_samples(points: &[GeoSample]) -> Self {
        let mut stats = Self::new();
        for elevation in points.iter().filter_map(|p| p.elevation) {
            stats.observe(elevation);
        }
        stats
    }

    pub fn has_readings(&self) -> bool {
        self.last.is_some()
    }
}
