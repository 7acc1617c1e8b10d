use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};

/// One timestamped position reading retained by a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoSample {
    /// Milliseconds since the Unix epoch, from the device clock
    pub timestamp: i64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
}

impl GeoSample {
    pub fn new(timestamp: i64, latitude: f64, longitude: f64, elevation: Option<f64>) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            elevation,
        }
    }

    pub fn coordinates(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// Raw reading as delivered by a position source.
///
/// Coordinates are optional because platform sources do not guarantee them;
/// fixes without usable coordinates are rejected at ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub altitude: Option<f64>,
    /// Source timestamp in ms; stamped with the tracker clock when absent
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl PositionFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            altitude: None,
            timestamp: None,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Validate coordinates and build a sample, stamping `now_ms` if the fix carries no time
    pub fn into_sample(self, now_ms: i64) -> Result<GeoSample> {
        let latitude = self
            .latitude
            .ok_or_else(|| TrackerError::InvalidSample("missing latitude".to_string()))?;
        let longitude = self
            .longitude
            .ok_or_else(|| TrackerError::InvalidSample("missing longitude".to_string()))?;

        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(TrackerError::InvalidSample(format!(
                "latitude out of range: {}",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(TrackerError::InvalidSample(format!(
                "longitude out of range: {}",
                longitude
            )));
        }

        let elevation = self.altitude.filter(|alt| alt.is_finite());

        Ok(GeoSample {
            timestamp: self.timestamp.unwrap_or(now_ms),
            latitude,
            longitude,
            elevation,
        })
    }
}
