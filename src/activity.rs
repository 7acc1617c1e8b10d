use serde::{Deserialize, Serialize};

/// Activity inferred from current speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityType {
    Hike,
    Walk,
    Run,
    Play,
}

impl ActivityType {
    /// Classify by instantaneous speed in mph
    pub fn from_speed(mph: f64) -> Self {
        if mph < 0.1 {
            ActivityType::Play
        } else if mph < 2.5 {
            ActivityType::Walk
        } else if mph < 5.0 {
            ActivityType::Hike
        } else {
            ActivityType::Run
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terrain {
    Flat,
    Hilly,
    Mountainous,
    Unknown,
}

/// Cumulative-gain cutoffs for terrain classification, in session elevation units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainThresholds {
    pub hilly: f64,
    pub mountainous: f64,
}

impl Default for TerrainThresholds {
    fn default() -> Self {
        Self {
            hilly: 200.0,
            mountainous: 500.0,
        }
    }
}

impl Terrain {
    pub fn classify(elevation_gain: f64, thresholds: &TerrainThresholds) -> Self {
        if elevation_gain <= 0.0 || !elevation_gain.is_finite() {
            Terrain::Unknown
        } else if elevation_gain > thresholds.mountainous {
            Terrain::Mountainous
        } else if elevation_gain > thresholds.hilly {
            Terrain::Hilly
        } else {
            Terrain::Flat
        }
    }
}

/// Average pace in minutes per mile, or None before any distance or time has accrued
pub fn average_pace_min_per_mile(elapsed_seconds: u64, distance_miles: f64) -> Option<f64> {
    if elapsed_seconds == 0 || distance_miles <= 0.0 {
        return None;
    }
    Some((elapsed_seconds as f64 / 60.0) / distance_miles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_from_speed() {
        assert_eq!(ActivityType::from_speed(0.0), ActivityType::Play);
        assert_eq!(ActivityType::from_speed(1.5), ActivityType::Walk);
        assert_eq!(ActivityType::from_speed(2.5), ActivityType::Hike);
        assert_eq!(ActivityType::from_speed(4.9), ActivityType::Hike);
        assert_eq!(ActivityType::from_speed(6.0), ActivityType::Run);
    }

    #[test]
    fn test_terrain_classification() {
        let t = TerrainThresholds::default();
        assert_eq!(Terrain::classify(0.0, &t), Terrain::Unknown);
        assert_eq!(Terrain::classify(150.0, &t), Terrain::Flat);
        assert_eq!(Terrain::classify(200.0, &t), Terrain::Flat);
        assert_eq!(Terrain::classify(350.0, &t), Terrain::Hilly);
        assert_eq!(Terrain::classify(800.0, &t), Terrain::Mountainous);

        let metric = TerrainThresholds {
            hilly: 60.0,
            mountainous: 150.0,
        };
        assert_eq!(Terrain::classify(100.0, &metric), Terrain::Hilly);
    }

    #[test]
    fn test_average_pace() {
        assert_eq!(average_pace_min_per_mile(0, 1.0), None);
        assert_eq!(average_pace_min_per_mile(600, 0.0), None);
        // 30 minutes over 2 miles
        assert_eq!(average_pace_min_per_mile(1800, 2.0), Some(15.0));
    }
}
