use crate::activity::{ActivityType, Terrain, TerrainThresholds};
use crate::error::{Result, TrackerError};
use crate::sample::GeoSample;
use crate::session::TrackingSession;
use chrono::{DateTime, Utc};
use geo_types::Point;
use gpx::{Gpx, GpxVersion, Metadata, Time, Track, TrackSegment, Waypoint};
use serde::{Deserialize, Serialize};
use std::io::Write;
use time::OffsetDateTime;

/// Hike record derived from a finished session, in the shape the app persists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HikeRecord {
    pub pet_id: String,
    /// YYYY-MM-DD of the session start
    pub date: String,
    /// Whole minutes
    pub duration: u64,
    /// Miles, rounded to 2 decimals
    pub distance: f64,
    pub custom_trail_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub activity_type: ActivityType,
    pub terrain: Terrain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation_gain: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_elevation: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_elevation: Option<i64>,
    pub gps_data: Vec<GeoSample>,
}

impl HikeRecord {
    /// Build a record from a stopped session. Fails if the session is still
    /// recording, the pet id is empty, or no distance or whole minute was logged.
    pub fn from_session(
        session: &TrackingSession,
        pet_id: &str,
        trail_name: Option<&str>,
        terrain: &TerrainThresholds,
    ) -> Result<Self> {
        if session.is_recording() {
            return Err(TrackerError::InvalidRecord(
                "session is still recording".to_string(),
            ));
        }
        if pet_id.trim().is_empty() {
            return Err(TrackerError::InvalidRecord("pet id is required".to_string()));
        }

        let distance = round_to(session.cumulative_distance(), 2);
        if distance <= 0.0 {
            return Err(TrackerError::InvalidRecord(
                "valid distance is required".to_string(),
            ));
        }
        let duration = session.elapsed_seconds() / 60;
        if duration == 0 {
            return Err(TrackerError::InvalidRecord(
                "valid duration is required".to_string(),
            ));
        }

        let date = session
            .started_at()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_else(Utc::now)
            .format("%Y-%m-%d")
            .to_string();

        let gain = session.cumulative_elevation_gain();

        Ok(HikeRecord {
            pet_id: pet_id.to_string(),
            custom_trail_name: trail_name
                .map(str::to_string)
                .unwrap_or_else(|| format!("Activity on {}", date)),
            date,
            duration,
            distance,
            notes: None,
            activity_type: ActivityType::from_speed(session.current_speed()),
            terrain: Terrain::classify(gain, terrain),
            elevation_gain: (gain > 0.0).then(|| gain.round() as i64),
            min_elevation: session.min_elevation().map(|e| e.round() as i64),
            max_elevation: session.max_elevation().map(|e| e.round() as i64),
            gps_data: session.samples().copied().collect(),
        })
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Build a GPX 1.1 document with one track from retained samples
pub fn create_gpx_track(name: &str, description: &str, samples: &[GeoSample]) -> Gpx {
    let mut segment = TrackSegment::new();
    segment.points = samples.iter().map(track_point).collect();

    let mut track = Track::new();
    track.name = Some(name.to_string());
    track.segments.push(segment);

    let mut gpx = Gpx::default();
    gpx.version = GpxVersion::Gpx11;
    gpx.creator = Some("PawTrails".to_string());
    gpx.metadata = Some(Metadata {
        name: Some(name.to_string()),
        description: Some(description.to_string()),
        time: samples.first().and_then(|s| gpx_time(s.timestamp)),
        ..Default::default()
    });
    gpx.tracks.push(track);
    gpx
}

fn track_point(sample: &GeoSample) -> Waypoint {
    let mut point = Waypoint::new(Point::new(sample.longitude, sample.latitude));
    point.elevation = sample.elevation;
    point.time = gpx_time(sample.timestamp);
    point
}

fn gpx_time(timestamp_ms: i64) -> Option<Time> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(timestamp_ms) * 1_000_000)
        .ok()
        .map(Time::from)
}

pub fn write_gpx<W: Write>(gpx: &Gpx, writer: W) -> Result<()> {
    gpx::write(gpx, writer).map_err(|e| TrackerError::Serialization(e.to_string()))
}

/// Serialize a GPX document to an XML string
pub fn to_gpx_xml(gpx: &Gpx) -> Result<String> {
    let mut buf = Vec::new();
    write_gpx(gpx, &mut buf)?;
    String::from_utf8(buf).map_err(|e| TrackerError::Serialization(e.to_string()))
}
