use crate::activity::{average_pace_min_per_mile, ActivityType, Terrain, TerrainThresholds};
use crate::error::TrackerError;
use crate::ingest::Ingestor;
use crate::sample::GeoSample;
use serde::{Deserialize, Serialize};

/// Session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Constructed or reset, nothing recorded
    Idle,
    /// Subscribed to the position source and ticking
    Recording,
    /// Ingestion halted, totals frozen
    Stopped,
}

/// Aggregate state of one recording. Owned and mutated only by the tracker.
#[derive(Debug, Clone)]
pub struct TrackingSession {
    pub(crate) status: SessionStatus,
    pub(crate) started_at: Option<i64>,
    pub(crate) stopped_at: Option<i64>,
    pub(crate) elapsed_seconds: u64,
    pub(crate) error: Option<TrackerError>,
    pub(crate) track: Ingestor,
    /// Fix from the last one-shot lookup; outlives start and reset
    pub(crate) located: Option<GeoSample>,
    pub(crate) is_loading: bool,
}

impl TrackingSession {
    pub fn new(max_samples: usize) -> Self {
        TrackingSession {
            status: SessionStatus::Idle,
            started_at: None,
            stopped_at: None,
            elapsed_seconds: 0,
            error: None,
            track: Ingestor::new(max_samples),
            located: None,
            is_loading: false,
        }
    }

    /// Zero all cumulative fields and enter Recording
    pub(crate) fn begin(&mut self, now_ms: i64) {
        self.track.clear();
        self.status = SessionStatus::Recording;
        self.started_at = Some(now_ms);
        self.stopped_at = None;
        self.elapsed_seconds = 0;
        self.error = None;
    }

    pub(crate) fn finish(&mut self, now_ms: i64) {
        self.status = SessionStatus::Stopped;
        self.stopped_at = Some(now_ms);
    }

    /// Back to Idle with every field cleared
    pub(crate) fn clear(&mut self) {
        self.track.clear();
        self.status = SessionStatus::Idle;
        self.started_at = None;
        self.stopped_at = None;
        self.elapsed_seconds = 0;
        self.error = None;
    }

    /// Recompute elapsed seconds from the wall clock rather than counting ticks
    pub(crate) fn update_elapsed(&mut self, now_ms: i64) {
        if let Some(started) = self.started_at {
            self.elapsed_seconds = (now_ms.saturating_sub(started).max(0) / 1000) as u64;
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_recording(&self) -> bool {
        self.status == SessionStatus::Recording
    }

    pub fn started_at(&self) -> Option<i64> {
        self.started_at
    }

    pub fn stopped_at(&self) -> Option<i64> {
        self.stopped_at
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn error(&self) -> Option<&TrackerError> {
        self.error.as_ref()
    }

    /// True while a one-shot location lookup is waiting for its fix
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn located(&self) -> Option<&GeoSample> {
        self.located.as_ref()
    }

    pub fn samples(&self) -> impl Iterator<Item = &GeoSample> {
        self.track.samples().iter()
    }

    pub fn track(&self) -> &Ingestor {
        &self.track
    }

    pub fn cumulative_distance(&self) -> f64 {
        self.track.distance_miles()
    }

    pub fn cumulative_elevation_gain(&self) -> f64 {
        self.track.elevation().gain
    }

    pub fn min_elevation(&self) -> Option<f64> {
        self.track.elevation().min
    }

    pub fn max_elevation(&self) -> Option<f64> {
        self.track.elevation().max
    }

    pub fn current_speed(&self) -> f64 {
        self.track.speed_mph()
    }

    /// Latest recorded position, falling back to the last located fix
    pub fn current_location(&self) -> Option<(f64, f64)> {
        self.track
            .location()
            .or_else(|| self.located.map(|fix| fix.coordinates()))
    }

    pub fn current_elevation(&self) -> Option<f64> {
        self.track
            .elevation()
            .last
            .or_else(|| self.located.and_then(|fix| fix.elevation))
    }

    pub fn snapshot(&self, terrain: &TerrainThresholds) -> TrackingSnapshot {
        let elevation = self.track.elevation();
        TrackingSnapshot {
            status: self.status,
            started_at: self.started_at,
            elapsed_seconds: self.elapsed_seconds,
            distance_miles: self.track.distance_miles(),
            elevation_gain: elevation.gain,
            elevation_loss: elevation.loss,
            min_elevation: elevation.min,
            max_elevation: elevation.max,
            current_elevation: self.current_elevation(),
            current_speed_mph: self.track.speed_mph(),
            average_pace_min_per_mile: average_pace_min_per_mile(
                self.elapsed_seconds,
                self.track.distance_miles(),
            ),
            activity: ActivityType::from_speed(self.track.speed_mph()),
            terrain: Terrain::classify(elevation.gain, terrain),
            current_location: self.current_location(),
            retained_samples: self.track.samples().len(),
            samples_seen: self.track.samples_seen(),
            samples_rejected: self.track.samples_rejected(),
            is_loading: self.is_loading,
            error: self.error.as_ref().map(|e| e.to_string()),
        }
    }
}

/// Read-only view handed to presenters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSnapshot {
    pub status: SessionStatus,
    pub started_at: Option<i64>,
    pub elapsed_seconds: u64,
    pub distance_miles: f64,
    pub elevation_gain: f64,
    pub elevation_loss: f64,
    pub min_elevation: Option<f64>,
    pub max_elevation: Option<f64>,
    pub current_elevation: Option<f64>,
    pub current_speed_mph: f64,
    pub average_pace_min_per_mile: Option<f64>,
    pub activity: ActivityType,
    pub terrain: Terrain,
    pub current_location: Option<(f64, f64)>,
    pub retained_samples: usize,
    pub samples_seen: u64,
    pub samples_rejected: u64,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle_and_empty() {
        let session = TrackingSession::new(1000);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(!session.is_recording());
        assert_eq!(session.cumulative_distance(), 0.0);
        assert_eq!(session.min_elevation(), None);
        assert_eq!(session.samples().count(), 0);
    }

    #[test]
    fn test_elapsed_recomputed_from_wall_clock() {
        let mut session = TrackingSession::new(10);
        session.begin(10_000);
        session.update_elapsed(12_999);
        assert_eq!(session.elapsed_seconds(), 2);
        session.update_elapsed(71_000);
        assert_eq!(session.elapsed_seconds(), 61);
        // clock stepped backwards
        session.update_elapsed(5_000);
        assert_eq!(session.elapsed_seconds(), 0);
    }

    #[test]
    fn test_elapsed_saturates_on_extreme_clock() {
        let mut session = TrackingSession::new(10);
        session.begin(i64::MIN);
        session.update_elapsed(i64::MAX);
        assert_eq!(session.elapsed_seconds(), (i64::MAX / 1000) as u64);

        session.begin(i64::MAX);
        session.update_elapsed(i64::MIN);
        assert_eq!(session.elapsed_seconds(), 0);
    }

    #[test]
    fn test_begin_clears_previous_totals() {
        let mut session = TrackingSession::new(10);
        session.begin(0);
        session.track.ingest(GeoSample::new(0, 47.0, -122.0, Some(1.0)));
        session.track.ingest(GeoSample::new(1000, 47.1, -122.0, Some(9.0)));
        session.error = Some(TrackerError::Timeout(1));
        session.finish(2000);

        session.begin(5000);
        assert_eq!(session.status(), SessionStatus::Recording);
        assert_eq!(session.cumulative_distance(), 0.0);
        assert_eq!(session.cumulative_elevation_gain(), 0.0);
        assert_eq!(session.error(), None);
        assert_eq!(session.started_at(), Some(5000));
        assert_eq!(session.stopped_at(), None);
    }

    #[test]
    fn test_located_fix_fills_in_until_recorded() {
        let mut session = TrackingSession::new(10);
        session.located = Some(GeoSample::new(0, 46.5, -121.5, Some(800.0)));
        assert_eq!(session.current_location(), Some((46.5, -121.5)));
        assert_eq!(session.current_elevation(), Some(800.0));

        session.begin(1000);
        assert_eq!(session.current_location(), Some((46.5, -121.5)));
        session.track.ingest(GeoSample::new(1000, 47.0, -122.0, None));
        assert_eq!(session.current_location(), Some((47.0, -122.0)));
        assert_eq!(session.current_elevation(), Some(800.0));

        session.clear();
        assert_eq!(session.current_location(), Some((46.5, -121.5)));
        assert_eq!(session.cumulative_distance(), 0.0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut session = TrackingSession::new(10);
        session.begin(0);
        session.track.ingest(GeoSample::new(0, 47.0, -122.0, Some(100.0)));
        session.track.ingest(GeoSample::new(60_000, 47.001, -122.0, Some(350.0)));
        session.update_elapsed(60_000);

        let snapshot = session.snapshot(&TerrainThresholds::default());
        assert_eq!(snapshot.status, SessionStatus::Recording);
        assert_eq!(snapshot.terrain, Terrain::Hilly);
        assert_eq!(snapshot.activity, ActivityType::Hike);
        assert!(snapshot.average_pace_min_per_mile.is_some());

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"Recording\""));
    }
}
