use crate::elevation::ElevationStats;
use crate::geodesic::segment_miles;
use crate::sample::GeoSample;
use std::collections::VecDeque;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Effect of one accepted sample on the running totals
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IngestOutcome {
    pub segment_miles: f64,
    pub elevation_gain: f64,
    pub evicted: bool,
}

/// Sample ingestion state: bounded retention buffer plus incrementally
/// maintained totals. Totals are updated on arrival and never recomputed
/// from the buffer, so eviction does not affect them.
#[derive(Debug, Clone)]
pub struct Ingestor {
    samples: VecDeque<GeoSample>,
    capacity: usize,
    previous: Option<GeoSample>,
    distance_miles: f64,
    speed_mph: f64,
    elevation: ElevationStats,
    location: Option<(f64, f64)>,
    samples_seen: u64,
    samples_rejected: u64,
}

impl Ingestor {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "ingestor capacity must be positive");
        Ingestor {
            samples: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            previous: None,
            distance_miles: 0.0,
            speed_mph: 0.0,
            elevation: ElevationStats::new(),
            location: None,
            samples_seen: 0,
            samples_rejected: 0,
        }
    }

    /// Fold one sample into the session, in arrival order
    pub fn ingest(&mut self, sample: GeoSample) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();

        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
            outcome.evicted = true;
        }

        if let Some(prev) = self.previous {
            let segment = segment_miles(&prev, &sample);
            self.distance_miles += segment;
            outcome.segment_miles = segment;

            // Non-positive or unrepresentable delta means a clock step or duplicate; keep last speed
            match sample.timestamp.checked_sub(prev.timestamp) {
                Some(dt_ms) if dt_ms > 0 => {
                    self.speed_mph = segment / (dt_ms as f64 / MS_PER_HOUR);
                }
                _ => {}
            }
        }

        if let Some(elevation) = sample.elevation {
            outcome.elevation_gain = self.elevation.observe(elevation);
        }

        self.location = Some(sample.coordinates());
        self.previous = Some(sample);
        self.samples_seen += 1;

        outcome
    }

    /// Count a fix that failed validation
    pub fn record_rejection(&mut self) {
        self.samples_rejected += 1;
    }

    pub fn clear(&mut self) {
        *self = Ingestor::new(self.capacity);
    }

    pub fn samples(&self) -> &VecDeque<GeoSample> {
        &self.samples
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn distance_miles(&self) -> f64 {
        self.distance_miles
    }

    pub fn speed_mph(&self) -> f64 {
        self.speed_mph
    }

    pub fn elevation(&self) -> &ElevationStats {
        &self.elevation
    }

    pub fn location(&self) -> Option<(f64, f64)> {
        self.location
    }

    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }

    pub fn samples_rejected(&self) -> u64 {
        self.samples_rejected
    }
}
