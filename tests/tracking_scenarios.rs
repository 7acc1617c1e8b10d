use approx::assert_abs_diff_eq;
use pawtrails_tracker::clock::ManualClock;
use pawtrails_tracker::storage::HikeRecord;
use pawtrails_tracker::{
    ChannelSource, PositionFix, SessionStatus, Terrain, Tracker, TrackerConfig, TrackerError,
};

type TestTracker = Tracker<ChannelSource, ManualClock>;

fn recording_tracker(config: TrackerConfig) -> (TestTracker, ChannelSource, ManualClock) {
    let source = ChannelSource::new();
    let clock = ManualClock::new(0);
    let mut tracker = Tracker::new(source.clone(), clock.clone(), config).unwrap();
    tracker.start();
    assert_eq!(tracker.status(), SessionStatus::Recording);
    (tracker, source, clock)
}

fn quiet_config() -> TrackerConfig {
    TrackerConfig {
        tick_interval_ms: 60_000,
        ..Default::default()
    }
}

#[test]
fn test_end_to_end_three_fix_hike() {
    let (mut tracker, source, clock) = recording_tracker(quiet_config());

    let fixes = [
        (47.0, 100.0, 0),
        (47.001, 110.0, 60_000),
        (47.002, 105.0, 120_000),
    ];
    for (lat, elevation, ts) in fixes {
        clock.set(ts);
        source.push_fix(
            PositionFix::new(lat, -122.0)
                .with_altitude(elevation)
                .with_timestamp(ts),
        );
        tracker.pump();
        tracker.tick();
    }
    tracker.stop();

    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Stopped);
    assert_abs_diff_eq!(snapshot.distance_miles, 0.138, epsilon = 1e-3);
    assert_eq!(snapshot.elevation_gain, 10.0);
    assert_eq!(snapshot.elevation_loss, 5.0);
    assert_eq!(snapshot.min_elevation, Some(100.0));
    assert_eq!(snapshot.max_elevation, Some(110.0));
    assert_eq!(snapshot.elapsed_seconds, 120);
    assert_eq!(snapshot.current_location, Some((47.002, -122.0)));
    // 2 minutes over ~0.138 mi
    assert_abs_diff_eq!(
        snapshot.average_pace_min_per_mile.unwrap(),
        2.0 / snapshot.distance_miles,
        epsilon = 1e-9
    );
}

#[test]
fn test_elevation_sequence_with_descent() {
    let (mut tracker, source, _) = recording_tracker(quiet_config());
    for (i, elevation) in [100.0, 90.0, 120.0].into_iter().enumerate() {
        source.push_fix(
            PositionFix::new(47.0, -122.0)
                .with_altitude(elevation)
                .with_timestamp(i as i64 * 1000),
        );
    }
    tracker.pump();

    let session = tracker.session();
    assert_eq!(session.cumulative_elevation_gain(), 30.0);
    assert_eq!(session.min_elevation(), Some(90.0));
    assert_eq!(session.max_elevation(), Some(120.0));
}

#[test]
fn test_buffer_cap_does_not_corrupt_totals() {
    let (mut tracker, source, _) = recording_tracker(quiet_config());
    let step = 0.0001;
    for i in 0..1500 {
        source.push_fix(
            PositionFix::new(47.0 + i as f64 * step, -122.0).with_timestamp(i * 1000),
        );
    }
    assert_eq!(tracker.pump(), 1500);

    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.retained_samples, 1000);
    assert_eq!(snapshot.samples_seen, 1500);
    let expected = 1499.0 * pawtrails_tracker::distance_miles(0.0, 0.0, step, 0.0);
    assert_abs_diff_eq!(snapshot.distance_miles, expected, epsilon = 1e-6);
}

#[test]
fn test_cumulative_distance_never_decreases() {
    let (mut tracker, source, _) = recording_tracker(quiet_config());
    // zig-zag with a duplicate and a backwards timestamp
    let path = [
        (47.0, -122.0, 0),
        (47.001, -122.001, 10_000),
        (47.0, -122.0, 20_000),
        (47.0, -122.0, 20_000),
        (47.002, -122.0, 15_000),
    ];
    let mut last = 0.0;
    for (lat, lon, ts) in path {
        source.push_fix(PositionFix::new(lat, lon).with_timestamp(ts));
        tracker.pump();
        let distance = tracker.snapshot().distance_miles;
        assert!(distance >= last);
        assert!(tracker.snapshot().current_speed_mph.is_finite());
        last = distance;
    }
}

#[test]
fn test_duplicate_timestamp_keeps_speed() {
    let (mut tracker, source, _) = recording_tracker(quiet_config());
    source.push_fix(PositionFix::new(47.0, -122.0).with_timestamp(0));
    source.push_fix(PositionFix::new(47.001, -122.0).with_timestamp(60_000));
    tracker.pump();
    let speed = tracker.snapshot().current_speed_mph;
    assert!(speed > 0.0);

    source.push_fix(PositionFix::new(47.002, -122.0).with_timestamp(60_000));
    tracker.pump();
    assert_eq!(tracker.snapshot().current_speed_mph, speed);
}

#[test]
fn test_lifecycle_idempotence_and_post_stop_silence() {
    let (mut tracker, source, clock) = recording_tracker(quiet_config());
    source.push_fix(PositionFix::new(47.0, -122.0).with_timestamp(0));
    source.push_fix(PositionFix::new(47.001, -122.0).with_timestamp(60_000));
    tracker.pump();

    tracker.start();
    assert_eq!(source.subscribe_count(), 1);
    assert!(tracker.snapshot().distance_miles > 0.0);

    tracker.stop();
    let frozen = tracker.snapshot();
    tracker.stop();
    assert_eq!(tracker.snapshot(), frozen);

    clock.advance(30_000);
    source.push_fix(PositionFix::new(48.0, -121.0).with_timestamp(90_000));
    source.push_error(TrackerError::Timeout(15_000));
    tracker.pump();
    tracker.tick();
    assert_eq!(tracker.snapshot(), frozen);

    tracker.reset();
    assert_eq!(tracker.status(), SessionStatus::Idle);
    assert_eq!(tracker.snapshot().distance_miles, 0.0);
}

#[test]
fn test_stopped_session_to_hike_record() {
    let (mut tracker, source, clock) = recording_tracker(quiet_config());
    // 0.01 degree north every two minutes, climbing 60 ft each time
    for i in 0..6 {
        let ts = i * 120_000;
        clock.set(ts);
        source.push_fix(
            PositionFix::new(47.0 + i as f64 * 0.01, -122.0)
                .with_altitude(100.0 + i as f64 * 60.0)
                .with_timestamp(ts),
        );
        tracker.pump();
        tracker.tick();
    }
    tracker.stop();

    let record = HikeRecord::from_session(
        tracker.session(),
        "pet-42",
        Some("Tiger Mountain"),
        &tracker.config().terrain,
    )
    .unwrap();

    assert_eq!(record.duration, 10);
    assert_eq!(record.distance, 3.45);
    assert_eq!(record.elevation_gain, Some(300));
    assert_eq!(record.terrain, Terrain::Hilly);
    assert_eq!(record.gps_data.len(), 6);
    assert_eq!(record.custom_trail_name, "Tiger Mountain");
}
