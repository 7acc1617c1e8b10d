use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::info;
use pawtrails_tracker::clock::{Clock, ManualClock, SystemClock};
use pawtrails_tracker::storage::{create_gpx_track, to_gpx_xml, HikeRecord};
use pawtrails_tracker::{ChannelSource, PositionFix, Tracker, TrackerConfig};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "pawtrails-replay")]
#[command(about = "Replay a recorded track through the PawTrails tracking engine", long_about = None)]
struct Args {
    /// Track file: {"fixes": [{"latitude", "longitude", "altitude"?, "timestamp"?}, ...]}
    #[arg(long)]
    track: PathBuf,

    /// Tracker configuration JSON (defaults used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pet the hike record is attributed to
    #[arg(long, default_value = "replay-pet")]
    pet_id: String,

    /// Trail name for the hike record
    #[arg(long)]
    trail_name: Option<String>,

    /// Write the retained track as GPX
    #[arg(long)]
    gpx: Option<PathBuf>,

    /// Write the derived hike record as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Feed fixes on a background thread at recorded pace, on the system clock
    #[arg(long, default_value_t = false)]
    realtime: bool,

    /// Playback speed multiplier for --realtime
    #[arg(long, default_value = "1.0")]
    speedup: f64,
}

#[derive(Deserialize)]
struct TrackFile {
    fixes: Vec<PositionFix>,
}

/// Spacing used for fixes that carry no timestamp
const DEFAULT_FIX_SPACING_MS: i64 = 5000;

fn load_track(path: &Path) -> anyhow::Result<TrackFile> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

/// Feed every fix through the tracker as fast as possible on a simulated clock
fn replay_fast(
    fixes: &[PositionFix],
    config: TrackerConfig,
) -> anyhow::Result<Tracker<ChannelSource, ManualClock>> {
    let source = ChannelSource::new();
    let start_ms = fixes.iter().find_map(|f| f.timestamp).unwrap_or(0);
    let clock = ManualClock::new(start_ms);
    let mut tracker = Tracker::new(source.clone(), clock.clone(), config)?;

    tracker.start();
    let mut now = start_ms;
    for fix in fixes {
        now = fix.timestamp.unwrap_or(now + DEFAULT_FIX_SPACING_MS);
        clock.set(now);
        source.push_fix(*fix);
        tracker.pump();
        tracker.tick();
    }
    tracker.stop();
    Ok(tracker)
}

/// Feed fixes from a producer thread and drive the tracker's blocking event loop
fn replay_realtime(
    fixes: Vec<PositionFix>,
    config: TrackerConfig,
    speedup: f64,
) -> anyhow::Result<Tracker<ChannelSource, SystemClock>> {
    let source = ChannelSource::new();
    let mut tracker = Tracker::new(source.clone(), SystemClock, config)?;
    tracker.start();
    if !tracker.is_recording() {
        return Ok(tracker);
    }

    let speedup = if speedup > 0.0 { speedup } else { 1.0 };
    let producer = thread::spawn(move || {
        let mut previous: Option<i64> = None;
        for fix in fixes {
            let gap_ms = match (previous, fix.timestamp) {
                (Some(prev), Some(ts)) => ts.saturating_sub(prev).max(0),
                (None, _) => 0,
                _ => DEFAULT_FIX_SPACING_MS,
            };
            thread::sleep(Duration::from_secs_f64(gap_ms as f64 / 1000.0 / speedup));
            previous = fix.timestamp.or(previous);
            source.push_fix(fix);
        }
        source.disconnect();
    });

    while tracker.is_recording() && !tracker.is_source_closed() {
        tracker.wait(Duration::from_millis(250));
    }
    tracker.pump();
    tracker.stop();

    producer
        .join()
        .map_err(|_| anyhow::anyhow!("replay producer thread panicked"))?;
    Ok(tracker)
}

fn report<C: Clock>(tracker: &Tracker<ChannelSource, C>, args: &Args) -> anyhow::Result<()> {
    let snapshot = tracker.snapshot();
    println!("Replay complete ({:?})", snapshot.status);
    println!(
        "  Fixes accepted: {} (rejected {})",
        snapshot.samples_seen, snapshot.samples_rejected
    );
    println!("  Retained points: {}", snapshot.retained_samples);
    println!("  Distance: {:.3} mi", snapshot.distance_miles);
    println!("  Elapsed: {} s", snapshot.elapsed_seconds);
    if let Some(pace) = snapshot.average_pace_min_per_mile {
        println!("  Average pace: {:.1} min/mi", pace);
    }
    println!(
        "  Elevation: +{:.0} / -{:.0} (min {:?}, max {:?})",
        snapshot.elevation_gain,
        snapshot.elevation_loss,
        snapshot.min_elevation,
        snapshot.max_elevation
    );
    println!("  Terrain: {:?}, last activity: {:?}", snapshot.terrain, snapshot.activity);
    if let Some(err) = &snapshot.error {
        println!("  Source error: {}", err);
    }

    if let Some(path) = &args.gpx {
        let samples: Vec<_> = tracker.session().samples().copied().collect();
        let name = args.trail_name.as_deref().unwrap_or("PawTrails replay");
        let description = format!("Replayed from {}", args.track.display());
        let track = create_gpx_track(name, &description, &samples);
        fs::write(path, to_gpx_xml(&track)?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("wrote GPX with {} points to {}", samples.len(), path.display());
    }

    if let Some(path) = &args.json {
        let record = HikeRecord::from_session(
            tracker.session(),
            &args.pet_id,
            args.trail_name.as_deref(),
            &tracker.config().terrain,
        )?;
        fs::write(path, record.to_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("wrote hike record to {}", path.display());
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TrackerConfig::from_json_file(path)?,
        None => TrackerConfig::default(),
    };
    let track = load_track(&args.track)?;
    info!("loaded {} fixes from {}", track.fixes.len(), args.track.display());

    if args.realtime {
        let tracker = replay_realtime(track.fixes, config, args.speedup)?;
        report(&tracker, &args)
    } else {
        let tracker = replay_fast(&track.fixes, config)?;
        report(&tracker, &args)
    }
}
