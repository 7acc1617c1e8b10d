// PawTrails activity tracking engine
// Turns a live stream of position fixes into trip statistics for one recording session

pub mod activity;
pub mod clock;
pub mod config;
pub mod elevation;
pub mod error;
pub mod geodesic;
pub mod ingest;
pub mod sample;
pub mod session;
pub mod source;
pub mod storage;
pub mod tracker;

pub use activity::{ActivityType, Terrain, TerrainThresholds};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TrackerConfig;
pub use error::{Result, TrackerError};
pub use geodesic::distance_miles;
pub use sample::{GeoSample, PositionFix};
pub use session::{SessionStatus, TrackingSession, TrackingSnapshot};
pub use source::{ChannelSource, PositionEvent, PositionSource, Subscription, WatchOptions};
pub use storage::HikeRecord;
pub use tracker::Tracker;
