//! Session lifecycle controller.
//!
//! `Tracker` owns the [`TrackingSession`] and is its only writer. While
//! recording it holds a position subscription and an elapsed-time ticker,
//! both delivered as channels and handled on the owning thread by
//! [`Tracker::pump`] or [`Tracker::wait`].
//!
//! ```text
//! Idle --start--> Recording --stop--> Stopped --reset--> Idle
//!                     ^                   |
//!                     +------start--------+
//! ```
//!
//! Outside of recording, [`Tracker::locate`] runs a one-shot lookup: it
//! subscribes, keeps the first valid fix as the current location and
//! releases the source. The lookup gives up after `fix_timeout_ms` on the
//! tracker's clock.

use crate::clock::{Clock, SystemClock};
use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::session::{SessionStatus, TrackingSession, TrackingSnapshot};
use crate::source::{PositionEvent, PositionSource, Subscription};
use crossbeam::channel::{self, Receiver, TryRecvError};
use log::{debug, info, warn};
use std::time::{Duration, Instant};

/// Live resources held only while recording
struct Feed {
    subscription: Subscription,
    events: Receiver<PositionEvent>,
    ticker: Receiver<Instant>,
    source_closed: bool,
}

impl Feed {
    fn close(mut self) {
        self.subscription.cancel();
        // receivers drop here; anything still queued is discarded
    }
}

/// In-flight one-shot location lookup
struct Lookup {
    subscription: Subscription,
    events: Receiver<PositionEvent>,
    deadline_ms: i64,
}

enum Step {
    Event(std::result::Result<PositionEvent, channel::RecvError>),
    Located(std::result::Result<PositionEvent, channel::RecvError>),
    Tick,
    Idle,
}

pub struct Tracker<S: PositionSource, C: Clock = SystemClock> {
    source: S,
    clock: C,
    config: TrackerConfig,
    session: TrackingSession,
    feed: Option<Feed>,
    lookup: Option<Lookup>,
}

impl<S: PositionSource> Tracker<S, SystemClock> {
    /// Tracker on the device clock with default configuration
    pub fn with_source(source: S) -> Self {
        let config = TrackerConfig::default();
        Tracker {
            session: TrackingSession::new(config.max_samples),
            source,
            clock: SystemClock,
            config,
            feed: None,
            lookup: None,
        }
    }
}

impl<S: PositionSource, C: Clock> Tracker<S, C> {
    pub fn new(source: S, clock: C, config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Tracker {
            session: TrackingSession::new(config.max_samples),
            source,
            clock,
            config,
            feed: None,
            lookup: None,
        })
    }

    /// Begin recording. Idempotent while already recording.
    ///
    /// Failures are recorded on the session instead of returned; the tracker
    /// stays usable and `start` may be retried.
    pub fn start(&mut self) {
        if self.session.is_recording() {
            debug!("start ignored: session already recording");
            return;
        }

        if !self.source.is_available() {
            warn!("position source unavailable, recording not started");
            self.session.error = Some(TrackerError::SourceUnavailable(
                "Geolocation is not supported by this runtime".to_string(),
            ));
            return;
        }

        if self.lookup.is_some() {
            debug!("recording supersedes pending location lookup");
            self.finish_lookup(None);
        }

        let (sink, events) = channel::unbounded();
        let subscription = match self.source.subscribe(sink, self.config.watch_options()) {
            Ok(subscription) => subscription,
            Err(err) => {
                warn!("position subscription failed: {}", err);
                self.session.error = Some(err);
                return;
            }
        };

        let now = self.clock.now_millis();
        self.session.begin(now);
        self.feed = Some(Feed {
            subscription,
            events,
            ticker: channel::tick(self.config.tick_interval()),
            source_closed: false,
        });
        info!(
            "recording started at {} (buffer cap {}, tick {} ms)",
            now, self.config.max_samples, self.config.tick_interval_ms
        );
    }

    /// Look up the current position once, without recording.
    ///
    /// Ignored while recording or while a lookup is already in flight. The
    /// result arrives through [`Tracker::pump`] or [`Tracker::wait`]; failures
    /// and the timeout are recorded on the session.
    pub fn locate(&mut self) {
        if self.session.is_recording() {
            debug!("locate ignored: session is recording");
            return;
        }
        if self.lookup.is_some() {
            debug!("locate ignored: lookup already in flight");
            return;
        }

        if !self.source.is_available() {
            warn!("position source unavailable, cannot locate");
            self.session.error = Some(TrackerError::SourceUnavailable(
                "Geolocation is not supported by this runtime".to_string(),
            ));
            return;
        }

        let (sink, events) = channel::unbounded();
        let subscription = match self.source.subscribe(sink, self.config.watch_options()) {
            Ok(subscription) => subscription,
            Err(err) => {
                warn!("location lookup failed: {}", err);
                self.session.error = Some(err);
                return;
            }
        };

        let timeout_ms = i64::try_from(self.config.fix_timeout_ms).unwrap_or(i64::MAX);
        self.lookup = Some(Lookup {
            subscription,
            events,
            deadline_ms: self.clock.now_millis().saturating_add(timeout_ms),
        });
        self.session.is_loading = true;
        self.session.error = None;
        debug!("location lookup started ({} ms timeout)", timeout_ms);
    }

    /// Stop recording and freeze totals. No-op unless recording.
    pub fn stop(&mut self) {
        if !self.session.is_recording() {
            debug!("stop ignored: session is {:?}", self.session.status());
            return;
        }
        self.release_feed();
        let now = self.clock.now_millis();
        self.session.finish(now);
        info!(
            "recording stopped: {:.3} mi, +{:.0} elevation, {} s",
            self.session.cumulative_distance(),
            self.session.cumulative_elevation_gain(),
            self.session.elapsed_seconds()
        );
    }

    /// Clear the session back to Idle, stopping first if still recording
    pub fn reset(&mut self) {
        if self.session.is_recording() {
            self.stop();
        }
        self.release_feed();
        self.session.clear();
        debug!("session reset");
    }

    /// Elapsed-time tick handler
    pub fn tick(&mut self) {
        if !self.session.is_recording() {
            return;
        }
        let now = self.clock.now_millis();
        self.session.update_elapsed(now);
        debug!("tick: elapsed {} s", self.session.elapsed_seconds());
    }

    /// Handle every queued source event in arrival order, then any due tick.
    /// Never blocks. Returns the number of source events handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(next) = self.feed.as_ref().map(|feed| feed.events.try_recv()) {
            match next {
                Ok(event) => {
                    self.handle_event(event);
                    handled += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.handle_source_closed();
                    break;
                }
            }
        }

        let tick_due = self
            .feed
            .as_ref()
            .map(|feed| feed.ticker.try_iter().count() > 0)
            .unwrap_or(false);
        if tick_due {
            self.tick();
        }

        self.poll_lookup();
        handled
    }

    /// Block up to `timeout` for the next source event or tick and handle it.
    /// Returns false if nothing happened or the tracker is neither recording
    /// nor locating.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        let step = match (&self.feed, &self.lookup) {
            (Some(feed), _) => channel::select! {
                recv(feed.events) -> msg => Step::Event(msg),
                recv(feed.ticker) -> _ => Step::Tick,
                default(timeout) => Step::Idle,
            },
            (None, Some(lookup)) => channel::select! {
                recv(lookup.events) -> msg => Step::Located(msg),
                default(timeout) => Step::Idle,
            },
            (None, None) => return false,
        };

        match step {
            Step::Event(Ok(event)) => self.handle_event(event),
            Step::Event(Err(_)) => self.handle_source_closed(),
            Step::Located(Ok(event)) => self.handle_lookup_event(event),
            Step::Located(Err(_)) => self.finish_lookup(Some(lookup_closed())),
            Step::Tick => self.tick(),
            Step::Idle => {
                let pending = self.lookup.is_some();
                self.expire_lookup();
                return pending && self.lookup.is_none();
            }
        }
        true
    }

    fn poll_lookup(&mut self) {
        let next = match &self.lookup {
            Some(lookup) => lookup.events.try_recv(),
            None => return,
        };
        match next {
            Ok(event) => self.handle_lookup_event(event),
            Err(TryRecvError::Empty) => self.expire_lookup(),
            Err(TryRecvError::Disconnected) => self.finish_lookup(Some(lookup_closed())),
        }
    }

    fn handle_lookup_event(&mut self, event: PositionEvent) {
        match event {
            PositionEvent::Fix(fix) => {
                let now = self.clock.now_millis();
                match fix.into_sample(now) {
                    Ok(sample) => {
                        info!(
                            "located at ({:.5}, {:.5})",
                            sample.latitude, sample.longitude
                        );
                        self.session.located = Some(sample);
                        self.finish_lookup(None);
                    }
                    // keep waiting for a usable fix until the deadline
                    Err(err) => warn!("rejected position fix: {}", err),
                }
            }
            PositionEvent::Error(err) => self.finish_lookup(Some(err)),
        }
    }

    fn expire_lookup(&mut self) {
        let expired = self
            .lookup
            .as_ref()
            .map(|lookup| self.clock.now_millis() >= lookup.deadline_ms)
            .unwrap_or(false);
        if expired {
            self.finish_lookup(Some(TrackerError::Timeout(self.config.fix_timeout_ms)));
        }
    }

    fn finish_lookup(&mut self, error: Option<TrackerError>) {
        if let Some(mut lookup) = self.lookup.take() {
            lookup.subscription.cancel();
        }
        self.session.is_loading = false;
        if let Some(err) = error {
            warn!("location lookup failed: {}", err);
            self.session.error = Some(err);
        }
    }

    fn handle_event(&mut self, event: PositionEvent) {
        if !self.session.is_recording() {
            return;
        }
        match event {
            PositionEvent::Fix(fix) => {
                let now = self.clock.now_millis();
                match fix.into_sample(now) {
                    Ok(sample) => {
                        let outcome = self.session.track.ingest(sample);
                        if outcome.evicted {
                            debug!("sample buffer full, evicted oldest");
                        }
                    }
                    Err(err) => {
                        warn!("rejected position fix: {}", err);
                        self.session.track.record_rejection();
                    }
                }
            }
            PositionEvent::Error(err) => {
                warn!("position source error: {}", err);
                if err.is_fatal_to_subscription() {
                    self.release_feed();
                    let now = self.clock.now_millis();
                    self.session.finish(now);
                }
                self.session.error = Some(err);
            }
        }
    }

    fn handle_source_closed(&mut self) {
        if let Some(feed) = self.feed.as_mut() {
            if !feed.source_closed {
                info!("position source closed its channel");
            }
            feed.source_closed = true;
            feed.events = channel::never();
        }
    }

    fn release_feed(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.close();
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_recording()
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_loading()
    }

    /// True once the active source has dropped its end of the event channel
    pub fn is_source_closed(&self) -> bool {
        self.feed.as_ref().map(|f| f.source_closed).unwrap_or(false)
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    pub fn snapshot(&self) -> TrackingSnapshot {
        self.session.snapshot(&self.config.terrain)
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

fn lookup_closed() -> TrackerError {
    TrackerError::SourceUnavailable("position source closed before a fix arrived".to_string())
}
