//! Position-source capability the tracker subscribes to.
//!
//! A source pushes [`PositionEvent`]s into the sender it is handed on
//! subscribe, and returns a [`Subscription`] whose cancellation stops delivery.

use crate::error::{Result, TrackerError};
use crate::sample::PositionFix;
use crossbeam::channel::Sender;
use std::sync::{Arc, Mutex};

/// Event pushed by a position source
#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    Fix(PositionFix),
    /// Side-channel error (permission, timeout, availability)
    Error(TrackerError),
}

/// Options forwarded to the source when watching position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    pub high_accuracy: bool,
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout_ms: 15_000,
            maximum_age_ms: 0,
        }
    }
}

/// Push-based provider of position fixes
pub trait PositionSource {
    /// Whether the runtime supports this source at all
    fn is_available(&self) -> bool;

    /// Start delivering events into `sink` until the returned subscription is cancelled
    fn subscribe(
        &mut self,
        sink: Sender<PositionEvent>,
        options: WatchOptions,
    ) -> Result<Subscription>;
}

/// Active subscription handle. Cancelling more than once is a no-op,
/// and dropping the handle cancels it.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[derive(Default)]
struct SourceState {
    available: bool,
    denial: Option<String>,
    subscriber: Option<(u64, Sender<PositionEvent>)>,
    next_id: u64,
    subscribe_count: usize,
    last_options: Option<WatchOptions>,
}

/// In-process source fed by hand. Clones share one subscriber slot,
/// so a clone can push fixes from another thread while the tracker owns the original.
#[derive(Clone)]
pub struct ChannelSource {
    inner: Arc<Mutex<SourceState>>,
}

impl ChannelSource {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SourceState {
                available: true,
                ..Default::default()
            })),
        }
    }

    /// Source that reports itself unsupported
    pub fn unavailable() -> Self {
        let source = Self::new();
        source.set_available(false);
        source
    }

    pub fn set_available(&self, available: bool) {
        if let Ok(mut state) = self.inner.lock() {
            state.available = available;
        }
    }

    /// Make subsequent subscribe calls fail with a permission denial
    pub fn deny_permission(&self, reason: &str) {
        if let Ok(mut state) = self.inner.lock() {
            state.denial = Some(reason.to_string());
        }
    }

    /// Deliver a fix to the current subscriber. Returns false if nobody is listening.
    pub fn push_fix(&self, fix: PositionFix) -> bool {
        self.push(PositionEvent::Fix(fix))
    }

    pub fn push_error(&self, error: TrackerError) -> bool {
        self.push(PositionEvent::Error(error))
    }

    fn push(&self, event: PositionEvent) -> bool {
        let Ok(state) = self.inner.lock() else {
            return false;
        };
        match &state.subscriber {
            Some((_, sender)) => sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Drop the subscriber's sender, as a device source does when it shuts down
    pub fn disconnect(&self) {
        if let Ok(mut state) = self.inner.lock() {
            state.subscriber = None;
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.inner
            .lock()
            .map(|state| state.subscriber.is_some())
            .unwrap_or(false)
    }

    /// Total successful subscribe calls
    pub fn subscribe_count(&self) -> usize {
        self.inner
            .lock()
            .map(|state| state.subscribe_count)
            .unwrap_or(0)
    }

    pub fn last_options(&self) -> Option<WatchOptions> {
        self.inner.lock().ok().and_then(|state| state.last_options)
    }
}

impl Default for ChannelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionSource for ChannelSource {
    fn is_available(&self) -> bool {
        self.inner
            .lock()
            .map(|state| state.available)
            .unwrap_or(false)
    }

    fn subscribe(
        &mut self,
        sink: Sender<PositionEvent>,
        options: WatchOptions,
    ) -> Result<Subscription> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| TrackerError::SourceUnavailable("source lock poisoned".to_string()))?;

        if !state.available {
            return Err(TrackerError::SourceUnavailable(
                "position source is not available".to_string(),
            ));
        }
        if let Some(reason) = &state.denial {
            return Err(TrackerError::PermissionDenied(reason.clone()));
        }

        let id = state.next_id;
        state.next_id += 1;
        state.subscriber = Some((id, sink));
        state.subscribe_count += 1;
        state.last_options = Some(options);

        let inner = Arc::clone(&self.inner);
        Ok(Subscription::new(move || {
            if let Ok(mut state) = inner.lock() {
                if matches!(state.subscriber, Some((current, _)) if current == id) {
                    state.subscriber = None;
                }
            }
        }))
    }
}
