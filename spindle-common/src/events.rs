//! Event types for the spindle playback engine
//!
//! Provides the player event definitions and the EventBus used to distribute
//! them to subscribers (UI, transport layers, tests).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Playback state enumeration
///
/// Lifecycle: `Idle → Loaded → Playing ⇄ Paused`, plus the transient `Ended`
/// state reached when the playhead runs off either end of the buffer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// No audio loaded
    Idle,
    /// Audio loaded, not playing
    Loaded,
    /// Actively producing audio
    Playing,
    /// Playback suspended, position retained
    Paused,
    /// Playback ran off the end of the buffer
    Ended,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Loaded => write!(f, "loaded"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Ended => write!(f, "ended"),
        }
    }
}

/// Player event types
///
/// Events are broadcast via EventBus and serialize to the wire shape consumed
/// by transport/UI layers: a `type` tag plus camelCase payload fields.
///
/// `loaded`, `ended`, and `windowSizeChanged` are delivery-critical and ride
/// an unbounded path from the render callback; `progress` is rate-limited at
/// the source and may be coalesced by slow consumers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerEvent {
    /// Audio buffer ready for playback
    Loaded {
        /// Track duration in seconds
        duration: f64,
    },

    /// Periodic playhead update (best-effort cadence, ≈100 ms)
    Progress {
        /// Current position in seconds
        position: f64,
    },

    /// Playback ran off the end of the buffer
    Ended,

    /// A pending window resize was applied at a window boundary
    #[serde(rename_all = "camelCase")]
    WindowSizeChanged {
        /// New window size in frames
        window_size: usize,
    },

    /// Transport state changed (Playing ↔ Paused etc.)
    PlaybackStateChanged {
        /// Playback state after the change
        state: PlaybackState,
    },
}

impl PlayerEvent {
    /// Get event type name as string (matches the serialized `type` tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::Loaded { .. } => "loaded",
            PlayerEvent::Progress { .. } => "progress",
            PlayerEvent::Ended => "ended",
            PlayerEvent::WindowSizeChanged { .. } => "windowSizeChanged",
            PlayerEvent::PlaybackStateChanged { .. } => "playbackStateChanged",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for player events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
///
/// # Examples
///
/// ```
/// use spindle_common::events::{EventBus, PlayerEvent};
/// use std::sync::Arc;
///
/// let event_bus = Arc::new(EventBus::new(256));
///
/// // Subscribe to events
/// let mut rx = event_bus.subscribe();
///
/// // Emit an event
/// event_bus.emit_lossy(PlayerEvent::Loaded { duration: 4.5 });
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Returns a receiver that will receive all events emitted after
    /// subscription. Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Used for events where it is acceptable that no component is
    /// currently listening (e.g. progress updates before any UI attaches).
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
