//! Observable transport state.
//!
//! The renderer owns the truth about playback; this mirror tracks what the
//! control plane last heard so callers can query position, duration, and
//! state without touching the real-time domain.

use std::sync::Arc;
use tokio::sync::RwLock;

use spindle_common::events::PlaybackState;

use crate::playback::message::Direction;

/// Point-in-time copy of the transport mirror.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportSnapshot {
    pub state: PlaybackState,
    /// Last known playhead position in seconds.
    pub position: f64,
    /// Duration of the loaded material in seconds, 0.0 when idle.
    pub duration: f64,
    pub direction: Direction,
    /// Window size in frames, as last acknowledged or requested.
    pub window_size: usize,
}

/// Shared transport state, cloned between the controller and its event pump.
#[derive(Debug, Clone)]
pub struct SharedTransportState {
    inner: Arc<RwLock<TransportStateInner>>,
}

#[derive(Debug)]
struct TransportStateInner {
    state: PlaybackState,
    position: f64,
    duration: f64,
    direction: Direction,
    window_size: usize,
}

impl SharedTransportState {
    /// # Arguments
    /// * `window_size` - Initial window size in frames, matching the renderer
    pub fn new(window_size: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TransportStateInner {
                state: PlaybackState::Idle,
                position: 0.0,
                duration: 0.0,
                direction: Direction::Forward,
                window_size,
            })),
        }
    }

    pub async fn get_state(&self) -> PlaybackState {
        self.inner.read().await.state
    }

    pub async fn set_state(&self, state: PlaybackState) {
        self.inner.write().await.state = state;
    }

    /// Position and duration together, in seconds.
    pub async fn get_position(&self) -> (f64, f64) {
        let inner = self.inner.read().await;
        (inner.position, inner.duration)
    }

    pub async fn set_position(&self, position: f64) {
        self.inner.write().await.position = position;
    }

    pub async fn set_duration(&self, duration: f64) {
        self.inner.write().await.duration = duration;
    }

    pub async fn get_direction(&self) -> Direction {
        self.inner.read().await.direction
    }

    pub async fn set_direction(&self, direction: Direction) {
        self.inner.write().await.direction = direction;
    }

    pub async fn get_window_size(&self) -> usize {
        self.inner.read().await.window_size
    }

    pub async fn set_window_size(&self, window_size: usize) {
        self.inner.write().await.window_size = window_size;
    }

    pub async fn snapshot(&self) -> TransportSnapshot {
        let inner = self.inner.read().await;
        TransportSnapshot {
            state: inner.state,
            position: inner.position,
            duration: inner.duration,
            direction: inner.direction,
            window_size: inner.window_size,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
