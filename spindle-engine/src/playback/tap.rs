//! Tap-tempo measurement.
//!
//! A rolling average over recent inter-tap intervals. The measured interval
//! feeds [`Player::apply_tap_interval`](crate::playback::Player::apply_tap_interval)
//! to resize the playback window onto beat boundaries.

use std::collections::VecDeque;
use std::time::Instant;

/// Number of inter-tap intervals kept in the rolling average.
const MAX_INTERVALS: usize = 16;

/// Rolling tap-tempo averager.
///
/// # Examples
/// ```
/// use std::time::{Duration, Instant};
/// use spindle_engine::playback::TapTempo;
///
/// let mut tempo = TapTempo::new();
/// let start = Instant::now();
/// for i in 0..5 {
///     tempo.tap_at(start + Duration::from_millis(500 * i));
/// }
/// assert_eq!(tempo.average_interval_ms(), Some(500.0));
/// assert_eq!(tempo.bpm(), Some(120.0));
/// ```
#[derive(Debug, Default)]
pub struct TapTempo {
    intervals_ms: VecDeque<f64>,
    last_tap: Option<Instant>,
}

impl TapTempo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tap at the current time.
    pub fn tap(&mut self) {
        self.tap_at(Instant::now());
    }

    /// Record a tap at an explicit instant.
    ///
    /// The first tap only arms the measurement; every later tap records the
    /// interval since its predecessor, discarding the oldest once
    /// `MAX_INTERVALS` are held.
    pub fn tap_at(&mut self, at: Instant) {
        if let Some(last) = self.last_tap {
            let interval = at.saturating_duration_since(last).as_secs_f64() * 1000.0;
            self.intervals_ms.push_back(interval);
            if self.intervals_ms.len() > MAX_INTERVALS {
                self.intervals_ms.pop_front();
            }
        }
        self.last_tap = Some(at);
    }

    /// Mean inter-tap interval in milliseconds, if any interval was recorded.
    pub fn average_interval_ms(&self) -> Option<f64> {
        if self.intervals_ms.is_empty() {
            return None;
        }
        let sum: f64 = self.intervals_ms.iter().sum();
        Some(sum / self.intervals_ms.len() as f64)
    }

    /// Beats per minute derived from the average interval.
    pub fn bpm(&self) -> Option<f64> {
        self.average_interval_ms().map(|ms| 60000.0 / ms)
    }

    /// Number of recorded intervals.
    pub fn tap_count(&self) -> usize {
        self.intervals_ms.len()
    }

    /// Clear all recorded taps.
    pub fn reset(&mut self) {
        self.intervals_ms.clear();
        self.last_tap = None;
    }
}

// ============================================================================
// Tests
// ============================================================================
