//! Frame-based timing for the windowed playback engine
//!
//! The engine positions everything in whole frames at the output sample rate.
//! This module holds the conversion helpers and the window-sizing rules shared
//! by the renderer (which applies them) and the controller (which mirrors them
//! for its observable state).
//!
//! # Conversion Flow
//!
//! ```text
//! API Request (seconds)
//!     ↓
//! seconds_to_frames() → Renderer cursor (i64 frames)
//!     ↓
//! frames_to_seconds() → progress / loaded events (f64 seconds)
//! ```
//!
//! Seek positions round to the nearest frame; tap-tempo window sizes truncate
//! (a 500 ms tap at 48 kHz is exactly 24000 frames, never 24001).

// ============================================================================
// Constants
// ============================================================================

/// Smallest permitted window size in frames
///
/// Matches one hardware block at the common 128-frame quantum; windows below
/// this would reload more often than the callback produces output.
pub const MIN_WINDOW_FRAMES: usize = 128;

/// Largest permitted window size, in seconds of audio
///
/// The frame bound is `MAX_WINDOW_SECONDS * sample_rate`, so it scales with
/// the output rate (480,000 frames at 48 kHz).
pub const MAX_WINDOW_SECONDS: usize = 10;

/// Default window length in seconds when none has been requested
pub const DEFAULT_WINDOW_SECONDS: usize = 2;

/// Frames between progress events (≈100 ms at 48 kHz)
///
/// Progress is emitted when the playhead crosses a multiple of this count.
/// Best-effort: consumers must not rely on exact cadence.
pub const PROGRESS_INTERVAL_FRAMES: i64 = 4800;

// ============================================================================
// Core Conversion Functions
// ============================================================================

/// Convert seconds to a frame index at the given sample rate
///
/// Rounds to the nearest frame, so a seek target lands on the closest frame
/// boundary rather than truncating toward zero.
///
/// # Examples
///
/// ```rust
/// use spindle_common::timing::seconds_to_frames;
///
/// assert_eq!(seconds_to_frames(0.0, 48000), 0);
/// assert_eq!(seconds_to_frames(1.0, 48000), 48_000);
/// assert_eq!(seconds_to_frames(0.5, 44100), 22_050);
/// ```
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> i64 {
    (seconds * sample_rate as f64).round() as i64
}

/// Convert a frame count to seconds at the given sample rate
///
/// # Examples
///
/// ```rust
/// use spindle_common::timing::frames_to_seconds;
///
/// assert_eq!(frames_to_seconds(0, 48000), 0.0);
/// assert_eq!(frames_to_seconds(24_000, 48000), 0.5);
/// assert_eq!(frames_to_seconds(48_000, 48000), 1.0);
/// ```
pub fn frames_to_seconds(frames: i64, sample_rate: u32) -> f64 {
    frames as f64 / sample_rate as f64
}

/// Convert a measured tap interval (milliseconds) to a window size in frames
///
/// Truncates: `floor(interval_seconds * sample_rate)`. The result is fed
/// through [`clamp_window_size`] when applied, not here, so callers can
/// observe the raw musical value.
///
/// # Examples
///
/// ```rust
/// use spindle_common::timing::tap_interval_to_frames;
///
/// // 120 BPM quarter notes at 48 kHz
/// assert_eq!(tap_interval_to_frames(500.0, 48000), 24_000);
/// // 60 BPM at 44.1 kHz
/// assert_eq!(tap_interval_to_frames(1000.0, 44100), 44_100);
/// ```
pub fn tap_interval_to_frames(interval_ms: f64, sample_rate: u32) -> usize {
    let interval_seconds = interval_ms / 1000.0;
    (interval_seconds * sample_rate as f64).floor().max(0.0) as usize
}

/// Clamp a requested window size to the permitted range
///
/// The range is `[MIN_WINDOW_FRAMES, MAX_WINDOW_SECONDS * sample_rate]`.
/// Out-of-range requests are never an error; they clamp silently.
///
/// # Examples
///
/// ```rust
/// use spindle_common::timing::clamp_window_size;
///
/// assert_eq!(clamp_window_size(0, 48000), 128);
/// assert_eq!(clamp_window_size(4096, 48000), 4096);
/// assert_eq!(clamp_window_size(10_000_000, 48000), 480_000);
/// ```
pub fn clamp_window_size(requested: usize, sample_rate: u32) -> usize {
    let max = MAX_WINDOW_SECONDS * sample_rate as usize;
    requested.clamp(MIN_WINDOW_FRAMES, max)
}

/// Default window size in frames for a given sample rate
///
/// Two seconds of audio, the original product default.
pub fn default_window_size(sample_rate: u32) -> usize {
    DEFAULT_WINDOW_SECONDS * sample_rate as usize
}
