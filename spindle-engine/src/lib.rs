//! # Spindle Playback Engine (spindle-engine)
//!
//! Windowed block audio playback: streams decoded samples to a hardware
//! output callback in fixed-size blocks, sourcing them from a runtime-sized
//! window over the track. Supports bidirectional playback, seeking, and
//! tempo-synchronized window resizing.
//!
//! **Architecture:** two scheduling domains joined by a duplex message
//! channel. The [`playback::Player`] (control domain) owns intent and the
//! public async API; the [`playback::BlockRenderer`] (real-time domain) owns
//! the sample data and fills each hardware block without blocking.

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;

pub use config::PlayerConfig;
pub use error::{Error, Result};
pub use playback::Player;
