//! # Spindle Common Library
//!
//! Shared code for the spindle playback engine and its collaborators:
//! - Event types (PlayerEvent enum) and the EventBus
//! - Metadata service request/response types
//! - Frame/seconds timing conversions and window-size rules

pub mod events;
pub mod metadata;
pub mod timing;

pub use events::{EventBus, PlayerEvent};
