//! Audio output and the decode seam
//!
//! `types` defines the decoded-sample shapes and the [`AudioDecoder`] trait
//! the controller calls; `output` owns the cpal device and stream.

pub mod output;
pub mod types;

pub use output::AudioOutput;
pub use types::{AudioDecoder, DecodedAudio, WavPayloadDecoder};
