//! Core audio data types and the decoder seam
//!
//! The engine is handed already-decoded per-channel sample arrays; it never
//! parses compressed formats itself. [`AudioDecoder`] is the boundary to
//! whatever produces those arrays. [`WavPayloadDecoder`] is the bundled
//! implementation for PCM/WAV payloads, enough for tests and the demo binary.

use crate::error::{Error, Result};
use std::io::Cursor;

/// Decoded audio ready for the renderer.
///
/// **Format:**
/// - Samples are f32 (floating point -1.0 to 1.0)
/// - Planar: one `Vec<f32>` per channel, all the same length
/// - Sample rate fixed at decode time
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Per-channel sample arrays (`channels[c][i]`)
    pub channels: Vec<Vec<f32>>,

    /// Source sample rate in Hz
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Create a DecodedAudio from per-channel sample arrays
    ///
    /// # Errors
    /// - No channels
    /// - Zero sample rate
    /// - Channels of unequal length
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() {
            return Err(Error::Decode("No audio channels".to_string()));
        }
        if sample_rate == 0 {
            return Err(Error::Decode("Sample rate must be > 0".to_string()));
        }
        let frame_count = channels[0].len();
        if channels.iter().any(|c| c.len() != frame_count) {
            return Err(Error::Decode(
                "Channels must all be the same length".to_string(),
            ));
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Number of frames (samples per channel)
    pub fn frame_count(&self) -> usize {
        self.channels[0].len()
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Duration in seconds at the source sample rate
    pub fn duration_seconds(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

/// Boundary to the external decoder.
///
/// Implementations convert a compressed (or containerized) audio payload into
/// per-channel float arrays at a known sample rate. Called from the control
/// domain on a blocking worker; implementations may take arbitrarily long.
pub trait AudioDecoder: Send + Sync {
    /// Decode an audio payload to per-channel samples.
    ///
    /// # Errors
    /// `Error::Decode` if the payload is malformed or unsupported.
    fn decode(&self, payload: &[u8]) -> Result<DecodedAudio>;
}

/// Decoder for in-memory WAV payloads.
///
/// Handles integer PCM (8/16/24/32 bit) and 32-bit float WAV data. This keeps
/// tests and the demo binary self-contained; compressed formats stay behind
/// an external [`AudioDecoder`] implementation.
pub struct WavPayloadDecoder;

impl AudioDecoder for WavPayloadDecoder {
    fn decode(&self, payload: &[u8]) -> Result<DecodedAudio> {
        let mut reader = hound::WavReader::new(Cursor::new(payload))
            .map_err(|e| Error::Decode(format!("Failed to parse WAV payload: {}", e)))?;
        let spec = reader.spec();

        if spec.channels == 0 {
            return Err(Error::Decode("WAV payload has no channels".to_string()));
        }
        let channel_count = spec.channels as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Decode(format!("Failed to read WAV samples: {}", e)))?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| Error::Decode(format!("Failed to read WAV samples: {}", e)))?
            }
        };

        // Truncate any trailing partial frame rather than failing the load
        let frame_count = interleaved.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frame_count); channel_count];
        for frame in interleaved.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }

        DecodedAudio::new(channels, spec.sample_rate)
    }
}
