//! Shared fixtures for the integration tests
//!
//! Payload builders write WAV data whose sample values encode the frame
//! index, so tests can check exactly which source frames came out of the
//! renderer and in what order. The session helpers pair a headless player
//! with its renderer and push loads through to the acknowledgement.

#![allow(dead_code)]

use std::io::Cursor;
use std::ops::Range;
use std::time::Duration;

use tokio::sync::broadcast::Receiver;

use spindle_common::events::PlayerEvent;
use spindle_engine::config::PlayerConfig;
use spindle_engine::playback::{HeadlessRenderer, Player};

/// Sample rate used by every fixture
pub const TEST_RATE: u32 = 48000;

fn float_spec(channels: u16) -> hound::WavSpec {
    hound::WavSpec {
        channels,
        sample_rate: TEST_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    }
}

/// Mono float WAV whose sample at frame `i` is `i as f32`
pub fn ramp_wav(frames: usize) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, float_spec(1)).expect("WAV header");
        for i in 0..frames {
            writer.write_sample(i as f32).expect("WAV sample");
        }
        writer.finalize().expect("WAV finalize");
    }
    cursor.into_inner()
}

/// Stereo float WAV: left channel holds the frame index, right its negation
pub fn stereo_wav(frames: usize) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, float_spec(2)).expect("WAV header");
        for i in 0..frames {
            writer.write_sample(i as f32).expect("WAV sample");
            writer.write_sample(-(i as f32)).expect("WAV sample");
        }
        writer.finalize().expect("WAV finalize");
    }
    cursor.into_inner()
}

/// The mono samples a session should produce for source frames `range`
pub fn ramp_slice(range: Range<usize>) -> Vec<f32> {
    range.map(|i| i as f32).collect()
}

/// Headless player with a mono output format
pub async fn mono_session() -> (Player, HeadlessRenderer) {
    Player::initialize_headless(PlayerConfig::headless(TEST_RATE, 1))
        .await
        .expect("headless player")
}

/// Load a payload and drive the renderer until the load is acknowledged.
///
/// Returns the duration reported by the loaded event.
pub async fn load_and_flush(
    player: &Player,
    renderer: &mut HeadlessRenderer,
    payload: Vec<u8>,
    events: &mut Receiver<PlayerEvent>,
) -> f64 {
    player.load_audio_data(payload).await.expect("load");
    renderer.render(128);
    match wait_for(events, "loaded", |e| matches!(e, PlayerEvent::Loaded { .. })).await {
        PlayerEvent::Loaded { duration } => duration,
        other => panic!("expected loaded, got {:?}", other),
    }
}

/// Wait up to two seconds for an event matching `pred`, discarding others
pub async fn wait_for<F>(events: &mut Receiver<PlayerEvent>, what: &str, pred: F) -> PlayerEvent
where
    F: Fn(&PlayerEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match events.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(e) => panic!("event bus closed while waiting for {}: {}", what, e),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {}", what))
}

/// Collect events in arrival order until one matches `pred`.
///
/// The matching event is the last element of the returned list.
pub async fn collect_until<F>(
    events: &mut Receiver<PlayerEvent>,
    what: &str,
    pred: F,
) -> Vec<PlayerEvent>
where
    F: Fn(&PlayerEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        let mut seen = Vec::new();
        loop {
            match events.recv().await {
                Ok(event) => {
                    let done = pred(&event);
                    seen.push(event);
                    if done {
                        return seen;
                    }
                }
                Err(e) => panic!("event bus closed while waiting for {}: {}", what, e),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {}", what))
}
