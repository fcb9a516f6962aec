//! Spindle demo player
//!
//! Plays a WAV file (or a synthesized tone) through the windowed block
//! engine, with the transport knobs exposed as flags.
//!
//! **Usage:**
//! ```bash
//! spindle-demo track.wav --window-ms 250
//! spindle-demo track.wav --reverse
//! spindle-demo --bpm 120
//! spindle-demo track.wav --render-wav out.wav --render-rate 44100
//! spindle-demo --list-devices
//! ```

use std::f32::consts::TAU;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spindle_common::events::{PlaybackState, PlayerEvent};
use spindle_common::timing::tap_interval_to_frames;
use spindle_engine::audio::AudioOutput;
use spindle_engine::config::{HeadlessConfig, PlayerConfig};
use spindle_engine::playback::{Direction, Player};

/// Command-line arguments for spindle-demo
#[derive(Parser, Debug)]
#[command(name = "spindle-demo")]
#[command(about = "Windowed block playback demo for spindle")]
#[command(version)]
struct Args {
    /// WAV file to play (a synthesized tone is used when omitted)
    file: Option<PathBuf>,

    /// List available output devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Output device name (system default when omitted)
    #[arg(long, env = "SPINDLE_DEVICE")]
    device: Option<String>,

    /// Requested hardware block size in frames
    #[arg(long)]
    buffer_size: Option<u32>,

    /// Window size in milliseconds
    #[arg(long)]
    window_ms: Option<f64>,

    /// Align the window to a beat interval, in beats per minute
    #[arg(long, conflicts_with = "window_ms")]
    bpm: Option<f64>,

    /// Play window regions back to front
    #[arg(long)]
    reverse: bool,

    /// Start position in seconds
    #[arg(long)]
    seek: Option<f64>,

    /// Render to a WAV file instead of playing on a device
    #[arg(long, value_name = "FILE")]
    render_wav: Option<PathBuf>,

    /// Sample rate for --render-wav
    #[arg(long, default_value = "48000")]
    render_rate: u32,

    /// Channel count for --render-wav
    #[arg(long, default_value = "2")]
    render_channels: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spindle_engine=debug,spindle_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if args.list_devices {
        let devices = AudioOutput::list_devices().context("Failed to enumerate devices")?;
        if devices.is_empty() {
            println!("No output devices found");
        }
        for name in devices {
            println!("{}", name);
        }
        return Ok(());
    }

    let payload = match &args.file {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            info!("No file given, synthesizing a 10s test tone");
            tone_wav(10.0, 48000)?
        }
    };

    match args.render_wav.clone() {
        Some(out_path) => render_to_wav(&args, payload, out_path).await,
        None => play_live(&args, payload).await,
    }
}

/// Play through a real output device until the track ends or a signal
/// arrives.
async fn play_live(args: &Args, payload: Vec<u8>) -> Result<()> {
    let config = PlayerConfig {
        device: args.device.clone(),
        buffer_size: args.buffer_size,
        ..PlayerConfig::default()
    };
    let player = Player::initialize(config)
        .await
        .context("Failed to initialize audio")?;
    let mut events = player.subscribe();

    player
        .load_audio_data(payload)
        .await
        .context("Failed to load audio")?;
    let duration = wait_for_load(&mut events).await?;
    info!("Loaded {:.2}s of audio", duration);

    configure_transport(args, &player, duration).await?;
    player.play().await.context("Failed to start playback")?;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
            event = events.recv() => match event {
                Ok(PlayerEvent::Progress { position }) => {
                    info!("Position: {:.2}s / {:.2}s", position, duration);
                }
                Ok(PlayerEvent::Ended) => {
                    info!("Playback ended");
                    break;
                }
                Ok(PlayerEvent::WindowSizeChanged { window_size }) => {
                    info!("Window resized to {} frames", window_size);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => warn!("Dropped {} events", n),
                Err(RecvError::Closed) => break,
            }
        }

        if player.has_error() {
            error!("Audio stream reported an error");
            break;
        }
    }

    player.shutdown();
    Ok(())
}

/// Render the whole track offline into a float WAV.
async fn render_to_wav(args: &Args, payload: Vec<u8>, out_path: PathBuf) -> Result<()> {
    let config = PlayerConfig {
        headless: Some(HeadlessConfig {
            sample_rate: args.render_rate,
            channels: args.render_channels,
        }),
        ..PlayerConfig::default()
    };
    let (player, mut renderer) = Player::initialize_headless(config)
        .await
        .context("Failed to build headless player")?;
    let mut events = player.subscribe();

    player
        .load_audio_data(payload)
        .await
        .context("Failed to load audio")?;
    renderer.render(128);
    let duration = wait_for_load(&mut events).await?;
    info!("Loaded {:.2}s of audio", duration);

    configure_transport(args, &player, duration).await?;
    player.play().await?;

    let spec = hound::WavSpec {
        channels: args.render_channels,
        sample_rate: args.render_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&out_path, spec)
        .with_context(|| format!("Failed to create {}", out_path.display()))?;

    const BLOCK_FRAMES: usize = 4096;
    let channels = renderer.channels();
    let mut block = vec![0.0f32; BLOCK_FRAMES * channels];

    // Budget: material length plus generous window slack on both sides.
    let frame_budget = ((duration + 25.0) * args.render_rate as f64) as usize;
    let mut rendered = 0usize;
    while rendered < frame_budget {
        renderer.render_into(&mut block);
        for &sample in &block {
            writer.write_sample(sample)?;
        }
        rendered += BLOCK_FRAMES;

        if player.get_state().await == PlaybackState::Ended {
            break;
        }
    }

    writer.finalize().context("Failed to finalize WAV")?;
    info!("Rendered {} frames to {}", rendered, out_path.display());

    player.shutdown();
    Ok(())
}

/// Consume events until the renderer acknowledges the load.
async fn wait_for_load(
    events: &mut tokio::sync::broadcast::Receiver<PlayerEvent>,
) -> Result<f64> {
    loop {
        match events.recv().await {
            Ok(PlayerEvent::Loaded { duration }) => return Ok(duration),
            Ok(_) => continue,
            Err(e) => anyhow::bail!("Event stream closed before load completed: {}", e),
        }
    }
}

/// Apply window, direction, tempo, and seek flags.
async fn configure_transport(args: &Args, player: &Player, duration: f64) -> Result<()> {
    if let Some(window_ms) = args.window_ms {
        let frames = tap_interval_to_frames(window_ms, player.sample_rate());
        player.set_window_size(frames)?;
    }

    if let Some(bpm) = args.bpm {
        if bpm > 0.0 {
            player.apply_tap_interval(60000.0 / bpm).await?;
        } else {
            warn!("Ignoring non-positive BPM {}", bpm);
        }
    }

    if args.reverse {
        player.set_direction(Direction::Reverse).await?;
    }

    match args.seek {
        Some(seconds) => player.seek(seconds).await?,
        // Reverse playback from frame zero has nothing behind it; start at
        // the end instead.
        None if args.reverse => player.seek(duration).await?,
        None => {}
    }

    Ok(())
}

/// Mono float WAV containing a quiet sine tone.
fn tone_wav(seconds: f64, sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        let frames = (seconds * sample_rate as f64) as usize;
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            writer.write_sample(0.3 * (TAU * 440.0 * t).sin())?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
