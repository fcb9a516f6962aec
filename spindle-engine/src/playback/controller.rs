//! Transport controller.
//!
//! [`Player`] owns playback intent and the public transport API. It talks to
//! the renderer only through the command ring and hears back only through the
//! event channel; an internal pump task folds renderer events into the shared
//! transport mirror and republishes them on the [`EventBus`].
//!
//! With a real device the renderer lives inside the stream callback on a
//! dedicated audio thread, since the platform stream handle cannot move
//! between threads. Headless operation skips the device entirely and hands
//! the caller a [`HeadlessRenderer`] to drive block by block.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ringbuf::traits::*;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, info, warn};

use spindle_common::events::{EventBus, PlaybackState, PlayerEvent};
use spindle_common::timing::{clamp_window_size, default_window_size, tap_interval_to_frames};

use crate::audio::{AudioDecoder, AudioOutput, WavPayloadDecoder};
use crate::config::PlayerConfig;
use crate::error::{Error, Result};
use crate::playback::message::{
    command_channel, event_channel, CommandConsumer, CommandProducer, Direction, EventReceiver,
    EventSender, RendererCommand, RendererEvent,
};
use crate::playback::renderer::BlockRenderer;
use crate::playback::state::{SharedTransportState, TransportSnapshot};

/// Device parameters reported by the audio thread once the stream is live.
struct StreamHandshake {
    sample_rate: u32,
    channels: usize,
    device_name: String,
    error_flag: Arc<AtomicBool>,
}

/// Public transport API over a running renderer.
pub struct Player {
    commands: Arc<Mutex<CommandProducer>>,
    state: SharedTransportState,
    events: EventBus,
    decoder: Arc<dyn AudioDecoder>,
    sample_rate: u32,
    channels: usize,
    device_name: Option<String>,
    /// Keep-alive for the audio thread. Cleared on shutdown/drop.
    running: Arc<AtomicBool>,
    /// Stream error flag shared with the audio callback.
    error_flag: Arc<AtomicBool>,
    /// Monotonic counter so a slow decode cannot clobber a newer load.
    load_generation: Arc<AtomicU64>,
    /// Serializes the generation check with the queue push so racing loads
    /// enqueue in request order.
    load_gate: Arc<tokio::sync::Mutex<()>>,
}

impl Player {
    /// Open the default (or configured) output device and start the stream.
    ///
    /// The renderer is created on a dedicated audio thread and begins
    /// producing silence immediately; commands queued before the first
    /// callback are applied when it runs.
    ///
    /// # Errors
    /// - [`Error::AudioOutput`] when no usable device or stream config exists
    /// - [`Error::Initialization`] when the audio thread dies before the
    ///   stream comes up, or when the config asks for headless operation
    ///   (use [`Player::initialize_headless`] for that)
    pub async fn initialize(config: PlayerConfig) -> Result<Self> {
        if config.headless.is_some() {
            return Err(Error::Initialization(
                "Headless configuration requires initialize_headless".to_string(),
            ));
        }
        info!("Initializing player");

        let (command_tx, command_rx) = command_channel(config.command_queue_depth);
        let (event_tx, event_rx) = event_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let running = Arc::new(AtomicBool::new(true));

        let device = config.device.clone();
        let buffer_size = config.buffer_size;
        let keep_alive = Arc::clone(&running);
        std::thread::spawn(move || {
            audio_thread(device, buffer_size, command_rx, event_tx, ready_tx, keep_alive);
        });

        let handshake = ready_rx
            .await
            .map_err(|_| Error::Initialization("Audio thread exited unexpectedly".to_string()))??;

        let state = SharedTransportState::new(default_window_size(handshake.sample_rate));
        let events = EventBus::new(config.event_capacity);
        tokio::spawn(run_event_pump(event_rx, state.clone(), events.clone()));

        info!(
            "Player ready: {} Hz, {} channels on '{}'",
            handshake.sample_rate, handshake.channels, handshake.device_name
        );

        Ok(Self {
            commands: Arc::new(Mutex::new(command_tx)),
            state,
            events,
            decoder: Arc::new(WavPayloadDecoder),
            sample_rate: handshake.sample_rate,
            channels: handshake.channels,
            device_name: Some(handshake.device_name),
            running,
            error_flag: handshake.error_flag,
            load_generation: Arc::new(AtomicU64::new(0)),
            load_gate: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    /// Create a player without a device, plus the renderer to drive manually.
    ///
    /// Uses `config.headless` for the output format, defaulting to 48 kHz
    /// stereo. Every transport operation behaves as with a live stream, but
    /// blocks are only produced when the caller renders them.
    pub async fn initialize_headless(config: PlayerConfig) -> Result<(Self, HeadlessRenderer)> {
        let format = config.headless.unwrap_or_default();
        if format.sample_rate == 0 {
            return Err(Error::Initialization("Sample rate must be > 0".to_string()));
        }
        if format.channels == 0 {
            return Err(Error::Initialization("Channel count must be > 0".to_string()));
        }
        info!(
            "Initializing headless player: {} Hz, {} channels",
            format.sample_rate, format.channels
        );

        let channels = format.channels as usize;
        let (command_tx, command_rx) = command_channel(config.command_queue_depth);
        let (event_tx, event_rx) = event_channel();
        let renderer = BlockRenderer::new(format.sample_rate, channels, command_rx, event_tx);

        let state = SharedTransportState::new(default_window_size(format.sample_rate));
        let events = EventBus::new(config.event_capacity);
        tokio::spawn(run_event_pump(event_rx, state.clone(), events.clone()));

        let player = Self {
            commands: Arc::new(Mutex::new(command_tx)),
            state,
            events,
            decoder: Arc::new(WavPayloadDecoder),
            sample_rate: format.sample_rate,
            channels,
            device_name: None,
            running: Arc::new(AtomicBool::new(true)),
            error_flag: Arc::new(AtomicBool::new(false)),
            load_generation: Arc::new(AtomicU64::new(0)),
            load_gate: Arc::new(tokio::sync::Mutex::new(())),
        };
        Ok((player, HeadlessRenderer { renderer, channels }))
    }

    /// Replace the decoder used by [`Player::load_audio_data`].
    ///
    /// Call before issuing loads; in-flight loads keep the decoder they
    /// started with.
    pub fn set_decoder(&mut self, decoder: Arc<dyn AudioDecoder>) {
        self.decoder = decoder;
    }

    // ========================================================================
    // Transport commands
    // ========================================================================

    /// Decode an audio payload and hand the result to the renderer.
    ///
    /// Decoding runs on a blocking worker and may take arbitrarily long. If a
    /// newer load is issued meanwhile, this one completes and is quietly
    /// discarded, so a stale decode never replaces fresher material.
    ///
    /// # Errors
    /// - [`Error::Decode`] when the payload is malformed; playback state is
    ///   left untouched
    pub async fn load_audio_data(&self, payload: Vec<u8>) -> Result<()> {
        let generation = self.load_generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Loading audio payload: {} bytes", payload.len());

        let decoder = Arc::clone(&self.decoder);
        let decoded = tokio::task::spawn_blocking(move || decoder.decode(&payload))
            .await
            .map_err(|e| Error::Decode(format!("Decode task failed: {}", e)))??;

        // From here to the push the load must not be overtaken by a newer one.
        let _gate = self.load_gate.lock().await;
        if self.load_generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding superseded load (generation {})", generation);
            return Ok(());
        }

        if decoded.sample_rate != self.sample_rate {
            warn!(
                "Source rate {} Hz differs from output rate {} Hz; playback speed will shift",
                decoded.sample_rate, self.sample_rate
            );
        }
        info!(
            "Decoded audio: {} channels, {} frames @ {} Hz",
            decoded.channel_count(),
            decoded.frame_count(),
            decoded.sample_rate
        );

        self.send_command(RendererCommand::Load(decoded))
    }

    /// Begin or resume playback. No-op when already playing or nothing is
    /// loaded.
    pub async fn play(&self) -> Result<()> {
        match self.state.get_state().await {
            PlaybackState::Playing => {
                debug!("Play ignored: already playing");
                return Ok(());
            }
            PlaybackState::Idle => {
                debug!("Play ignored: nothing loaded");
                return Ok(());
            }
            _ => {}
        }

        info!("Play command received");
        self.send_command(RendererCommand::Play)?;
        self.set_state(PlaybackState::Playing).await;
        Ok(())
    }

    /// Pause playback, keeping position and window. No-op unless playing.
    pub async fn pause(&self) -> Result<()> {
        if self.state.get_state().await != PlaybackState::Playing {
            debug!("Pause ignored: not playing");
            return Ok(());
        }

        info!("Pause command received");
        self.send_command(RendererCommand::Pause)?;
        self.set_state(PlaybackState::Paused).await;
        Ok(())
    }

    /// Stop playback and rewind to the start. No-op unless playing.
    pub async fn stop(&self) -> Result<()> {
        if self.state.get_state().await != PlaybackState::Playing {
            debug!("Stop ignored: not playing");
            return Ok(());
        }

        info!("Stop command received");
        self.send_command(RendererCommand::Stop)?;
        self.state.set_position(0.0).await;
        self.set_state(PlaybackState::Loaded).await;
        Ok(())
    }

    /// Convenience toggle between play and pause.
    pub async fn toggle_play_pause(&self) -> Result<()> {
        if self.state.get_state().await == PlaybackState::Playing {
            self.pause().await
        } else {
            self.play().await
        }
    }

    /// Move the playhead to `seconds`. The mirror updates optimistically;
    /// out-of-range targets resolve at the next window load.
    pub async fn seek(&self, seconds: f64) -> Result<()> {
        debug!("Seek to {:.3}s", seconds);
        self.send_command(RendererCommand::Seek(seconds))?;
        self.state.set_position(seconds).await;
        Ok(())
    }

    /// Set the direction window regions are traversed in.
    pub async fn set_direction(&self, direction: Direction) -> Result<()> {
        debug!("Set direction: {}", direction);
        self.send_command(RendererCommand::SetDirection(direction))?;
        self.state.set_direction(direction).await;
        Ok(())
    }

    pub async fn toggle_direction(&self) -> Result<()> {
        let current = self.state.get_direction().await;
        self.set_direction(current.flipped()).await
    }

    /// Request a window resize, clamped to the legal range. Takes effect at
    /// the next window boundary; the mirror updates when the renderer
    /// acknowledges with a `windowSizeChanged` event.
    pub fn set_window_size(&self, frames: usize) -> Result<()> {
        let clamped = clamp_window_size(frames, self.sample_rate);
        if clamped != frames {
            debug!("Window size {} clamped to {}", frames, clamped);
        }
        self.send_command(RendererCommand::SetWindowSize(clamped))
    }

    /// Discard the active window so the next block starts a fresh one at the
    /// cursor, realigning window boundaries without moving the playhead.
    pub fn sync_window(&self) -> Result<()> {
        debug!("Window sync requested");
        self.send_command(RendererCommand::SyncWindow)
    }

    /// Seek to the window-phase-aligned position nearest the start.
    ///
    /// Keeps the playhead's offset within its window: at 5.3s with a 2s
    /// window this lands on 1.3s, not 0s.
    pub async fn skip_back_to_start(&self) -> Result<()> {
        let (position, _) = self.state.get_position().await;
        let window_size = self.state.get_window_size().await;
        let window_seconds = window_size as f64 / self.sample_rate as f64;
        let target = position.rem_euclid(window_seconds);

        info!(
            "Skip back: {:.3}s -> {:.3}s (window {:.3}s)",
            position, target, window_seconds
        );
        self.seek(target).await
    }

    /// Resize the window to one beat of the measured tap interval and realign
    /// window boundaries to it.
    pub async fn apply_tap_interval(&self, interval_ms: f64) -> Result<()> {
        let frames = tap_interval_to_frames(interval_ms, self.sample_rate);
        info!(
            "Applying tap interval {:.1}ms -> {} frame window",
            interval_ms, frames
        );
        self.set_window_size(frames)?;
        self.sync_window()
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Subscribe to player events.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> TransportSnapshot {
        self.state.snapshot().await
    }

    pub async fn get_state(&self) -> PlaybackState {
        self.state.get_state().await
    }

    pub async fn is_playing(&self) -> bool {
        self.state.get_state().await == PlaybackState::Playing
    }

    /// Last known position and duration, in seconds.
    pub async fn get_position(&self) -> (f64, f64) {
        self.state.get_position().await
    }

    /// Window size in frames, as last acknowledged by the renderer.
    pub async fn get_window_size(&self) -> usize {
        self.state.get_window_size().await
    }

    pub async fn get_direction(&self) -> Direction {
        self.state.get_direction().await
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Output device name, or `None` for a headless player.
    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    /// Whether the audio stream has reported an error.
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    /// Smallest accepted window size in frames.
    pub fn min_window_size(&self) -> usize {
        spindle_common::timing::MIN_WINDOW_FRAMES
    }

    /// Largest accepted window size in frames at this sample rate.
    pub fn max_window_size(&self) -> usize {
        clamp_window_size(usize::MAX, self.sample_rate)
    }

    /// Release the audio thread. The stream stops shortly after.
    pub fn shutdown(&self) {
        info!("Shutting down player");
        self.running.store(false, Ordering::Relaxed);
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn set_state(&self, state: PlaybackState) {
        self.state.set_state(state).await;
        self.events
            .emit_lossy(PlayerEvent::PlaybackStateChanged { state });
    }

    fn send_command(&self, command: RendererCommand) -> Result<()> {
        let mut commands = self
            .commands
            .lock()
            .map_err(|_| Error::Playback("Command channel poisoned".to_string()))?;
        commands
            .try_push(command)
            .map_err(|_| Error::Playback("Command queue full".to_string()))
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

/// Renderer handle for device-free operation.
///
/// Owns the [`BlockRenderer`] that would otherwise live in the stream
/// callback. Each render call stands in for one hardware quantum.
pub struct HeadlessRenderer {
    renderer: BlockRenderer,
    channels: usize,
}

impl HeadlessRenderer {
    pub fn sample_rate(&self) -> u32 {
        self.renderer.sample_rate()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Fill an interleaved block in place, as the stream callback would.
    pub fn render_into(&mut self, out: &mut [f32]) {
        self.renderer.produce_block(out);
    }

    /// Render `frames` frames and return the interleaved samples.
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames * self.channels];
        self.renderer.produce_block(&mut out);
        out
    }
}

/// Dedicated thread owning the device stream.
///
/// The stream handle is not `Send`, so it is created, started, and kept alive
/// here; the thread reports the negotiated format through `ready` and then
/// sleeps until `running` clears.
fn audio_thread(
    device: Option<String>,
    buffer_size: Option<u32>,
    commands: CommandConsumer,
    events: EventSender,
    ready: oneshot::Sender<Result<StreamHandshake>>,
    running: Arc<AtomicBool>,
) {
    let mut output = match AudioOutput::new(device, buffer_size) {
        Ok(output) => output,
        Err(e) => {
            error!("Failed to open audio output: {}", e);
            let _ = ready.send(Err(e));
            return;
        }
    };

    let sample_rate = output.sample_rate();
    let channels = output.channels() as usize;
    let mut renderer = BlockRenderer::new(sample_rate, channels, commands, events);

    if let Err(e) = output.start(move |block| renderer.produce_block(block)) {
        error!("Failed to start audio stream: {}", e);
        let _ = ready.send(Err(e));
        return;
    }

    let handshake = StreamHandshake {
        sample_rate,
        channels,
        device_name: output.device_name(),
        error_flag: output.error_flag(),
    };
    if ready.send(Ok(handshake)).is_err() {
        // Controller went away before the stream came up.
        return;
    }

    while running.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(200));
    }
    info!("Audio thread stopping");
}

/// Fold renderer events into the transport mirror and republish them.
///
/// The mirror is updated before each event goes out on the bus, so a
/// subscriber that hears an event can rely on the mirror reflecting it.
async fn run_event_pump(mut events: EventReceiver, state: SharedTransportState, bus: EventBus) {
    while let Some(event) = events.recv().await {
        match event {
            RendererEvent::Loaded { duration } => {
                debug!("Renderer loaded: {:.3}s", duration);
                state.set_duration(duration).await;
                state.set_position(0.0).await;
                state.set_state(PlaybackState::Loaded).await;
                bus.emit_lossy(PlayerEvent::Loaded { duration });
                bus.emit_lossy(PlayerEvent::PlaybackStateChanged {
                    state: PlaybackState::Loaded,
                });
            }
            RendererEvent::Progress { position } => {
                state.set_position(position).await;
                bus.emit_lossy(PlayerEvent::Progress { position });
            }
            RendererEvent::Ended => {
                info!("Playback ended");
                state.set_state(PlaybackState::Ended).await;
                bus.emit_lossy(PlayerEvent::Ended);
                bus.emit_lossy(PlayerEvent::PlaybackStateChanged {
                    state: PlaybackState::Ended,
                });
            }
            RendererEvent::WindowSizeChanged { window_size } => {
                debug!("Window size changed: {} frames", window_size);
                state.set_window_size(window_size).await;
                bus.emit_lossy(PlayerEvent::WindowSizeChanged { window_size });
            }
        }
    }
    debug!("Event pump stopped");
}

// ============================================================================
// Tests
// ============================================================================
