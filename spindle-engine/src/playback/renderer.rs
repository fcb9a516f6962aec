//! Real-time block renderer.
//!
//! [`BlockRenderer`] runs entirely inside the audio callback. Each invocation
//! drains queued commands, then fills one interleaved output block from the
//! active window, reloading the window from the source buffer whenever it is
//! exhausted. Window loads are the only place the read cursor moves and the
//! only place a pending resize can take effect, so a window is never partially
//! one size and partially another.
//!
//! Reverse playback selects source regions back to front, but every window is
//! copied and consumed in forward sample order. Flipping direction therefore
//! scrubs window-sized regions backwards rather than reversing individual
//! samples.

use spindle_common::timing::{clamp_window_size, default_window_size, PROGRESS_INTERVAL_FRAMES};

use crate::audio::DecodedAudio;
use crate::playback::message::{
    CommandConsumer, Direction, EventSender, RendererCommand, RendererEvent,
};

use ringbuf::traits::*;

/// One loaded window of source material.
///
/// `channels[c][i]` holds the sample for source frame `base + i`; slots whose
/// source frame falls outside the buffer hold zero.
struct Window {
    /// Forward-ordered samples, one inner buffer per source channel.
    channels: Vec<Vec<f32>>,
    /// Source frame index corresponding to slot zero. May be negative when a
    /// reverse window ran past the start of the buffer.
    base: i64,
    /// Frames already copied out of this window.
    read: usize,
    /// Total frames in this window.
    len: usize,
}

/// Outcome of a window load attempt.
enum WindowLoad {
    /// A window was populated and the cursor advanced.
    Loaded,
    /// The requested region lies entirely outside the source buffer.
    OutOfBounds,
}

/// Callback-side playback engine.
///
/// Owns the decoded source buffer, the read cursor, and the active window.
/// The control plane reaches it only through the command ring passed to
/// [`BlockRenderer::new`]; events travel back on the paired sender.
pub struct BlockRenderer {
    commands: CommandConsumer,
    events: EventSender,
    /// Output sample rate, fixed for the life of the stream.
    sample_rate: u32,
    /// Output channel count of the hardware block.
    channels: usize,
    audio: Option<DecodedAudio>,
    window: Option<Window>,
    /// Next window's reference edge: start frame when forward, end frame
    /// when reverse. Out-of-bounds values are legal and signal end-of-media
    /// at the next load.
    cursor: i64,
    direction: Direction,
    window_size: usize,
    /// Resize requested by the control plane, applied at the next window
    /// boundary.
    pending_resize: Option<usize>,
    playing: bool,
    /// Last progress interval the playhead was observed in. `None` forces an
    /// emission on the next playing block.
    progress_bucket: Option<i64>,
}

impl BlockRenderer {
    /// Create a renderer for a stream with the given output format.
    ///
    /// # Arguments
    /// * `sample_rate` - Output sample rate in Hz
    /// * `channels` - Interleaved output channel count
    /// * `commands` - Consumer half of the command ring
    /// * `events` - Sender half of the event channel
    pub fn new(
        sample_rate: u32,
        channels: usize,
        commands: CommandConsumer,
        events: EventSender,
    ) -> Self {
        Self {
            commands,
            events,
            sample_rate,
            channels: channels.max(1),
            audio: None,
            window: None,
            cursor: 0,
            direction: Direction::Forward,
            window_size: default_window_size(sample_rate),
            pending_resize: None,
            playing: false,
            progress_bucket: None,
        }
    }

    /// Output sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Whether the renderer is currently producing samples.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Fill one interleaved output block.
    ///
    /// Called once per hardware quantum. Applies every queued command first,
    /// then copies samples from the active window, reloading it as needed.
    /// When the renderer is idle or has no source material the block is
    /// silence. Never blocks.
    pub fn produce_block(&mut self, out: &mut [f32]) {
        while let Some(command) = self.commands.try_pop() {
            self.apply_command(command);
        }

        if !self.playing || self.audio.is_none() {
            out.fill(0.0);
            return;
        }

        let channels = self.channels;
        let frame_total = out.len() / channels;
        let mut frame = 0;

        while frame < frame_total {
            let exhausted = match &self.window {
                Some(window) => window.read >= window.len,
                None => true,
            };
            if exhausted {
                match self.load_window() {
                    WindowLoad::Loaded => {}
                    WindowLoad::OutOfBounds => {
                        out[frame * channels..].fill(0.0);
                        self.finish_ended();
                        return;
                    }
                }
            }

            if let Some(window) = self.window.as_mut() {
                let take = (window.len - window.read).min(frame_total - frame);
                let source_channels = window.channels.len();
                for i in 0..take {
                    let slot = window.read + i;
                    let base = (frame + i) * channels;
                    for c in 0..channels {
                        // Mono (or narrower) sources repeat their last channel.
                        let src = c.min(source_channels - 1);
                        out[base + c] = window.channels[src][slot];
                    }
                }
                window.read += take;
                frame += take;
            }
        }

        // cpal hands out whole frames; any ragged tail is still zeroed.
        out[frame_total * channels..].fill(0.0);

        self.report_progress();
    }

    // ========================================================================
    // Command handling
    // ========================================================================

    fn apply_command(&mut self, command: RendererCommand) {
        match command {
            RendererCommand::Load(audio) => {
                // Duration on the renderer's clock, so it lines up with the
                // positions reported in progress events.
                let duration = audio.frame_count() as f64 / self.sample_rate as f64;
                self.audio = Some(audio);
                self.cursor = 0;
                self.window = None;
                self.playing = false;
                self.progress_bucket = None;
                self.send_event(RendererEvent::Loaded { duration });
            }
            RendererCommand::Play => {
                self.playing = true;
            }
            RendererCommand::Pause => {
                self.playing = false;
            }
            RendererCommand::Stop => {
                self.playing = false;
                self.cursor = 0;
                self.window = None;
                self.progress_bucket = None;
            }
            RendererCommand::Seek(seconds) => {
                self.cursor = spindle_common::timing::seconds_to_frames(seconds, self.sample_rate);
                self.window = None;
                self.progress_bucket = None;
            }
            RendererCommand::SetDirection(direction) => {
                self.direction = direction;
                self.window = None;
            }
            RendererCommand::SetWindowSize(requested) => {
                self.pending_resize = Some(clamp_window_size(requested, self.sample_rate));
            }
            RendererCommand::SyncWindow => {
                self.window = None;
            }
        }
    }

    // ========================================================================
    // Window management
    // ========================================================================

    /// Populate a fresh window at the cursor and advance the cursor past it.
    ///
    /// A pending resize is applied first, so the new size governs both the
    /// region selected and the storage filled. Returns
    /// [`WindowLoad::OutOfBounds`] without moving the cursor when the
    /// selected region has no overlap with the source buffer.
    fn load_window(&mut self) -> WindowLoad {
        if let Some(size) = self.pending_resize.take() {
            self.window_size = size;
            self.send_event(RendererEvent::WindowSizeChanged { window_size: size });
        }

        let Some(audio) = &self.audio else {
            return WindowLoad::OutOfBounds;
        };

        let window_len = self.window_size as i64;
        let source_len = audio.frame_count() as i64;
        let start = match self.direction {
            Direction::Forward => self.cursor,
            Direction::Reverse => self.cursor - window_len,
        };
        let end = start + window_len;

        let lo = start.max(0);
        let hi = end.min(source_len);
        if lo >= hi {
            return WindowLoad::OutOfBounds;
        }

        // Reuse the previous window's storage when shapes allow.
        let mut storage = match self.window.take() {
            Some(window) => window.channels,
            None => Vec::new(),
        };
        storage.resize_with(audio.channel_count(), Vec::new);

        let prefix = (lo - start) as usize;
        let copy_len = (hi - lo) as usize;
        let total = self.window_size;
        for (buffer, source) in storage.iter_mut().zip(audio.channels.iter()) {
            buffer.resize(total, 0.0);
            buffer[..prefix].fill(0.0);
            buffer[prefix..prefix + copy_len]
                .copy_from_slice(&source[lo as usize..hi as usize]);
            buffer[prefix + copy_len..].fill(0.0);
        }

        self.window = Some(Window {
            channels: storage,
            base: start,
            read: 0,
            len: total,
        });
        self.cursor += window_len * self.direction.signum();

        WindowLoad::Loaded
    }

    /// Stop production after the cursor ran off the source buffer.
    ///
    /// The cursor is left where it was so a later `play` without a seek
    /// reports end-of-media again instead of wrapping around.
    fn finish_ended(&mut self) {
        self.playing = false;
        self.window = None;
        self.send_event(RendererEvent::Ended);
    }

    // ========================================================================
    // Progress reporting
    // ========================================================================

    /// Emit a progress event whenever the playhead enters a new reporting
    /// interval. Checked once per block, so dense intervals coalesce.
    fn report_progress(&mut self) {
        if !self.playing {
            return;
        }
        let (Some(audio), Some(window)) = (&self.audio, &self.window) else {
            return;
        };

        let source_len = audio.frame_count() as i64;
        let playhead = (window.base + window.read as i64).clamp(0, source_len);
        let bucket = playhead / PROGRESS_INTERVAL_FRAMES;
        if self.progress_bucket != Some(bucket) {
            self.progress_bucket = Some(bucket);
            let position = playhead as f64 / self.sample_rate as f64;
            self.send_event(RendererEvent::Progress { position });
        }
    }

    /// The control plane dropping its receiver is not an error here; the
    /// renderer keeps producing until the stream itself is torn down.
    fn send_event(&self, event: RendererEvent) {
        let _ = self.events.send(event);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::message::{
        command_channel, event_channel, CommandProducer, EventReceiver,
    };

    const RATE: u32 = 48000;

    /// Mono source where sample i == i, handy for asserting exact regions.
    fn ramp_audio(frames: usize) -> DecodedAudio {
        let samples: Vec<f32> = (0..frames).map(|i| i as f32).collect();
        DecodedAudio::new(vec![samples], RATE).unwrap()
    }

    fn stereo_audio(frames: usize) -> DecodedAudio {
        let left: Vec<f32> = (0..frames).map(|i| i as f32).collect();
        let right: Vec<f32> = (0..frames).map(|i| -(i as f32)).collect();
        DecodedAudio::new(vec![left, right], RATE).unwrap()
    }

    /// Renderer with a command producer wired in and events captured.
    fn harness(channels: usize) -> (BlockRenderer, CommandProducer, EventReceiver) {
        let (cmd_tx, cmd_rx) = command_channel(64);
        let (evt_tx, evt_rx) = event_channel();
        let renderer = BlockRenderer::new(RATE, channels, cmd_rx, evt_tx);
        (renderer, cmd_tx, evt_rx)
    }

    fn drain_events(rx: &mut EventReceiver) -> Vec<RendererEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn produce_frames(renderer: &mut BlockRenderer, frames: usize, channels: usize) -> Vec<f32> {
        let mut out = vec![1.0; frames * channels];
        renderer.produce_block(&mut out);
        out
    }

    #[test]
    fn test_idle_renderer_produces_silence() {
        let (mut renderer, _cmd, _evt) = harness(2);
        let out = produce_frames(&mut renderer, 128, 2);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_load_emits_loaded_and_stays_idle() {
        let (mut renderer, mut cmd, mut evt) = harness(1);
        cmd.try_push(RendererCommand::Load(ramp_audio(96000))).unwrap();

        let out = produce_frames(&mut renderer, 128, 1);
        assert!(out.iter().all(|&s| s == 0.0));
        assert!(!renderer.is_playing());
        assert_eq!(
            drain_events(&mut evt),
            vec![RendererEvent::Loaded { duration: 2.0 }]
        );
    }

    #[test]
    fn test_forward_blocks_concatenate_to_source() {
        // Holds across window sizes, including ones that do not divide the
        // block size or the source length.
        for window_size in [128usize, 200, 1000, 4096] {
            let (mut renderer, mut cmd, _evt) = harness(1);
            let frames = 3000;
            cmd.try_push(RendererCommand::Load(ramp_audio(frames))).unwrap();
            cmd.try_push(RendererCommand::SetWindowSize(window_size)).unwrap();
            cmd.try_push(RendererCommand::Play).unwrap();

            let mut collected = Vec::new();
            for _ in 0..40 {
                collected.extend(produce_frames(&mut renderer, 128, 1));
            }

            for (i, &sample) in collected.iter().enumerate() {
                let expected = if i < frames { i as f32 } else { 0.0 };
                assert_eq!(sample, expected, "window {} sample {}", window_size, i);
            }
        }
    }

    #[test]
    fn test_reverse_windows_walk_backwards_forward_ordered() {
        let (mut renderer, mut cmd, _evt) = harness(1);
        cmd.try_push(RendererCommand::Load(ramp_audio(1200))).unwrap();
        cmd.try_push(RendererCommand::SetWindowSize(400)).unwrap();
        cmd.try_push(RendererCommand::SetDirection(Direction::Reverse)).unwrap();
        cmd.try_push(RendererCommand::Seek(1200.0 / RATE as f64)).unwrap();
        cmd.try_push(RendererCommand::Play).unwrap();

        let out = produce_frames(&mut renderer, 1200, 1);

        // Regions [800,1200), [400,800), [0,400): adjacent and decreasing,
        // each internally in forward sample order.
        for i in 0..400 {
            assert_eq!(out[i], (800 + i) as f32);
            assert_eq!(out[400 + i], (400 + i) as f32);
            assert_eq!(out[800 + i], i as f32);
        }
    }

    #[test]
    fn test_reverse_past_start_zero_fills_window_front() {
        let (mut renderer, mut cmd, _evt) = harness(1);
        cmd.try_push(RendererCommand::Load(ramp_audio(1000))).unwrap();
        cmd.try_push(RendererCommand::SetWindowSize(400)).unwrap();
        cmd.try_push(RendererCommand::SetDirection(Direction::Reverse)).unwrap();
        cmd.try_push(RendererCommand::Seek(300.0 / RATE as f64)).unwrap();
        cmd.try_push(RendererCommand::Play).unwrap();

        let out = produce_frames(&mut renderer, 400, 1);

        // Window covers [-100, 300): slots 0..100 are the out-of-bounds
        // prefix, slots 100..400 hold frames 0..300 in order.
        assert!(out[..100].iter().all(|&s| s == 0.0));
        for i in 0..300 {
            assert_eq!(out[100 + i], i as f32);
        }
    }

    #[test]
    fn test_resize_defers_to_window_boundary() {
        let (mut renderer, mut cmd, mut evt) = harness(1);
        cmd.try_push(RendererCommand::Load(ramp_audio(4000))).unwrap();
        cmd.try_push(RendererCommand::SetWindowSize(1000)).unwrap();
        cmd.try_push(RendererCommand::Play).unwrap();

        // Partway into the first window.
        produce_frames(&mut renderer, 600, 1);
        drain_events(&mut evt);

        cmd.try_push(RendererCommand::SetWindowSize(500)).unwrap();
        let out = produce_frames(&mut renderer, 400, 1);

        // The in-progress window keeps its size: frames 600..1000 still come
        // from the original region, uninterrupted.
        for (i, &sample) in out.iter().enumerate() {
            assert_eq!(sample, (600 + i) as f32);
        }
        assert!(drain_events(&mut evt)
            .iter()
            .all(|e| !matches!(e, RendererEvent::WindowSizeChanged { .. })));

        // Crossing the boundary applies the resize and announces it once.
        let out = produce_frames(&mut renderer, 600, 1);
        for (i, &sample) in out.iter().enumerate() {
            assert_eq!(sample, (1000 + i) as f32);
        }
        let resizes: Vec<_> = drain_events(&mut evt)
            .into_iter()
            .filter(|e| matches!(e, RendererEvent::WindowSizeChanged { .. }))
            .collect();
        assert_eq!(
            resizes,
            vec![RendererEvent::WindowSizeChanged { window_size: 500 }]
        );
        assert_eq!(renderer.window_size, 500);
    }

    #[test]
    fn test_resize_request_is_clamped() {
        let (mut renderer, mut cmd, mut evt) = harness(1);
        cmd.try_push(RendererCommand::Load(ramp_audio(96000 * 11))).unwrap();
        cmd.try_push(RendererCommand::SetWindowSize(10_000_000)).unwrap();
        cmd.try_push(RendererCommand::Play).unwrap();

        produce_frames(&mut renderer, 128, 1);
        let events = drain_events(&mut evt);
        assert!(events.contains(&RendererEvent::WindowSizeChanged {
            window_size: 10 * RATE as usize
        }));

        cmd.try_push(RendererCommand::SetWindowSize(1)).unwrap();
        cmd.try_push(RendererCommand::SyncWindow).unwrap();
        produce_frames(&mut renderer, 128, 1);
        let events = drain_events(&mut evt);
        assert!(events.contains(&RendererEvent::WindowSizeChanged { window_size: 128 }));
    }

    #[test]
    fn test_seek_discards_window_immediately() {
        let (mut renderer, mut cmd, _evt) = harness(1);
        cmd.try_push(RendererCommand::Load(ramp_audio(96000))).unwrap();
        cmd.try_push(RendererCommand::SetWindowSize(48000)).unwrap();
        cmd.try_push(RendererCommand::Play).unwrap();
        produce_frames(&mut renderer, 256, 1);

        cmd.try_push(RendererCommand::Seek(1.0)).unwrap();
        let out = produce_frames(&mut renderer, 256, 1);

        // Nothing from before the seek target leaks into the output.
        for (i, &sample) in out.iter().enumerate() {
            assert_eq!(sample, (48000 + i) as f32);
        }
    }

    #[test]
    fn test_boundary_positions_step_by_window_size() {
        let (mut renderer, mut cmd, mut evt) = harness(1);
        cmd.try_push(RendererCommand::Load(ramp_audio(1000))).unwrap();
        cmd.try_push(RendererCommand::SetWindowSize(400)).unwrap();
        cmd.try_push(RendererCommand::Play).unwrap();

        let mut boundaries = vec![];
        for _ in 0..12 {
            produce_frames(&mut renderer, 128, 1);
            if boundaries.last() != Some(&renderer.cursor) {
                boundaries.push(renderer.cursor);
            }
        }

        // Cursor walks 400, 800, 1200; the load at 1200 finds no data and
        // leaves the cursor in place while ending playback.
        assert_eq!(boundaries, vec![400, 800, 1200]);
        let ended = drain_events(&mut evt)
            .into_iter()
            .filter(|e| *e == RendererEvent::Ended)
            .count();
        assert_eq!(ended, 1);
        assert!(!renderer.is_playing());
    }

    #[test]
    fn test_ended_emits_once_then_silence() {
        let (mut renderer, mut cmd, mut evt) = harness(1);
        cmd.try_push(RendererCommand::Load(ramp_audio(300))).unwrap();
        cmd.try_push(RendererCommand::SetWindowSize(256)).unwrap();
        cmd.try_push(RendererCommand::Play).unwrap();

        // 300 frames of data inside two 256-frame windows, then done.
        let first = produce_frames(&mut renderer, 512, 1);
        assert_eq!(first[299], 299.0);
        assert_eq!(first[300], 0.0);
        produce_frames(&mut renderer, 512, 1);

        let ended = drain_events(&mut evt)
            .into_iter()
            .filter(|e| *e == RendererEvent::Ended)
            .count();
        assert_eq!(ended, 1);

        // Playing again without a seek immediately reports the end again.
        cmd.try_push(RendererCommand::Play).unwrap();
        let out = produce_frames(&mut renderer, 128, 1);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(drain_events(&mut evt), vec![RendererEvent::Ended]);
    }

    #[test]
    fn test_stop_rewinds_and_silences() {
        let (mut renderer, mut cmd, _evt) = harness(1);
        cmd.try_push(RendererCommand::Load(ramp_audio(96000))).unwrap();
        cmd.try_push(RendererCommand::Play).unwrap();
        produce_frames(&mut renderer, 512, 1);

        cmd.try_push(RendererCommand::Stop).unwrap();
        let out = produce_frames(&mut renderer, 128, 1);
        assert!(out.iter().all(|&s| s == 0.0));

        cmd.try_push(RendererCommand::Play).unwrap();
        let out = produce_frames(&mut renderer, 128, 1);
        for (i, &sample) in out.iter().enumerate() {
            assert_eq!(sample, i as f32);
        }
    }

    #[test]
    fn test_pause_resumes_where_it_left_off() {
        let (mut renderer, mut cmd, _evt) = harness(1);
        cmd.try_push(RendererCommand::Load(ramp_audio(96000))).unwrap();
        cmd.try_push(RendererCommand::Play).unwrap();
        produce_frames(&mut renderer, 512, 1);

        cmd.try_push(RendererCommand::Pause).unwrap();
        let out = produce_frames(&mut renderer, 128, 1);
        assert!(out.iter().all(|&s| s == 0.0));

        cmd.try_push(RendererCommand::Play).unwrap();
        let out = produce_frames(&mut renderer, 128, 1);
        for (i, &sample) in out.iter().enumerate() {
            assert_eq!(sample, (512 + i) as f32);
        }
    }

    #[test]
    fn test_sync_window_rebuilds_at_cursor() {
        let (mut renderer, mut cmd, _evt) = harness(1);
        cmd.try_push(RendererCommand::Load(ramp_audio(4000))).unwrap();
        cmd.try_push(RendererCommand::SetWindowSize(1000)).unwrap();
        cmd.try_push(RendererCommand::Play).unwrap();
        produce_frames(&mut renderer, 300, 1);

        // Discarding the window mid-flight restarts output at the cursor,
        // which already points past the discarded window.
        cmd.try_push(RendererCommand::SyncWindow).unwrap();
        let out = produce_frames(&mut renderer, 200, 1);
        for (i, &sample) in out.iter().enumerate() {
            assert_eq!(sample, (1000 + i) as f32);
        }
    }

    #[test]
    fn test_mono_source_fills_all_output_channels() {
        let (mut renderer, mut cmd, _evt) = harness(2);
        cmd.try_push(RendererCommand::Load(ramp_audio(1000))).unwrap();
        cmd.try_push(RendererCommand::Play).unwrap();

        let out = produce_frames(&mut renderer, 128, 2);
        for frame in 0..128 {
            assert_eq!(out[frame * 2], frame as f32);
            assert_eq!(out[frame * 2 + 1], frame as f32);
        }
    }

    #[test]
    fn test_stereo_source_maps_channels() {
        let (mut renderer, mut cmd, _evt) = harness(2);
        cmd.try_push(RendererCommand::Load(stereo_audio(1000))).unwrap();
        cmd.try_push(RendererCommand::Play).unwrap();

        let out = produce_frames(&mut renderer, 64, 2);
        for frame in 1..64 {
            assert_eq!(out[frame * 2], frame as f32);
            assert_eq!(out[frame * 2 + 1], -(frame as f32));
        }
    }

    #[test]
    fn test_progress_reports_on_interval_crossings() {
        let (mut renderer, mut cmd, mut evt) = harness(1);
        cmd.try_push(RendererCommand::Load(ramp_audio(96000))).unwrap();
        cmd.try_push(RendererCommand::Play).unwrap();

        produce_frames(&mut renderer, 128, 1);
        let events = drain_events(&mut evt);
        let first: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                RendererEvent::Progress { position } => Some(*position),
                _ => None,
            })
            .collect();
        assert_eq!(first, vec![128.0 / RATE as f64]);

        // No new interval crossed yet.
        produce_frames(&mut renderer, 128, 1);
        assert!(drain_events(&mut evt)
            .iter()
            .all(|e| !matches!(e, RendererEvent::Progress { .. })));

        // Push the playhead across the 4800-frame line.
        produce_frames(&mut renderer, 4800, 1);
        let positions: Vec<_> = drain_events(&mut evt)
            .into_iter()
            .filter_map(|e| match e {
                RendererEvent::Progress { position } => Some(position),
                _ => None,
            })
            .collect();
        assert_eq!(positions, vec![(128 + 128 + 4800) as f64 / RATE as f64]);
    }

    #[test]
    fn test_progress_silent_while_paused() {
        let (mut renderer, mut cmd, mut evt) = harness(1);
        cmd.try_push(RendererCommand::Load(ramp_audio(96000))).unwrap();
        cmd.try_push(RendererCommand::Play).unwrap();
        produce_frames(&mut renderer, 128, 1);
        cmd.try_push(RendererCommand::Pause).unwrap();
        drain_events(&mut evt);

        for _ in 0..10 {
            produce_frames(&mut renderer, 4800, 1);
        }
        assert!(drain_events(&mut evt).is_empty());
    }

    #[test]
    fn test_commands_drain_while_idle() {
        let (mut renderer, mut cmd, mut evt) = harness(1);
        // Queue a full session before the first callback ever runs.
        cmd.try_push(RendererCommand::Load(ramp_audio(1000))).unwrap();
        cmd.try_push(RendererCommand::Seek(500.0 / RATE as f64)).unwrap();
        cmd.try_push(RendererCommand::Play).unwrap();

        let out = produce_frames(&mut renderer, 128, 1);
        for (i, &sample) in out.iter().enumerate() {
            assert_eq!(sample, (500 + i) as f32);
        }
        assert!(drain_events(&mut evt)
            .contains(&RendererEvent::Loaded { duration: 1000.0 / RATE as f64 }));
    }

    #[test]
    fn test_load_replaces_buffer_and_rewinds() {
        let (mut renderer, mut cmd, mut evt) = harness(1);
        cmd.try_push(RendererCommand::Load(ramp_audio(1000))).unwrap();
        cmd.try_push(RendererCommand::Play).unwrap();
        produce_frames(&mut renderer, 512, 1);
        drain_events(&mut evt);

        // 100-frame ramp offset by 7 so the two sources are distinguishable.
        let replacement: Vec<f32> = (0..100).map(|i| (i + 7) as f32).collect();
        cmd.try_push(RendererCommand::Load(
            DecodedAudio::new(vec![replacement], RATE).unwrap(),
        ))
        .unwrap();

        // Load alone leaves the renderer idle.
        let out = produce_frames(&mut renderer, 128, 1);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(
            drain_events(&mut evt),
            vec![RendererEvent::Loaded { duration: 100.0 / RATE as f64 }]
        );

        cmd.try_push(RendererCommand::Play).unwrap();
        let out = produce_frames(&mut renderer, 128, 1);
        assert_eq!(out[0], 7.0);
        assert_eq!(out[99], 106.0);
        assert_eq!(out[100], 0.0);
    }

    #[test]
    fn test_direction_flip_mid_window_replays_region_behind_cursor() {
        let (mut renderer, mut cmd, _evt) = harness(1);
        cmd.try_push(RendererCommand::Load(ramp_audio(4000))).unwrap();
        cmd.try_push(RendererCommand::SetWindowSize(1000)).unwrap();
        cmd.try_push(RendererCommand::Play).unwrap();
        produce_frames(&mut renderer, 300, 1);

        // Cursor sits at 1000 (next forward start). Reversing selects
        // [0, 1000) as the next window.
        cmd.try_push(RendererCommand::SetDirection(Direction::Reverse)).unwrap();
        let out = produce_frames(&mut renderer, 100, 1);
        for (i, &sample) in out.iter().enumerate() {
            assert_eq!(sample, i as f32);
        }
    }

    #[test]
    fn test_reverse_from_zero_ends_immediately() {
        let (mut renderer, mut cmd, mut evt) = harness(1);
        cmd.try_push(RendererCommand::Load(ramp_audio(1000))).unwrap();
        cmd.try_push(RendererCommand::SetDirection(Direction::Reverse)).unwrap();
        cmd.try_push(RendererCommand::Play).unwrap();

        let out = produce_frames(&mut renderer, 128, 1);
        assert!(out.iter().all(|&s| s == 0.0));
        let events = drain_events(&mut evt);
        assert!(events.contains(&RendererEvent::Ended));
    }
}
