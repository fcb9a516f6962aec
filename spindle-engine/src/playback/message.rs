//! Message types exchanged between the control plane and the renderer.
//!
//! Commands flow control -> renderer through a lock-free SPSC ring so the
//! audio callback never blocks on the sender. Events flow renderer -> control
//! through an unbounded tokio channel; the callback side only ever calls
//! `send`, which is wait-free for the unbounded flavor.

use ringbuf::{traits::*, HeapRb};
use tokio::sync::mpsc;

use crate::audio::DecodedAudio;

/// Playback direction through the source material.
///
/// Direction decides which way the window cursor walks between windows.
/// Samples inside a window are always stored and consumed forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    /// Signed unit step for cursor arithmetic (+1 forward, -1 reverse).
    pub fn signum(&self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }

    /// The opposite direction.
    pub fn flipped(&self) -> Direction {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Forward
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Reverse => write!(f, "reverse"),
        }
    }
}

/// Commands accepted by the renderer.
///
/// Each command is applied at the start of the next block, before any
/// samples are produced, so a burst of commands queued between callbacks
/// takes effect atomically from the listener's point of view.
#[derive(Debug)]
pub enum RendererCommand {
    /// Replace the loaded source material and rewind to frame zero.
    Load(DecodedAudio),
    /// Begin or resume playback from the current cursor.
    Play,
    /// Suspend playback, keeping the cursor and current window intact.
    Pause,
    /// Halt playback and rewind the cursor to frame zero.
    Stop,
    /// Move the cursor to the given position in seconds.
    Seek(f64),
    /// Change the direction the cursor walks between windows.
    SetDirection(Direction),
    /// Request a new window size in frames, applied at the next boundary.
    SetWindowSize(usize),
    /// Discard the active window so the next block rebuilds it at the cursor.
    SyncWindow,
}

/// Events emitted by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum RendererEvent {
    /// New source material is in place; duration is in seconds.
    Loaded { duration: f64 },
    /// Periodic position report in seconds, sent while playing.
    Progress { position: f64 },
    /// The cursor walked off the end of the source and playback stopped.
    Ended,
    /// A deferred resize was applied at a window boundary.
    WindowSizeChanged { window_size: usize },
}

/// Producer half of the command ring, held by the control plane.
pub type CommandProducer = ringbuf::HeapProd<RendererCommand>;

/// Consumer half of the command ring, owned by the renderer.
pub type CommandConsumer = ringbuf::HeapCons<RendererCommand>;

/// Create the SPSC command ring with room for `depth` queued commands.
pub fn command_channel(depth: usize) -> (CommandProducer, CommandConsumer) {
    HeapRb::new(depth).split()
}

/// Sender half of the event channel, held by the renderer.
pub type EventSender = mpsc::UnboundedSender<RendererEvent>;

/// Receiver half of the event channel, drained by the control plane.
pub type EventReceiver = mpsc::UnboundedReceiver<RendererEvent>;

/// Create the renderer -> control event channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_signum() {
        assert_eq!(Direction::Forward.signum(), 1);
        assert_eq!(Direction::Reverse.signum(), -1);
    }

    #[test]
    fn test_direction_flipped() {
        assert_eq!(Direction::Forward.flipped(), Direction::Reverse);
        assert_eq!(Direction::Reverse.flipped(), Direction::Forward);
        assert_eq!(Direction::Forward.flipped().flipped(), Direction::Forward);
    }

    #[test]
    fn test_direction_default_is_forward() {
        assert_eq!(Direction::default(), Direction::Forward);
    }

    #[test]
    fn test_command_channel_is_bounded() {
        let (mut tx, mut rx) = command_channel(2);

        assert!(tx.try_push(RendererCommand::Play).is_ok());
        assert!(tx.try_push(RendererCommand::Pause).is_ok());
        // Third push exceeds the requested depth.
        assert!(tx.try_push(RendererCommand::Stop).is_err());

        assert!(matches!(rx.try_pop(), Some(RendererCommand::Play)));
        assert!(matches!(rx.try_pop(), Some(RendererCommand::Pause)));
        assert!(rx.try_pop().is_none());
    }

    #[test]
    fn test_event_channel_delivers_in_order() {
        let (tx, mut rx) = event_channel();

        tx.send(RendererEvent::Loaded { duration: 1.5 }).unwrap();
        tx.send(RendererEvent::Ended).unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            RendererEvent::Loaded { duration: 1.5 }
        );
        assert_eq!(rx.try_recv().unwrap(), RendererEvent::Ended);
        assert!(rx.try_recv().is_err());
    }
}
