//! Playback engine: block renderer, transport controller, and messaging

pub mod controller;
pub mod message;
pub mod renderer;
pub mod state;
pub mod tap;

pub use controller::{HeadlessRenderer, Player};
pub use message::{Direction, RendererCommand, RendererEvent};
pub use renderer::BlockRenderer;
pub use state::{SharedTransportState, TransportSnapshot};
pub use tap::TapTempo;
