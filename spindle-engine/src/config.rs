//! Player configuration

/// Playback engine configuration
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Output device name (None = system default)
    pub device: Option<String>,
    /// Requested hardware block size in frames (None = device default)
    pub buffer_size: Option<u32>,
    /// Render without a device, driven manually (tests, offline export)
    pub headless: Option<HeadlessConfig>,
    /// EventBus channel capacity
    pub event_capacity: usize,
    /// Command ring depth (control → real-time)
    pub command_queue_depth: usize,
}

/// Parameters for device-free rendering
#[derive(Debug, Clone, Copy)]
pub struct HeadlessConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            device: None,
            buffer_size: None,
            headless: None,
            event_capacity: 256,
            command_queue_depth: 64,
        }
    }
}

impl PlayerConfig {
    /// Configuration for a headless player at the given output format
    pub fn headless(sample_rate: u32, channels: u16) -> Self {
        Self {
            headless: Some(HeadlessConfig {
                sample_rate,
                channels,
            }),
            ..Self::default()
        }
    }
}
