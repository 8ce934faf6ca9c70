use std::time::Duration;

/// The fixed cadence menu offered to the user. Arbitrary intervals are
/// snapped to the nearest entry.
pub const INTERVAL_PRESETS_MS: [u64; 6] = [250, 500, 750, 1000, 1500, 2000];

pub const CAMERA_DEFAULT_INTERVAL_MS: u64 = 750;
pub const CLIP_DEFAULT_INTERVAL_MS: u64 = 1500;

/// Snap an interval to the nearest preset.
pub fn snap_to_preset(interval_ms: u64) -> u64 {
    INTERVAL_PRESETS_MS
        .iter()
        .copied()
        .min_by_key(|p| p.abs_diff(interval_ms))
        .unwrap_or(CAMERA_DEFAULT_INTERVAL_MS)
}

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Detection cadence; one of the presets.
    pub interval: Duration,
    /// Downscale captured frames to this width before encoding, preserving
    /// aspect ratio. None sends native resolution.
    pub downscale_width: Option<u32>,
    /// Slow clip playback so the number of frames played between two
    /// detection ticks stays roughly constant.
    pub pace_playback: bool,
    pub target_frames_per_tick: f64,
}

impl SamplerConfig {
    pub fn for_camera() -> Self {
        Self {
            interval: Duration::from_millis(CAMERA_DEFAULT_INTERVAL_MS),
            downscale_width: None,
            pace_playback: false,
            target_frames_per_tick: crate::pacing::DEFAULT_FRAMES_PER_TICK,
        }
    }

    pub fn for_clip() -> Self {
        Self {
            interval: Duration::from_millis(CLIP_DEFAULT_INTERVAL_MS),
            downscale_width: None,
            pace_playback: true,
            target_frames_per_tick: crate::pacing::DEFAULT_FRAMES_PER_TICK,
        }
    }

    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval = Duration::from_millis(snap_to_preset(interval_ms));
        self
    }
}
