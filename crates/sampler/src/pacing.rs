use std::time::Duration;

/// Keep roughly this many source frames between two detection ticks when
/// pacing is enabled.
pub const DEFAULT_FRAMES_PER_TICK: f64 = 30.0;

/// Never slow playback below this rate; a crawling clip is worse than an
/// occasionally stale overlay.
pub const MIN_PLAYBACK_RATE: f64 = 0.25;

/// Playback-rate pacing for clip sources: slows the clip so the overlay
/// stays visually aligned at coarse sampling intervals. Only ever reduces
/// speed; restored to 1.0x when sampling stops.
pub struct PlaybackPacing {
    target_frames_per_tick: f64,
    current: f64,
}

impl PlaybackPacing {
    pub fn new(target_frames_per_tick: f64) -> Self {
        Self {
            target_frames_per_tick,
            current: 1.0,
        }
    }

    /// Rate that keeps frames-per-tick near the target for a source playing
    /// at `source_fps` sampled every `interval`.
    pub fn rate_for(&self, source_fps: f64, interval: Duration) -> f64 {
        let natural = source_fps * interval.as_secs_f64();
        if natural <= self.target_frames_per_tick {
            return 1.0;
        }
        (self.target_frames_per_tick / natural).clamp(MIN_PLAYBACK_RATE, 1.0)
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    /// Adopt a new rate. Returns true if it changed.
    pub fn update(&mut self, rate: f64) -> bool {
        if (rate - self.current).abs() < f64::EPSILON {
            return false;
        }
        self.current = rate;
        true
    }

    /// Back to normal speed. Returns true if a change must be applied.
    pub fn reset(&mut self) -> bool {
        self.update(1.0)
    }
}
