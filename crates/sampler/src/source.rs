use image::RgbImage;
use protocol::{MediaClock, PlaybackState};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("device unavailable: {0}")]
    Device(String),

    #[error("no frame decoded yet")]
    NotReady,

    #[error("capture failed: {0}")]
    Capture(String),
}

/// A live media source the sampler can pull frames from: a camera stream or
/// a loaded clip. The source keeps playing on its own; `grab` returns
/// whatever frame is currently visible without disturbing playback.
pub trait FrameSource: Send {
    /// Decoded frame dimensions, once known. Sampling ticks are skipped
    /// until this returns Some.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Copy the currently displayed frame into a private capture buffer.
    fn grab(&mut self) -> Result<RgbImage, SourceError>;

    /// Shared read-only clock, handed to the renderer for interpolation.
    fn clock(&self) -> Arc<dyn MediaClock>;

    /// Native playback rate in frames per second, when the source has one.
    fn native_fps(&self) -> Option<f64> {
        None
    }

    /// Adjust playback speed. Meaningful for clips; cameras ignore it.
    fn set_playback_rate(&mut self, _rate: f64) {}
}

/// Wall clock for sources that always advance (cameras, synthetic feeds).
pub(crate) struct WallClock {
    started: Instant,
}

impl WallClock {
    pub(crate) fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl MediaClock for WallClock {
    fn media_time(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn playback(&self) -> PlaybackState {
        PlaybackState::Playing
    }
}

/// Dev/demo stand-in for a camera: a dark tank with a bright wandering
/// blob, so the full capture -> detect -> overlay path can run without
/// hardware.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    frame_counter: u64,
    blob_x: f32,
    blob_y: f32,
    clock: Arc<WallClock>,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_counter: 0,
            blob_x: 0.3,
            blob_y: 0.5,
            clock: Arc::new(WallClock::new()),
        }
    }
}

impl FrameSource for SyntheticSource {
    fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.width, self.height))
    }

    fn grab(&mut self) -> Result<RgbImage, SourceError> {
        self.frame_counter += 1;

        // Random walk, reflected at the frame edges.
        self.blob_x = (self.blob_x + (fastrand::f32() - 0.5) * 0.06).clamp(0.05, 0.95);
        self.blob_y = (self.blob_y + (fastrand::f32() - 0.5) * 0.06).clamp(0.05, 0.95);

        let (cx, cy) = (
            self.blob_x * self.width as f32,
            self.blob_y * self.height as f32,
        );
        let radius = (self.width.min(self.height) as f32) * 0.08;

        let frame = RgbImage::from_fn(self.width, self.height, |x, y| {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            if (dx * dx + dy * dy).sqrt() < radius {
                image::Rgb([220, 140, 60])
            } else {
                image::Rgb([10, 40, 70])
            }
        });
        Ok(frame)
    }

    fn clock(&self) -> Arc<dyn MediaClock> {
        self.clock.clone() as Arc<dyn MediaClock>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_source_reports_dimensions_immediately() {
        let source = SyntheticSource::new(320, 240);
        assert_eq!(source.dimensions(), Some((320, 240)));
    }

    #[test]
    fn synthetic_frames_match_reported_dimensions() {
        let mut source = SyntheticSource::new(64, 48);
        let frame = source.grab().unwrap();
        assert_eq!((frame.width(), frame.height()), (64, 48));
    }

    #[test]
    fn synthetic_clock_always_plays() {
        let source = SyntheticSource::new(32, 32);
        assert_eq!(source.clock().playback(), PlaybackState::Playing);
    }
}
