//! Playback synchronization: picks the detection set the renderer treats as
//! active at each tick, optionally smoothing box motion between detection
//! ticks by interpolating the two most recent batches.

use image::RgbaImage;
use protocol::{Detection, PlaybackState, SessionSnapshot};
use std::sync::Arc;

/// Abandon smoothing once the latest batch is older than this many sampling
/// intervals; a stale pair says nothing about current motion.
pub const STALENESS_FACTOR_LIMIT: f64 = 2.0;

/// Motion is only ever applied at half strength to avoid overshooting the
/// latest observed position.
pub const MOTION_DAMPING: f32 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Interpolate between the two most recent batches while playing.
    pub smoothing: bool,
    /// Draw the backend-annotated frame when one is available instead of
    /// client-side boxes.
    pub prefer_annotated: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            smoothing: true,
            prefer_annotated: true,
        }
    }
}

/// What the renderer should draw this tick.
pub enum ActiveSet {
    Empty,
    Annotated(Arc<RgbaImage>),
    Boxes(Vec<Detection>),
}

/// Resolve the active detection set for the current instant.
pub fn active_set(
    snapshot: Option<&SessionSnapshot>,
    media_time: f64,
    playback: PlaybackState,
    options: &SyncOptions,
) -> ActiveSet {
    let Some(snapshot) = snapshot else {
        return ActiveSet::Empty;
    };

    if options.prefer_annotated
        && let Some(annotated) = &snapshot.latest.annotated
    {
        return ActiveSet::Annotated(Arc::clone(annotated));
    }

    let latest = &snapshot.latest.detections;

    // Smoothing pauses whenever the media is not actually advancing.
    if !options.smoothing || !playback.is_advancing() {
        return ActiveSet::Boxes(latest.clone());
    }
    let Some(previous) = &snapshot.previous else {
        return ActiveSet::Boxes(latest.clone());
    };

    let interval = snapshot.interval.as_secs_f64();
    let elapsed = media_time - snapshot.media_time;
    if interval <= 0.0 || elapsed < 0.0 || elapsed > interval * STALENESS_FACTOR_LIMIT {
        return ActiveSet::Boxes(latest.clone());
    }

    let factor = (elapsed / interval).clamp(0.0, 1.0) as f32;
    ActiveSet::Boxes(interpolate(latest, &previous.detections, factor))
}

/// Move each box's top-left corner along the delta observed between the two
/// batches, damped by half, keeping size from the latest batch:
/// `rendered = lerp(midpoint(prev, latest), latest, factor)`. Pairing is by
/// index, not identity — distinct objects can be mispaired across ticks;
/// that is an accepted approximation, not tracking.
fn interpolate(latest: &[Detection], previous: &[Detection], factor: f32) -> Vec<Detection> {
    latest
        .iter()
        .enumerate()
        .map(|(i, det)| {
            let Some(prev) = previous.get(i) else {
                return det.clone();
            };
            let blend = 1.0 - MOTION_DAMPING * (1.0 - factor);
            let mut smoothed = det.clone();
            smoothed.bbox.x = prev.bbox.x + (det.bbox.x - prev.bbox.x) * blend;
            smoothed.bbox.y = prev.bbox.y + (det.bbox.y - prev.bbox.y) * blend;
            smoothed
        })
        .collect()
}
