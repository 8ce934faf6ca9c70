use crate::geometry::UnitBox;
use image::RgbaImage;
use std::sync::Arc;
use std::time::Duration;

/// Reserved id prefix for locally synthesized fallback detections, so they
/// can never be mistaken for real backend output.
pub const FALLBACK_ID_PREFIX: &str = "fallback-";

/// Where a batch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOrigin {
    /// Parsed from a real backend response.
    Backend,
    /// Synthesized locally after a per-frame processing failure.
    Synthetic,
}

/// One detected object instance. Created fresh on every response; there is
/// no identity across frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub id: String,
    pub class_label: String,
    pub confidence: f32,
    pub bbox: UnitBox,
}

impl Detection {
    pub fn is_fallback(&self) -> bool {
        self.id.starts_with(FALLBACK_ID_PREFIX)
    }
}

/// The result of one detection request.
#[derive(Debug, Clone)]
pub struct DetectionBatch {
    /// Backend response order; not significant.
    pub detections: Vec<Detection>,
    /// Reported independently by the backend for display. Should equal
    /// `detections.len()` but must never be used for indexing.
    pub count: u32,
    /// Backend-rendered frame with boxes already drawn, decoded once at
    /// receipt. May be displayed instead of client-drawn boxes.
    pub annotated: Option<Arc<RgbaImage>>,
    /// Informational; not used for control flow.
    pub processing_seconds: Option<f64>,
    pub origin: BatchOrigin,
}

impl DetectionBatch {
    pub fn empty() -> Self {
        Self {
            detections: Vec::new(),
            count: 0,
            annotated: None,
            processing_seconds: None,
            origin: BatchOrigin::Backend,
        }
    }

    /// Mean confidence across the batch, for display.
    pub fn average_confidence(&self) -> f32 {
        if self.detections.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.detections.iter().map(|d| d.confidence).sum();
        sum / self.detections.len() as f32
    }
}

/// Immutable view of a session's two most recent batches, published by the
/// sampler over a watch channel and read by the renderer each tick. The
/// whole value is replaced on every commit; nothing is mutated in place, so
/// the renderer can never observe a half-updated batch.
#[derive(Clone)]
pub struct SessionSnapshot {
    pub latest: Arc<DetectionBatch>,
    pub previous: Option<Arc<DetectionBatch>>,
    /// Media time at which the frame behind `latest` was captured.
    pub media_time: f64,
    /// Sampling cadence at capture time; bounds interpolation staleness.
    pub interval: Duration,
}
