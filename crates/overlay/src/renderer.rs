//! The continuously scheduled draw loop. Runs at display rate, independent
//! of the sampling cadence, and keeps the overlay glued to the media
//! element's on-screen rectangle.

use crate::palette::class_color;
use crate::surface::Surface;
use crate::sync::{ActiveSet, SyncOptions, active_set};
use crate::viewport::{Viewport, ViewportMode};
use image::RgbaImage;
use protocol::{MediaClock, SessionSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// ~60 ticks per second.
const TICK_MS: u64 = 16;

#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub tick: Duration,
    pub sync: SyncOptions,
    pub line_width: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(TICK_MS),
            sync: SyncOptions::default(),
            line_width: 2,
        }
    }
}

/// Where finished overlay frames go (a window compositor, an encoder, a
/// test recorder).
pub trait PresentSink: Send {
    fn present(&mut self, frame: &RgbaImage, viewport: &Viewport);
}

pub struct NullSink;

impl PresentSink for NullSink {
    fn present(&mut self, _frame: &RgbaImage, _viewport: &Viewport) {}
}

pub struct OverlayRenderer {
    config: RendererConfig,
    surface: Surface,
    viewport_rx: watch::Receiver<Viewport>,
    snapshot_rx: watch::Receiver<Option<SessionSnapshot>>,
    clock: Arc<dyn MediaClock>,
    sink: Box<dyn PresentSink>,
    mode: ViewportMode,
}

impl OverlayRenderer {
    pub fn new(
        config: RendererConfig,
        viewport_rx: watch::Receiver<Viewport>,
        snapshot_rx: watch::Receiver<Option<SessionSnapshot>>,
        clock: Arc<dyn MediaClock>,
        sink: Box<dyn PresentSink>,
    ) -> Self {
        let viewport = *viewport_rx.borrow();
        Self {
            config,
            surface: Surface::new(viewport.rect),
            viewport_rx,
            snapshot_rx,
            clock,
            sink,
            mode: viewport.mode,
        }
    }

    /// One draw tick: resolve the viewport, resize if needed, clear, draw
    /// the active set, present.
    pub fn render_tick(&mut self) {
        let viewport = *self.viewport_rx.borrow();

        if viewport.mode != self.mode {
            // Fullscreen media is reparented out of normal flow; positioning
            // switches between container-relative and viewport-absolute.
            tracing::debug!(?viewport.mode, "viewport mode changed");
            self.mode = viewport.mode;
        }
        self.surface.resize_if_changed(viewport.rect);
        self.surface.clear();

        let snapshot = self.snapshot_rx.borrow().clone();
        let set = active_set(
            snapshot.as_ref(),
            self.clock.media_time(),
            self.clock.playback(),
            &self.config.sync,
        );

        match set {
            ActiveSet::Empty => {}
            ActiveSet::Annotated(frame) => self.surface.draw_annotated(&frame),
            ActiveSet::Boxes(detections) => {
                let rect = self.surface.rect();
                for det in &detections {
                    if !det.bbox.is_drawable() {
                        continue;
                    }
                    let (x, y, w, h) = det.bbox.to_pixels(rect.width, rect.height);
                    let color = class_color(&det.class_label);
                    self.surface.stroke_rect(
                        x.round() as i64,
                        y.round() as i64,
                        w.round().max(1.0) as u32,
                        h.round().max(1.0) as u32,
                        color,
                        self.config.line_width,
                    );
                    let label = format!("{} ({:.2})", det.class_label, det.confidence);
                    self.surface.draw_label(&label, x, y, h, color);
                }
            }
        }

        self.sink.present(self.surface.image(), &viewport);
    }

    /// Drive the loop until the shutdown signal flips. The loop owns its
    /// schedule; a tick after shutdown would be a defect, so the signal is
    /// checked in the same select as the timer.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.tick);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.render_tick();
                }
            }
        }
        tracing::debug!("overlay loop cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::viewport_channel;
    use protocol::{BatchOrigin, Detection, DetectionBatch, PlaybackState, UnitBox};
    use std::sync::Mutex;

    struct FixedClock;

    impl MediaClock for FixedClock {
        fn media_time(&self) -> f64 {
            0.0
        }

        fn playback(&self) -> PlaybackState {
            PlaybackState::Playing
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        presented: Arc<Mutex<Vec<(u32, u32, ViewportMode)>>>,
    }

    impl PresentSink for RecordingSink {
        fn present(&mut self, frame: &RgbaImage, viewport: &Viewport) {
            self.presented
                .lock()
                .unwrap()
                .push((frame.width(), frame.height(), viewport.mode));
        }
    }

    fn det(x: f32, y: f32, w: f32, h: f32, class_label: &str) -> Detection {
        Detection {
            id: format!("det-0-{x}"),
            class_label: class_label.to_string(),
            confidence: 0.9,
            bbox: UnitBox::new(x, y, w, h),
        }
    }

    fn snapshot_with(detections: Vec<Detection>, count: u32) -> SessionSnapshot {
        SessionSnapshot {
            latest: Arc::new(DetectionBatch {
                detections,
                count,
                annotated: None,
                processing_seconds: None,
                origin: BatchOrigin::Backend,
            }),
            previous: None,
            media_time: 0.0,
            interval: Duration::from_secs(1),
        }
    }

    fn renderer(
        viewport: Viewport,
        snapshot: Option<SessionSnapshot>,
    ) -> (OverlayRenderer, RecordingSink, watch::Sender<Viewport>) {
        let (viewport_tx, viewport_rx) = viewport_channel(viewport);
        let (_snapshot_tx, snapshot_rx) = watch::channel(snapshot);
        let sink = RecordingSink::default();
        let renderer = OverlayRenderer::new(
            RendererConfig::default(),
            viewport_rx,
            snapshot_rx,
            Arc::new(FixedClock),
            Box::new(sink.clone()),
        );
        (renderer, sink, viewport_tx)
    }

    #[test]
    fn draws_only_the_detections_that_exist() {
        // count says 3 but only 2 detections: exactly 2 boxes, no panic.
        let detections = vec![
            det(0.1, 0.3, 0.2, 0.2, "fish"),
            det(0.6, 0.3, 0.2, 0.2, "salmon"),
        ];
        let (mut renderer, _sink, _vp) = renderer(
            Viewport::windowed(200, 100),
            Some(snapshot_with(detections, 3)),
        );
        renderer.render_tick();

        let fish = class_color("fish");
        let salmon = class_color("salmon");
        // Top-left corners of both boxes are stroked in their class color.
        assert_eq!(*renderer.surface.image().get_pixel(20, 30), fish);
        assert_eq!(*renderer.surface.image().get_pixel(120, 30), salmon);
    }

    #[test]
    fn degenerate_boxes_are_skipped() {
        let detections = vec![det(0.1, 0.3, 0.0, 0.2, "fish")];
        let (mut renderer, _sink, _vp) = renderer(
            Viewport::windowed(200, 100),
            Some(snapshot_with(detections, 1)),
        );
        renderer.render_tick();
        assert!(
            renderer.surface.image().pixels().all(|p| p.0[3] == 0),
            "zero-width box must not be drawn"
        );
    }

    #[test]
    fn empty_snapshot_renders_a_clear_surface() {
        let (mut renderer, sink, _vp) = renderer(Viewport::windowed(64, 64), None);
        renderer.render_tick();
        assert!(renderer.surface.image().pixels().all(|p| p.0[3] == 0));
        assert_eq!(sink.presented.lock().unwrap().len(), 1);
    }

    #[test]
    fn viewport_changes_resize_the_presented_frame() {
        let (mut renderer, sink, viewport_tx) = renderer(Viewport::windowed(100, 50), None);
        renderer.render_tick();
        viewport_tx.send(Viewport::fullscreen(0, 0, 400, 300)).unwrap();
        renderer.render_tick();

        let presented = sink.presented.lock().unwrap();
        assert_eq!(presented[0], (100, 50, ViewportMode::Windowed));
        assert_eq!(presented[1], (400, 300, ViewportMode::Fullscreen));
    }

    #[tokio::test]
    async fn loop_stops_when_shutdown_flips() {
        let (mut renderer_inner, sink, _vp) = renderer(Viewport::windowed(32, 32), None);
        renderer_inner.config.tick = Duration::from_millis(5);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(renderer_inner.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("renderer must cancel promptly")
            .unwrap();

        let presented = sink.presented.lock().unwrap().len();
        assert!(presented >= 2, "loop should have ticked while running");
    }
}
