mod config;
mod sink;

use anyhow::Context;
use client::{Detect, DetectorClient, DetectorConfig, probe_health};
use common::wait_for_resource;
use config::{SourceKind, ViewerConfig};
use overlay::{NullSink, OverlayRenderer, PresentSink, RendererConfig, Viewport, viewport_channel};
use sampler::{ClipSource, FrameSource, SamplerConfig, SyntheticSource, run_session, session_channels};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    flag,
};
use sink::JpegDirSink;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;

fn main() -> anyhow::Result<()> {
    let config = ViewerConfig::from_env()?;

    // With an OTLP endpoint configured, traces and metrics are exported;
    // otherwise plain local logging.
    let _telemetry = match std::env::var("VIEWER_OTLP_ENDPOINT") {
        Ok(endpoint) => Some(
            common::TelemetryGuard::init("fish-viewer", &endpoint, config.environment)
                .context("failed to initialize telemetry")?,
        ),
        Err(_) => {
            common::setup_logging(config.environment);
            None
        }
    };

    let interrupted = Arc::new(AtomicBool::new(false));
    flag::register(SIGTERM, Arc::clone(&interrupted))?;
    flag::register(SIGINT, Arc::clone(&interrupted))?;

    let detector_config = DetectorConfig::from_env();

    // Sampling is gated on the backend liveness probe; keep polling until it
    // answers (or the user interrupts).
    let agent = ureq::AgentBuilder::new()
        .timeout(Duration::from_secs(5))
        .build();
    wait_for_resource(
        || {
            if interrupted.load(Ordering::Relaxed) {
                return Ok(());
            }
            if probe_health(&agent, &detector_config.base_url) {
                Ok(())
            } else {
                Err("health probe not answering")
            }
        },
        config.health_poll_ms,
        "Detection backend",
    );

    if interrupted.load(Ordering::Relaxed) {
        return Ok(());
    }

    // Single-threaded cooperative scheduling: the sampler timer and the
    // renderer loop share one event loop and communicate through watch
    // channels only.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    runtime.block_on(run(config, detector_config, interrupted))
}

async fn run(
    config: ViewerConfig,
    detector_config: DetectorConfig,
    interrupted: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let (source, sampler_config): (Box<dyn FrameSource>, SamplerConfig) = match &config.source {
        SourceKind::Synthetic { width, height } => (
            Box::new(SyntheticSource::new(*width, *height)),
            SamplerConfig::for_camera(),
        ),
        SourceKind::Clip { dir, fps } => (
            Box::new(ClipSource::from_dir(dir, *fps).context("failed to load clip")?),
            SamplerConfig::for_clip(),
        ),
        SourceKind::Camera { device } => (open_camera(*device)?, SamplerConfig::for_camera()),
    };

    let sampler_config = match config.interval_ms {
        Some(ms) => sampler_config.with_interval_ms(ms),
        None => sampler_config,
    };

    let (width, height) = source.dimensions().unwrap_or((640, 480));
    tracing::info!(width, height, interval = ?sampler_config.interval, "starting detection session");

    let detector: Arc<dyn Detect> = Arc::new(DetectorClient::new(detector_config));
    let clock = source.clock();

    let (channels, snapshot_rx, mut status_rx) = session_channels();
    let mut snapshot_log_rx = snapshot_rx.clone();
    let (_viewport_tx, viewport_rx) = viewport_channel(Viewport::windowed(width, height));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sink: Box<dyn PresentSink> = match &config.output_dir {
        Some(dir) => Box::new(JpegDirSink::new(dir.clone())?),
        None => Box::new(NullSink),
    };
    let renderer = OverlayRenderer::new(
        RendererConfig::default(),
        viewport_rx,
        snapshot_rx,
        clock,
        sink,
    );
    let renderer_task = tokio::spawn(renderer.run(shutdown_rx.clone()));

    // Surface session state transitions (Idle/Active/Error) in the log; the
    // sampler publishes them, this is the display side.
    let status_task = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            tracing::info!(state = ?*status_rx.borrow(), "session state");
        }
    });
    let snapshot_task = tokio::spawn(async move {
        while snapshot_log_rx.changed().await.is_ok() {
            let Some(snapshot) = snapshot_log_rx.borrow().clone() else {
                continue;
            };
            tracing::debug!(
                fish = snapshot.latest.detections.len(),
                reported = snapshot.latest.count,
                avg_confidence = snapshot.latest.average_confidence(),
                "detections updated"
            );
        }
    });

    // Bridge POSIX signals into the cooperative world: once the interrupt
    // flag flips (or the session ends below), flip the shutdown watch.
    let signal_task = {
        let interrupted = Arc::clone(&interrupted);
        tokio::spawn(async move {
            while !interrupted.load(Ordering::Relaxed) {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            let _ = shutdown_tx.send(true);
        })
    };

    let result = run_session(source, detector, sampler_config, channels, shutdown_rx).await;

    // Whatever ended the session (signal or connectivity loss), the
    // renderer must not keep a dangling scheduled tick.
    interrupted.store(true, Ordering::Relaxed);
    signal_task.await.ok();
    renderer_task.await.context("renderer task failed")?;
    status_task.await.ok();
    snapshot_task.await.ok();

    result
}

#[cfg(feature = "v4l2-camera")]
fn open_camera(device: u32) -> anyhow::Result<Box<dyn FrameSource>> {
    let camera = sampler::CameraSource::open(device).context("failed to open camera")?;
    Ok(Box::new(camera))
}

#[cfg(not(feature = "v4l2-camera"))]
fn open_camera(_device: u32) -> anyhow::Result<Box<dyn FrameSource>> {
    anyhow::bail!("camera support requires the v4l2-camera feature")
}
