//! Async driver tying a frame source, a sampling session, and the detection
//! client together on the cooperative scheduler.

use crate::config::SamplerConfig;
use crate::pacing::PlaybackPacing;
use crate::session::{RequestToken, SamplingSession, SessionState};
use crate::source::FrameSource;
use client::{Detect, DetectError, EncodedFrame};
use protocol::{DetectionBatch, PlaybackState, SessionSnapshot};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Sender halves of the channels a session publishes through. The receiver
/// halves go to the renderer (snapshots) and the status display.
pub struct SessionChannels {
    pub snapshots: watch::Sender<Option<SessionSnapshot>>,
    pub status: watch::Sender<SessionState>,
}

pub fn session_channels() -> (
    SessionChannels,
    watch::Receiver<Option<SessionSnapshot>>,
    watch::Receiver<SessionState>,
) {
    let (snapshot_tx, snapshot_rx) = watch::channel(None);
    let (status_tx, status_rx) = watch::channel(SessionState::Idle);
    (
        SessionChannels {
            snapshots: snapshot_tx,
            status: status_tx,
        },
        snapshot_rx,
        status_rx,
    )
}

struct InFlight {
    token: RequestToken,
    media_time: f64,
    handle: JoinHandle<Result<DetectionBatch, DetectError>>,
}

/// Run one sampling session to completion.
///
/// Ends when the shutdown signal flips, or when the detector becomes
/// unreachable (the session is left in `Error` so the status display keeps
/// showing the offline state; resuming is the caller's policy, typically
/// gated on the backend health probe). On every exit path the playback rate
/// is restored and the source is released.
pub async fn run_session(
    mut source: Box<dyn FrameSource>,
    detector: Arc<dyn Detect>,
    config: SamplerConfig,
    channels: SessionChannels,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let mut session = SamplingSession::new(config.interval);
    session.start();
    let _ = channels.status.send(session.state());

    let clock = source.clock();

    let mut pacing = PlaybackPacing::new(config.target_frames_per_tick);
    if config.pace_playback
        && let Some(fps) = source.native_fps()
    {
        let rate = pacing.rate_for(fps, config.interval);
        if pacing.update(rate) {
            source.set_playback_rate(rate);
            tracing::info!(rate, "reduced playback rate to match sampling cadence");
        }
    }

    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut in_flight: Option<InFlight> = None;

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }

            result = async { (&mut in_flight.as_mut().unwrap().handle).await }, if in_flight.is_some() => {
                let InFlight { token, media_time, .. } = in_flight.take().unwrap();
                match result {
                    Ok(Ok(batch)) => {
                        if session.commit(token, batch, media_time) {
                            let _ = channels.snapshots.send(session.snapshot());
                        } else {
                            tracing::debug!("discarding detection result for a stopped session");
                        }
                    }
                    Ok(Err(e)) if e.is_connectivity() => {
                        tracing::error!(error = %e, "detector offline, stopping sampling");
                        session.fail(token, true);
                        let _ = channels.status.send(session.state());
                        break;
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "detection failed for this frame");
                        session.fail(token, false);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "detection task aborted");
                        session.fail(token, false);
                    }
                }
            }

            _ = ticker.tick() => {
                if session.is_request_in_flight() {
                    tracing::trace!("tick skipped: request in flight");
                    continue;
                }
                if source.dimensions().is_none() {
                    tracing::trace!("tick skipped: no decoded dimensions yet");
                    continue;
                }
                if clock.playback() == PlaybackState::Seeking {
                    tracing::trace!("tick skipped: source is seeking");
                    continue;
                }
                let Some(token) = session.begin_request() else {
                    continue;
                };

                let mut frame = match source.grab() {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!(error = %e, "frame capture failed");
                        session.fail(token, false);
                        continue;
                    }
                };

                if let Some(target) = config.downscale_width
                    && frame.width() > target
                {
                    let height = ((frame.height() as u64 * target as u64)
                        / frame.width() as u64)
                        .max(1) as u32;
                    frame = image::imageops::resize(
                        &frame,
                        target,
                        height,
                        image::imageops::FilterType::Triangle,
                    );
                }

                let media_time = clock.media_time();
                let detector = Arc::clone(&detector);
                // The only suspension point: encode + network call off the
                // cooperative loop.
                let handle = tokio::task::spawn_blocking(move || {
                    let _s = common::span!("sample_frame");
                    let encoded = EncodedFrame::from_rgb(&frame)?;
                    detector.detect(&encoded)
                });
                in_flight = Some(InFlight {
                    token,
                    media_time,
                    handle,
                });
            }
        }
    }

    if config.pace_playback && pacing.reset() {
        source.set_playback_rate(1.0);
        tracing::debug!("restored normal playback rate");
    }

    // A connectivity failure leaves the session visibly in Error; every
    // other exit resets it to Idle. An in-flight request keeps running on
    // the blocking pool, but the epoch bump below (or the break above)
    // guarantees its result is never committed.
    if session.state() != SessionState::Error {
        session.stop();
        let _ = channels.status.send(session.state());
    }

    Ok(())
}
