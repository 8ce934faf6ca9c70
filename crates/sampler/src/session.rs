use protocol::{DetectionBatch, SessionSnapshot};
use std::sync::Arc;
use std::time::Duration;

use crate::config::snap_to_preset;

/// Explicit session lifecycle. `Error` is reserved for connectivity loss;
/// per-frame processing failures never leave `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
    Error,
}

/// Identifies one outstanding detection request. The epoch changes on every
/// `stop()`, so a completion from a stopped (or stopped-and-restarted)
/// session can be told apart from a current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    epoch: u64,
    seq: u64,
}

/// Per-source sampling state. Owned by exactly one driver; never shared
/// across media sources.
pub struct SamplingSession {
    state: SessionState,
    interval: Duration,
    epoch: u64,
    next_seq: u64,
    in_flight: Option<u64>,
    latest: Option<Arc<DetectionBatch>>,
    previous: Option<Arc<DetectionBatch>>,
    media_time: f64,
}

impl SamplingSession {
    pub fn new(interval: Duration) -> Self {
        Self {
            state: SessionState::Idle,
            interval,
            epoch: 0,
            next_seq: 0,
            in_flight: None,
            latest: None,
            previous: None,
            media_time: 0.0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the cadence, snapping to the preset menu.
    pub fn set_interval_ms(&mut self, interval_ms: u64) {
        self.interval = Duration::from_millis(snap_to_preset(interval_ms));
    }

    pub fn is_request_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Begin sampling. Idempotent: a second call while Active is a no-op
    /// and returns false. A session in `Error` must be stopped first.
    pub fn start(&mut self) -> bool {
        if self.state != SessionState::Idle {
            return false;
        }
        self.state = SessionState::Active;
        true
    }

    /// Stop sampling and reset detection state so a later `start` begins
    /// clean. Bumps the epoch: any still-running request's completion will
    /// be discarded. Stopping while Idle is a no-op.
    pub fn stop(&mut self) {
        self.state = SessionState::Idle;
        self.epoch += 1;
        self.in_flight = None;
        self.latest = None;
        self.previous = None;
        self.media_time = 0.0;
    }

    /// Claim the in-flight slot for a new request. Returns None while a
    /// request is already outstanding or the session is not Active — the
    /// caller skips the tick entirely, it does not queue.
    pub fn begin_request(&mut self) -> Option<RequestToken> {
        if self.state != SessionState::Active || self.in_flight.is_some() {
            return None;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight = Some(seq);
        Some(RequestToken {
            epoch: self.epoch,
            seq,
        })
    }

    /// Commit a completed batch. Results are applied in completion order
    /// within the current epoch; completions from a previous epoch (the
    /// session was stopped since) are rejected. Returns whether the batch
    /// was committed.
    pub fn commit(
        &mut self,
        token: RequestToken,
        batch: DetectionBatch,
        media_time: f64,
    ) -> bool {
        if token.epoch != self.epoch || self.state != SessionState::Active {
            return false;
        }
        if self.in_flight == Some(token.seq) {
            self.in_flight = None;
        }
        self.previous = self.latest.take();
        self.latest = Some(Arc::new(batch));
        self.media_time = media_time;
        true
    }

    /// Record a failed request. Connectivity loss moves the session to
    /// `Error`; anything else only releases the in-flight slot so sampling
    /// continues on the next tick.
    pub fn fail(&mut self, token: RequestToken, connectivity: bool) {
        if token.epoch != self.epoch {
            return;
        }
        if self.in_flight == Some(token.seq) {
            self.in_flight = None;
        }
        if connectivity && self.state == SessionState::Active {
            self.state = SessionState::Error;
        }
    }

    /// Immutable view of the two most recent batches for the renderer.
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.latest.as_ref().map(|latest| SessionSnapshot {
            latest: Arc::clone(latest),
            previous: self.previous.clone(),
            media_time: self.media_time,
            interval: self.interval,
        })
    }
}
