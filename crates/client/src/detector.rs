use crate::error::DetectError;
use crate::frame::{EncodedFrame, decode_data_url_rgba};
use common::config::env_or;
use protocol::wire::{DetectRequest, DetectResponse, ErrorBody};
use protocol::{BatchOrigin, Detection, DetectionBatch, FALLBACK_ID_PREFIX, UnitBox, normalize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Overlay options forwarded to the backend when requesting a pre-annotated
/// frame.
#[derive(Debug, Clone)]
pub struct AnnotationOptions {
    pub return_annotated: bool,
    pub draw_confidence: bool,
    pub draw_labels: bool,
    pub line_width: u32,
}

impl Default for AnnotationOptions {
    fn default() -> Self {
        Self {
            return_annotated: true,
            draw_confidence: true,
            draw_labels: true,
            line_width: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub annotation: AnnotationOptions,
    /// Replace per-frame processing failures with a synthetic batch so the
    /// overlay loop stays exercised without a healthy backend.
    pub synthetic_fallback: bool,
}

impl DetectorConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("DETECTOR_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        let timeout_secs: u64 = env_or("DETECTOR_TIMEOUT_SECS", 60);
        let synthetic_fallback: bool = env_or("DETECTOR_SYNTHETIC_FALLBACK", true);

        Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            annotation: AnnotationOptions::default(),
            synthetic_fallback,
        }
    }
}

/// The seam the sampler drives. One call per frame, no retries.
pub trait Detect: Send + Sync {
    fn detect(&self, frame: &EncodedFrame) -> Result<DetectionBatch, DetectError>;
}

/// HTTP client for the external detection backend.
pub struct DetectorClient {
    config: DetectorConfig,
    agent: ureq::Agent,
    batch_seq: AtomicU64,
}

impl DetectorClient {
    pub fn new(config: DetectorConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .build();
        Self {
            config,
            agent,
            batch_seq: AtomicU64::new(0),
        }
    }

    /// Validate and send an externally supplied data URL.
    pub fn detect_data_url(&self, raw: &str) -> Result<DetectionBatch, DetectError> {
        let frame = EncodedFrame::from_data_url(raw)?;
        Detect::detect(self, &frame)
    }

    fn call_backend(&self, frame: &EncodedFrame) -> Result<DetectionBatch, DetectError> {
        let url = format!(
            "{}/detect_frame",
            self.config.base_url.trim_end_matches('/')
        );
        let request = DetectRequest {
            image: frame.as_str(),
            return_annotated: self.config.annotation.return_annotated,
            draw_confidence: self.config.annotation.draw_confidence,
            draw_labels: self.config.annotation.draw_labels,
            line_width: self.config.annotation.line_width,
        };

        let response = match self.agent.post(&url).send_json(&request) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let body: ErrorBody = response.into_json().unwrap_or_default();
                let detail = body.error.unwrap_or_else(|| "no error body".to_string());
                return Err(DetectError::Processing(format!("status {code}: {detail}")));
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(DetectError::Connectivity(transport.to_string()));
            }
        };

        let parsed: DetectResponse = response
            .into_json()
            .map_err(|e| DetectError::Processing(format!("malformed response body: {e}")))?;

        Ok(self.into_batch(parsed, frame.dims()))
    }

    fn into_batch(&self, response: DetectResponse, frame_dims: Option<(u32, u32)>) -> DetectionBatch {
        let seq = self.batch_seq.fetch_add(1, Ordering::Relaxed);
        let dims = response.frame_dims().or(frame_dims);

        let detections = response
            .detections
            .iter()
            .enumerate()
            .map(|(index, raw)| Detection {
                id: format!("det-{seq}-{index}"),
                class_label: raw.label_or_default().to_string(),
                confidence: raw.confidence.clamp(0.0, 1.0),
                bbox: normalize(raw.x, raw.y, raw.width, raw.height, dims),
            })
            .collect::<Vec<_>>();

        if response.count as usize != detections.len() {
            tracing::debug!(
                reported = response.count,
                actual = detections.len(),
                "backend count disagrees with detection list"
            );
        }

        let annotated = response.annotated_frame.as_deref().and_then(|raw| {
            match decode_data_url_rgba(raw) {
                Ok(image) => Some(Arc::new(image)),
                Err(e) => {
                    tracing::warn!(error = %e, "discarding undecodable annotated frame");
                    None
                }
            }
        });

        DetectionBatch {
            detections,
            count: response.count,
            annotated,
            processing_seconds: response
                .processing_time
                .as_ref()
                .and_then(|t| t.as_seconds()),
            origin: BatchOrigin::Backend,
        }
    }

    /// Single synthetic detection standing in for a failed frame. The
    /// reserved id prefix keeps it distinguishable from real output.
    fn fallback_batch(&self) -> DetectionBatch {
        let seq = self.batch_seq.fetch_add(1, Ordering::Relaxed);
        DetectionBatch {
            detections: vec![Detection {
                id: format!("{FALLBACK_ID_PREFIX}{seq}"),
                class_label: "fish".to_string(),
                confidence: 0.85,
                bbox: UnitBox::new(0.1, 0.1, 0.2, 0.15),
            }],
            count: 1,
            annotated: None,
            processing_seconds: None,
            origin: BatchOrigin::Synthetic,
        }
    }
}

impl Detect for DetectorClient {
    fn detect(&self, frame: &EncodedFrame) -> Result<DetectionBatch, DetectError> {
        match self.call_backend(frame) {
            Ok(batch) => {
                tracing::debug!(
                    count = batch.detections.len(),
                    processing_seconds = batch.processing_seconds,
                    "detection response"
                );
                Ok(batch)
            }
            Err(DetectError::Processing(detail)) if self.config.synthetic_fallback => {
                tracing::warn!(%detail, "processing failure, substituting synthetic batch");
                Ok(self.fallback_batch())
            }
            Err(e) => Err(e),
        }
    }
}
