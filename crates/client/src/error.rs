use thiserror::Error;

/// Failure taxonomy for the detection path.
///
/// Only `Connectivity` stops a sampling session; `Processing` is scoped to a
/// single frame, and `Validation` is rejected before any network traffic.
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("invalid frame: {0}")]
    Validation(String),

    #[error("detector unreachable: {0}")]
    Connectivity(String),

    #[error("detector failed to process frame: {0}")]
    Processing(String),

    #[error("media resource error: {0}")]
    Resource(String),
}

impl DetectError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, DetectError::Connectivity(_))
    }
}
