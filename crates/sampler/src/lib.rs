pub mod clip;
pub mod config;
pub mod driver;
pub mod pacing;
pub mod session;
pub mod source;

#[cfg(feature = "v4l2-camera")]
pub mod camera;

pub use clip::ClipSource;
pub use config::{INTERVAL_PRESETS_MS, SamplerConfig, snap_to_preset};
pub use driver::{SessionChannels, run_session, session_channels};
pub use session::{RequestToken, SamplingSession, SessionState};
pub use source::{FrameSource, SourceError, SyntheticSource};

#[cfg(feature = "v4l2-camera")]
pub use camera::CameraSource;
