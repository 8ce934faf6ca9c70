pub mod detector;
pub mod error;
pub mod frame;
pub mod health;

pub use detector::{AnnotationOptions, Detect, DetectorClient, DetectorConfig};
pub use error::DetectError;
pub use frame::{EncodedFrame, decode_data_url_rgba};
pub use health::probe_health;
