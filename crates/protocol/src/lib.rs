pub mod clock;
pub mod detection;
pub mod geometry;
pub mod wire;

pub use clock::{MediaClock, PlaybackState};
pub use detection::{BatchOrigin, Detection, DetectionBatch, FALLBACK_ID_PREFIX, SessionSnapshot};
pub use geometry::{DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH, UnitBox, normalize};
