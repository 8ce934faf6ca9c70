/// Playback status of a media source as seen by the sampler and renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Seeking,
    Ended,
}

impl PlaybackState {
    /// Smoothing between detection batches only makes sense while the media
    /// is actually advancing.
    pub fn is_advancing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }
}

/// Read-only view of a media source's clock, shared with the overlay
/// renderer so interpolation can be evaluated at render time without
/// touching the source itself.
pub trait MediaClock: Send + Sync {
    /// Current media time in seconds (for a camera: wall time since the
    /// stream opened).
    fn media_time(&self) -> f64;

    fn playback(&self) -> PlaybackState;
}
