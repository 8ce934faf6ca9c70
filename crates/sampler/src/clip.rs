//! The "uploaded video" analog: a decoded frame sequence played back by a
//! rate-scalable media clock.

use crate::source::{FrameSource, SourceError};
use image::RgbImage;
use protocol::{MediaClock, PlaybackState};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

struct ClockState {
    /// Media time at the last anchor point.
    base: f64,
    anchor: Instant,
    rate: f64,
    playing: bool,
    seeking: bool,
}

/// Media clock for a clip. Play/pause/seek mutate the anchor; readers only
/// ever see a consistent (base, anchor, rate) triple.
pub struct ClipClock {
    state: Mutex<ClockState>,
    duration: f64,
}

impl ClipClock {
    fn new(duration: f64) -> Self {
        Self {
            state: Mutex::new(ClockState {
                base: 0.0,
                anchor: Instant::now(),
                rate: 1.0,
                playing: true,
                seeking: false,
            }),
            duration,
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn play(&self) {
        let mut s = self.state.lock().unwrap();
        if !s.playing {
            s.anchor = Instant::now();
            s.playing = true;
        }
    }

    pub fn pause(&self) {
        let mut s = self.state.lock().unwrap();
        if s.playing {
            s.base = Self::current(&s, self.duration);
            s.playing = false;
        }
    }

    /// Jump to a media time. `finish_seek` clears the transient seeking
    /// state once the embedding has a decoded frame again.
    pub fn begin_seek(&self, to: f64) {
        let mut s = self.state.lock().unwrap();
        s.base = to.clamp(0.0, self.duration);
        s.anchor = Instant::now();
        s.seeking = true;
    }

    pub fn finish_seek(&self) {
        self.state.lock().unwrap().seeking = false;
    }

    pub fn set_rate(&self, rate: f64) {
        let mut s = self.state.lock().unwrap();
        // Re-anchor so already-elapsed time keeps its old rate.
        s.base = Self::current(&s, self.duration);
        s.anchor = Instant::now();
        s.rate = rate;
    }

    pub fn rate(&self) -> f64 {
        self.state.lock().unwrap().rate
    }

    fn current(s: &ClockState, duration: f64) -> f64 {
        let t = if s.playing {
            s.base + s.anchor.elapsed().as_secs_f64() * s.rate
        } else {
            s.base
        };
        t.clamp(0.0, duration)
    }
}

impl MediaClock for ClipClock {
    fn media_time(&self) -> f64 {
        let s = self.state.lock().unwrap();
        Self::current(&s, self.duration)
    }

    fn playback(&self) -> PlaybackState {
        let s = self.state.lock().unwrap();
        if s.seeking {
            return PlaybackState::Seeking;
        }
        if Self::current(&s, self.duration) >= self.duration {
            return PlaybackState::Ended;
        }
        if s.playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }
}

pub struct ClipSource {
    frames: Vec<RgbImage>,
    fps: f64,
    clock: Arc<ClipClock>,
}

impl ClipSource {
    pub fn from_frames(frames: Vec<RgbImage>, fps: f64) -> Result<Self, SourceError> {
        if frames.is_empty() {
            return Err(SourceError::Device("clip has no frames".into()));
        }
        if fps <= 0.0 {
            return Err(SourceError::Device(format!("invalid clip fps: {fps}")));
        }
        let duration = frames.len() as f64 / fps;
        Ok(Self {
            frames,
            fps,
            clock: Arc::new(ClipClock::new(duration)),
        })
    }

    /// Load every decodable image in a directory, in name order, as the
    /// clip's frames.
    pub fn from_dir(dir: &Path, fps: f64) -> Result<Self, SourceError> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| SourceError::Device(format!("clip directory unreadable: {e}")))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect();
        paths.sort();

        let mut frames = Vec::new();
        for path in paths {
            match image::open(&path) {
                Ok(img) => frames.push(img.to_rgb8()),
                Err(e) => tracing::debug!(path = %path.display(), error = %e, "skipping non-image file"),
            }
        }
        Self::from_frames(frames, fps)
    }

    /// Shared handle for playback control (play/pause/seek).
    pub fn controls(&self) -> Arc<ClipClock> {
        self.clock.clone()
    }

    fn frame_index_at(&self, media_time: f64) -> usize {
        ((media_time * self.fps) as usize).min(self.frames.len() - 1)
    }
}

impl FrameSource for ClipSource {
    fn dimensions(&self) -> Option<(u32, u32)> {
        self.frames.first().map(|f| (f.width(), f.height()))
    }

    fn grab(&mut self) -> Result<RgbImage, SourceError> {
        let index = self.frame_index_at(self.clock.media_time());
        Ok(self.frames[index].clone())
    }

    fn clock(&self) -> Arc<dyn MediaClock> {
        self.clock.clone() as Arc<dyn MediaClock>
    }

    fn native_fps(&self) -> Option<f64> {
        Some(self.fps)
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.clock.set_rate(rate);
    }
}
