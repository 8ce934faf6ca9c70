use anyhow::Context;
use image::RgbaImage;
use overlay::{PresentSink, Viewport};
use std::path::PathBuf;

/// Writes roughly one rendered overlay frame per second to disk, for
/// eyeballing the pipeline without a compositor.
const SAVE_EVERY_TICKS: u64 = 60;

pub struct JpegDirSink {
    dir: PathBuf,
    tick: u64,
    saved: u64,
}

impl JpegDirSink {
    pub fn new(dir: PathBuf) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create output dir {}", dir.display()))?;
        Ok(Self {
            dir,
            tick: 0,
            saved: 0,
        })
    }
}

impl PresentSink for JpegDirSink {
    fn present(&mut self, frame: &RgbaImage, _viewport: &Viewport) {
        self.tick += 1;
        if self.tick % SAVE_EVERY_TICKS != 1 {
            return;
        }

        let path = self.dir.join(format!("overlay_{:05}.jpg", self.saved));
        // JPEG has no alpha channel; flatten before writing.
        let rgb = image::DynamicImage::ImageRgba8(frame.clone()).to_rgb8();
        match rgb.save(&path) {
            Ok(()) => self.saved += 1,
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to save overlay frame"),
        }
    }
}
