use anyhow::{Context, bail};
use common::config::env_or;
use std::env;
use std::path::PathBuf;

pub use common::Environment;

#[derive(Debug, Clone)]
pub enum SourceKind {
    Synthetic { width: u32, height: u32 },
    Clip { dir: PathBuf, fps: f64 },
    Camera { device: u32 },
}

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub environment: Environment,
    pub source: SourceKind,
    /// Detection cadence override; None keeps the per-source default.
    pub interval_ms: Option<u64>,
    /// Save rendered overlay frames here, roughly once a second.
    pub output_dir: Option<PathBuf>,
    /// Health-probe poll interval while waiting for the backend.
    pub health_poll_ms: u64,
}

impl ViewerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();

        let source = match env::var("VIEWER_SOURCE")
            .unwrap_or_else(|_| "synthetic".to_string())
            .to_lowercase()
            .as_str()
        {
            "synthetic" => SourceKind::Synthetic {
                width: env_or("VIEWER_WIDTH", 640),
                height: env_or("VIEWER_HEIGHT", 480),
            },
            "clip" => {
                let dir = env::var("VIEWER_CLIP_DIR")
                    .context("VIEWER_SOURCE=clip requires VIEWER_CLIP_DIR")?;
                SourceKind::Clip {
                    dir: PathBuf::from(dir),
                    fps: env_or("VIEWER_CLIP_FPS", 30.0),
                }
            }
            "camera" => SourceKind::Camera {
                device: env_or("VIEWER_CAMERA_DEVICE", 0),
            },
            other => bail!("unsupported VIEWER_SOURCE: {other} (synthetic|clip|camera)"),
        };

        let interval_ms = env::var("VIEWER_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok());

        let output_dir = env::var("VIEWER_OUTPUT_DIR").ok().map(PathBuf::from);

        Ok(Self {
            environment,
            source,
            interval_ms,
            output_dir,
            health_poll_ms: env_or("VIEWER_HEALTH_POLL_MS", 2000),
        })
    }
}
