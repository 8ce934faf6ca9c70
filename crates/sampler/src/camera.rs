//! V4L2 camera source. The device is streamed on a dedicated thread at its
//! native rate (the "media element keeps playing" model); `grab` copies the
//! most recently decoded frame.

use crate::source::{FrameSource, SourceError, WallClock};
use common::retry_with_backoff;
use image::RgbImage;
use protocol::MediaClock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use v4l::{
    FourCC,
    buffer::Type,
    io::{mmap::Stream, traits::CaptureStream},
    prelude::*,
    video::Capture,
};

const BUFFER_COUNT: u32 = 4;

const FOURCC_YUYV: FourCC = FourCC { repr: *b"YUYV" };
const FOURCC_MJPG: FourCC = FourCC { repr: *b"MJPG" };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelFormat {
    Yuyv,
    Mjpeg,
}

fn find_usable_camera() -> Option<u32> {
    v4l::context::enum_devices()
        .into_iter()
        .find(|dev| {
            Device::with_path(dev.path())
                .and_then(|d| d.query_caps())
                .map(|caps| {
                    caps.capabilities
                        .contains(v4l::capability::Flags::VIDEO_CAPTURE)
                })
                .unwrap_or(false)
        })
        .map(|dev| dev.index() as u32)
}

fn open_device(index: u32) -> Result<Device, SourceError> {
    if let Ok(dev) = Device::new(index as usize)
        && dev.query_caps().is_ok()
    {
        return Ok(dev);
    }

    tracing::debug!("camera index {} busy or missing, scanning alternatives", index);

    let fallback = find_usable_camera()
        .ok_or_else(|| SourceError::Device("no usable video devices found".into()))?;
    Device::new(fallback as usize)
        .map_err(|e| SourceError::Device(format!("fallback camera open failed: {e}")))
}

/// Prefer YUYV (cheap to decode), fall back to MJPEG.
fn select_format(device: &Device) -> Result<PixelFormat, SourceError> {
    let formats = device
        .enum_formats()
        .map_err(|e| SourceError::Device(format!("format enumeration failed: {e}")))?;

    if formats.iter().any(|f| f.fourcc == FOURCC_YUYV) {
        return Ok(PixelFormat::Yuyv);
    }
    if formats.iter().any(|f| f.fourcc == FOURCC_MJPG) {
        return Ok(PixelFormat::Mjpeg);
    }
    Err(SourceError::Device(format!(
        "camera supports neither YUYV nor MJPEG: {:?}",
        formats.iter().map(|f| f.fourcc).collect::<Vec<_>>()
    )))
}

/// YUYV packs 2 pixels in 4 bytes: [Y0, U, Y1, V]. BT.601 fixed-point
/// conversion with an 8-bit fraction.
fn decode_yuyv(raw: &[u8], width: u32, height: u32) -> Result<RgbImage, SourceError> {
    let bytes_per_row = (width * 2) as usize;
    let stride = raw.len() / height as usize;
    if stride < bytes_per_row {
        return Err(SourceError::Capture("YUYV buffer too small".into()));
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for row in 0..height as usize {
        let row_start = row * stride;
        let row_data = &raw[row_start..row_start + bytes_per_row];

        for chunk in row_data.chunks_exact(4) {
            let y0 = chunk[0] as i32;
            let u = chunk[1] as i32 - 128;
            let y1 = chunk[2] as i32;
            let v = chunk[3] as i32 - 128;

            let rv = (359 * v) >> 8;
            let gu = (88 * u + 183 * v) >> 8;
            let bu = (454 * u) >> 8;

            rgb.push((y0 + rv).clamp(0, 255) as u8);
            rgb.push((y0 - gu).clamp(0, 255) as u8);
            rgb.push((y0 + bu).clamp(0, 255) as u8);

            rgb.push((y1 + rv).clamp(0, 255) as u8);
            rgb.push((y1 - gu).clamp(0, 255) as u8);
            rgb.push((y1 + bu).clamp(0, 255) as u8);
        }
    }

    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| SourceError::Capture("decoded YUYV size mismatch".into()))
}

fn decode_mjpeg(raw: &[u8]) -> Result<RgbImage, SourceError> {
    image::load_from_memory(raw)
        .map(|img| img.to_rgb8())
        .map_err(|e| SourceError::Capture(format!("MJPEG decode failed: {e}")))
}

pub struct CameraSource {
    width: u32,
    height: u32,
    fps: f64,
    latest: Arc<Mutex<Option<RgbImage>>>,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    clock: Arc<WallClock>,
}

impl CameraSource {
    pub fn open(device_index: u32) -> Result<Self, SourceError> {
        let device = retry_with_backoff(|| open_device(device_index), 5, 200, "Camera init")?;

        let caps = device
            .query_caps()
            .map_err(|e| SourceError::Device(format!("capability query failed: {e}")))?;
        tracing::info!("camera opened: {} ({})", caps.card, caps.driver);

        let pixel_format = select_format(&device)?;
        let fourcc = match pixel_format {
            PixelFormat::Yuyv => FOURCC_YUYV,
            PixelFormat::Mjpeg => FOURCC_MJPG,
        };

        let mut format = device
            .format()
            .map_err(|e| SourceError::Device(format!("format query failed: {e}")))?;
        format.fourcc = fourcc;
        let format = device
            .set_format(&format)
            .map_err(|e| SourceError::Device(format!("format negotiation failed: {e}")))?;

        let params = device
            .params()
            .map_err(|e| SourceError::Device(format!("parameter query failed: {e}")))?;
        let fps = params.interval.denominator as f64 / params.interval.numerator as f64;

        tracing::info!(
            "capture format: {}x{} {:?} at {:.1} fps ({:?})",
            format.width,
            format.height,
            format.fourcc,
            fps,
            pixel_format
        );

        let latest = Arc::new(Mutex::new(None));
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = {
            let latest = Arc::clone(&latest);
            let shutdown = Arc::clone(&shutdown);
            let (width, height) = (format.width, format.height);
            std::thread::spawn(move || {
                stream_frames(device, pixel_format, width, height, latest, shutdown);
            })
        };

        Ok(Self {
            width: format.width,
            height: format.height,
            fps,
            latest,
            shutdown,
            worker: Some(worker),
            clock: Arc::new(WallClock::new()),
        })
    }
}

fn stream_frames(
    device: Device,
    pixel_format: PixelFormat,
    width: u32,
    height: u32,
    latest: Arc<Mutex<Option<RgbImage>>>,
    shutdown: Arc<AtomicBool>,
) {
    let mut stream = match Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(error = %e, "failed to create capture stream");
            return;
        }
    };

    let mut dropped = 0u64;
    while !shutdown.load(Ordering::Relaxed) {
        match stream.next() {
            Ok((buf, _meta)) => {
                let decoded = match pixel_format {
                    PixelFormat::Yuyv => decode_yuyv(buf, width, height),
                    PixelFormat::Mjpeg => decode_mjpeg(buf),
                };
                match decoded {
                    Ok(frame) => {
                        *latest.lock().unwrap() = Some(frame);
                    }
                    Err(e) => {
                        dropped += 1;
                        tracing::warn!(error = %e, dropped, "frame decode error");
                    }
                }
            }
            Err(e) => {
                dropped += 1;
                tracing::warn!(error = %e, dropped, "frame capture error");
            }
        }
    }

    tracing::info!("camera stream stopped ({} frames dropped)", dropped);
}

impl FrameSource for CameraSource {
    fn dimensions(&self) -> Option<(u32, u32)> {
        // Dimensions are only trusted once a frame has actually decoded.
        self.latest
            .lock()
            .unwrap()
            .as_ref()
            .map(|_| (self.width, self.height))
    }

    fn grab(&mut self) -> Result<RgbImage, SourceError> {
        self.latest
            .lock()
            .unwrap()
            .clone()
            .ok_or(SourceError::NotReady)
    }

    fn clock(&self) -> Arc<dyn MediaClock> {
        self.clock.clone() as Arc<dyn MediaClock>
    }

    fn native_fps(&self) -> Option<f64> {
        Some(self.fps)
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        // Release the device on every exit path, error paths included.
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
