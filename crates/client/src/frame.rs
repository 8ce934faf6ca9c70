//! Frame encoding for transport: captured RGB frames become base64 JPEG
//! data URLs, the format the detection backend accepts.

use crate::error::DetectError;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use common::span_debug;
use image::{RgbImage, RgbaImage};
use std::io::Cursor;

/// Media subtypes the backend is known to decode.
const RECOGNIZED_SUBTYPES: &[&str] = &["jpeg", "jpg", "png", "webp", "bmp"];

/// A frame encoded as a `data:image/...;base64,` URL, validated at
/// construction so the detector never sends a malformed body.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    data_url: String,
    dims: Option<(u32, u32)>,
}

impl EncodedFrame {
    /// Encode a captured RGB frame as a JPEG data URL, keeping the
    /// dimensions for coordinate normalization.
    pub fn from_rgb(image: &RgbImage) -> Result<Self, DetectError> {
        let _s = span_debug!("encode_frame");

        if image.width() == 0 || image.height() == 0 {
            return Err(DetectError::Validation("empty frame".into()));
        }

        let mut jpeg = Cursor::new(Vec::new());
        image
            .write_to(&mut jpeg, image::ImageFormat::Jpeg)
            .map_err(|e| DetectError::Validation(format!("JPEG encoding failed: {e}")))?;

        let data_url = format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg.get_ref()));
        Ok(Self {
            data_url,
            dims: Some((image.width(), image.height())),
        })
    }

    /// Wrap an externally supplied data URL, failing fast on anything the
    /// backend would reject: empty input, a non-image scheme, an
    /// unrecognized media type, or an empty payload.
    pub fn from_data_url(raw: &str) -> Result<Self, DetectError> {
        if raw.is_empty() {
            return Err(DetectError::Validation("empty image data".into()));
        }

        let rest = raw
            .strip_prefix("data:image/")
            .ok_or_else(|| DetectError::Validation("not an image data URL".into()))?;

        let (subtype, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| DetectError::Validation("missing base64 payload marker".into()))?;

        if !RECOGNIZED_SUBTYPES.contains(&subtype.to_ascii_lowercase().as_str()) {
            return Err(DetectError::Validation(format!(
                "unrecognized image media type: image/{subtype}"
            )));
        }

        if payload.is_empty() {
            return Err(DetectError::Validation("empty image payload".into()));
        }

        Ok(Self {
            data_url: raw.to_string(),
            dims: None,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.data_url
    }

    /// Dimensions recorded at encode time, when this frame was produced
    /// locally. Externally supplied data URLs have none until decoded.
    pub fn dims(&self) -> Option<(u32, u32)> {
        self.dims
    }

    /// Decode back to RGB. Lossy JPEG compression changes pixels but never
    /// the dimensions used for normalization.
    pub fn decode(&self) -> Result<RgbImage, DetectError> {
        let bytes = decode_payload(&self.data_url)?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| DetectError::Processing(format!("image decode failed: {e}")))?;
        Ok(image.to_rgb8())
    }
}

/// Decode a backend-rendered annotated frame (a data URL) into RGBA for the
/// overlay surface.
pub fn decode_data_url_rgba(raw: &str) -> Result<RgbaImage, DetectError> {
    let bytes = decode_payload(raw)?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| DetectError::Processing(format!("annotated frame decode failed: {e}")))?;
    Ok(image.to_rgba8())
}

fn decode_payload(data_url: &str) -> Result<Vec<u8>, DetectError> {
    let payload = data_url
        .split_once(";base64,")
        .map(|(_, p)| p)
        .ok_or_else(|| DetectError::Validation("missing base64 payload marker".into()))?;
    STANDARD
        .decode(payload)
        .map_err(|e| DetectError::Processing(format!("base64 decode failed: {e}")))
}
