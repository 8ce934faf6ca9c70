//! JSON contract with the external detection backend.
//!
//! The backend's response shape has drifted across revisions (pixel vs
//! normalized coordinates, `processingTime` as string or number, optional
//! frame dimensions), so every field that has ever been absent is optional
//! or defaulted here.

use serde::{Deserialize, Serialize};

/// Body of `POST /detect_frame`.
#[derive(Debug, Serialize)]
pub struct DetectRequest<'a> {
    pub image: &'a str,
    pub return_annotated: bool,
    pub draw_confidence: bool,
    pub draw_labels: bool,
    pub line_width: u32,
}

/// One raw detection as returned by the backend. Coordinates may be pixels
/// or already normalized; `geometry::normalize` resolves that downstream.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDetection {
    #[serde(default, rename = "class")]
    pub class_label: Option<String>,
    #[serde(default)]
    pub confidence: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RawDetection {
    /// Missing class labels default to the primary category.
    pub fn label_or_default(&self) -> &str {
        self.class_label.as_deref().unwrap_or("fish")
    }
}

/// Successful response of `POST /detect_frame`.
#[derive(Debug, Deserialize)]
pub struct DetectResponse {
    #[serde(default)]
    pub detections: Vec<RawDetection>,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub annotated_frame: Option<String>,
    #[serde(default, rename = "processingTime")]
    pub processing_time: Option<ProcessingTime>,
    #[serde(default)]
    pub image_width: Option<u32>,
    #[serde(default)]
    pub image_height: Option<u32>,
}

impl DetectResponse {
    /// Frame dimensions the backend measured, when it sent any.
    pub fn frame_dims(&self) -> Option<(u32, u32)> {
        match (self.image_width, self.image_height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }
}

/// `processingTime` has been serialized both as a number and as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProcessingTime {
    Seconds(f64),
    Text(String),
}

impl ProcessingTime {
    pub fn as_seconds(&self) -> Option<f64> {
        match self {
            ProcessingTime::Seconds(s) => Some(*s),
            ProcessingTime::Text(t) => t.trim().parse().ok(),
        }
    }
}

/// Optional JSON body of a non-2xx response.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_response() {
        let json = r#"{
            "detections": [
                {"class": "salmon", "confidence": 0.91, "x": 12.0, "y": 34.0, "width": 56.0, "height": 78.0}
            ],
            "count": 1,
            "annotated_frame": "data:image/jpeg;base64,AAAA",
            "processingTime": 0.123,
            "image_width": 640,
            "image_height": 480
        }"#;
        let resp: DetectResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.detections.len(), 1);
        assert_eq!(resp.detections[0].label_or_default(), "salmon");
        assert_eq!(resp.frame_dims(), Some((640, 480)));
        assert_eq!(resp.processing_time.unwrap().as_seconds(), Some(0.123));
    }

    #[test]
    fn tolerates_minimal_response() {
        let resp: DetectResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.detections.is_empty());
        assert_eq!(resp.count, 0);
        assert!(resp.annotated_frame.is_none());
        assert_eq!(resp.frame_dims(), None);
    }

    #[test]
    fn count_may_disagree_with_detection_list() {
        let json = r#"{
            "detections": [
                {"x": 0.1, "y": 0.1, "width": 0.2, "height": 0.2},
                {"x": 0.5, "y": 0.5, "width": 0.2, "height": 0.2}
            ],
            "count": 3
        }"#;
        let resp: DetectResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.count, 3);
        assert_eq!(resp.detections.len(), 2);
    }

    #[test]
    fn missing_class_defaults_to_fish() {
        let json = r#"{"detections": [{"x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0}]}"#;
        let resp: DetectResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.detections[0].label_or_default(), "fish");
    }

    #[test]
    fn processing_time_accepts_string_form() {
        let json = r#"{"processingTime": "0.456"}"#;
        let resp: DetectResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.processing_time.unwrap().as_seconds(), Some(0.456));
    }

    #[test]
    fn error_body_tolerates_missing_error_field() {
        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.error.is_none());
    }

    #[test]
    fn request_serializes_expected_fields() {
        let req = DetectRequest {
            image: "data:image/jpeg;base64,AAAA",
            return_annotated: true,
            draw_confidence: true,
            draw_labels: true,
            line_width: 2,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["return_annotated"], true);
        assert_eq!(value["line_width"], 2);
        assert!(value["image"].as_str().unwrap().starts_with("data:image/"));
    }
}
