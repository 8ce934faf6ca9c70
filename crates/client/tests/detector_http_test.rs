use client::{AnnotationOptions, Detect, DetectError, DetectorClient, DetectorConfig, EncodedFrame};
use protocol::BatchOrigin;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

/// Minimal single-request HTTP stub: accepts one connection, reads the full
/// request (headers plus Content-Length body), then writes a canned
/// response.
fn serve_once(status: &str, body: &str) -> (String, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();

        let mut data = Vec::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            data.extend_from_slice(&buf[..n]);

            if let Some(header_end) = data.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&data[..header_end]).to_lowercase();
                let content_length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if data.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        stream.write_all(response.as_bytes()).unwrap();
        let _ = stream.flush();
    });

    (format!("http://{addr}"), handle)
}

fn client_for(base_url: &str, synthetic_fallback: bool) -> DetectorClient {
    DetectorClient::new(DetectorConfig {
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(5),
        annotation: AnnotationOptions::default(),
        synthetic_fallback,
    })
}

fn test_frame() -> EncodedFrame {
    let image = image::RgbImage::from_pixel(8, 8, image::Rgb([40, 90, 160]));
    EncodedFrame::from_rgb(&image).unwrap()
}

#[test]
fn successful_response_is_parsed_and_normalized() {
    let body = r#"{
        "detections": [
            {"class": "salmon", "confidence": 0.91, "x": 0.25, "y": 0.25, "width": 0.5, "height": 0.5}
        ],
        "count": 1,
        "processingTime": 0.05
    }"#;
    let (url, server) = serve_once("200 OK", body);

    let batch = client_for(&url, false).detect(&test_frame()).unwrap();
    server.join().unwrap();

    assert_eq!(batch.origin, BatchOrigin::Backend);
    assert_eq!(batch.detections.len(), 1);
    assert_eq!(batch.detections[0].class_label, "salmon");
    assert_eq!(batch.detections[0].bbox.x, 0.25);
    assert_eq!(batch.processing_seconds, Some(0.05));
}

#[test]
fn error_status_without_fallback_is_a_processing_error() {
    let (url, server) = serve_once("500 Internal Server Error", r#"{"error": "model exploded"}"#);

    let err = client_for(&url, false).detect(&test_frame()).unwrap_err();
    server.join().unwrap();

    match err {
        DetectError::Processing(detail) => assert!(detail.contains("model exploded")),
        other => panic!("expected Processing, got {other:?}"),
    }
}

#[test]
fn error_status_with_fallback_yields_synthetic_batch() {
    let (url, server) = serve_once("500 Internal Server Error", "");

    let batch = client_for(&url, true).detect(&test_frame()).unwrap();
    server.join().unwrap();

    assert_eq!(batch.origin, BatchOrigin::Synthetic);
    assert!(batch.detections[0].is_fallback());
}

#[test]
fn malformed_success_body_is_a_processing_error() {
    let (url, server) = serve_once("200 OK", "this is not json");

    let err = client_for(&url, false).detect(&test_frame()).unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, DetectError::Processing(_)));
}

#[test]
fn refused_connection_is_a_connectivity_error() {
    // Bind then drop to get a port with nothing listening on it.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client_for(&format!("http://{addr}"), true)
        .detect(&test_frame())
        .unwrap_err();

    assert!(err.is_connectivity(), "expected Connectivity, got {err:?}");
}

#[test]
fn health_probe_reflects_backend_state() {
    let (url, server) = serve_once("200 OK", r#"{"status": "ok"}"#);
    let agent = ureq::AgentBuilder::new()
        .timeout(Duration::from_secs(5))
        .build();
    assert!(client::probe_health(&agent, &url));
    server.join().unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    assert!(!client::probe_health(&agent, &format!("http://{addr}")));
}
