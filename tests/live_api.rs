//! Live-view API over a real TCP socket, with the full engine behind it.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use skywatch::api::{ApiConfig, ApiServer};
use skywatch::detect::{BoundingBox, Detection};
use skywatch::{
    CaptureRegistry, DetectionAdapter, DetectionEngine, DetectionEvent, DirectResolver,
    LocalImageStore, LiveViewCache, Notifier, PersistenceDispatcher, SamplerConfig, StreamSource,
    StubCaptureBackend, StubDetector, SuppressionEngine,
};

struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: &DetectionEvent) -> Result<()> {
        Ok(())
    }
}

fn test_engine(dir: &std::path::Path, detections: Vec<Detection>) -> Arc<DetectionEngine> {
    Arc::new(DetectionEngine {
        registry: Arc::new(CaptureRegistry::new(
            Arc::new(StubCaptureBackend::new(32, 32)),
            Arc::new(DirectResolver),
        )),
        sampler: SamplerConfig {
            source_fps: 10,
            pacing_secs: 0.1,
            max_discard: 4,
        },
        adapter: Arc::new(DetectionAdapter::new(
            Arc::new(StubDetector::returning(detections)),
            0.5,
            vec!["person".to_string()],
        )),
        cache: Arc::new(LiveViewCache::new()),
        suppression: Arc::new(SuppressionEngine::new()),
        dispatcher: Arc::new(PersistenceDispatcher::new(Arc::new(LocalImageStore::new(
            dir,
        )))),
        notifier: Arc::new(NullNotifier),
        cooldown: Duration::from_secs(300),
    })
}

fn request(addr: std::net::SocketAddr, path: &str) -> Result<(String, Vec<u8>)> {
    let mut stream = TcpStream::connect(addr)?;
    write!(stream, "GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n")?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    let mut response = Vec::new();
    stream.read_to_end(&mut response)?;

    let split = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("header/body split");
    let head = String::from_utf8_lossy(&response[..split]).to_string();
    let body = response[split + 4..].to_vec();
    Ok((head, body))
}

#[test]
fn health_and_stream_routes() {
    let dir = tempfile::tempdir().unwrap();
    let person = Detection {
        label: "person".to_string(),
        confidence: 0.9,
        bbox: BoundingBox {
            x: 0.2,
            y: 0.2,
            w: 0.3,
            h: 0.3,
        },
    };
    let engine = test_engine(dir.path(), vec![person]);
    let streams = vec![StreamSource::new(101, "stub://gate")];

    let shutdown = Arc::new(AtomicBool::new(false));
    let handle = ApiServer::new(
        ApiConfig {
            addr: "127.0.0.1:0".to_string(),
        },
        engine.clone(),
        &streams,
    )
    .spawn(shutdown.clone())
    .expect("spawn api");
    let addr = handle.addr;

    // Health.
    let (head, body) = request(addr, "/health").unwrap();
    assert!(head.starts_with("HTTP/1.1 200"));
    assert_eq!(body, br#"{"status":"ok"}"#);

    // No cycle has run yet: the cache is explicitly absent, not an error.
    let (head, body) = request(addr, "/streams/101/live").unwrap();
    assert!(head.starts_with("HTTP/1.1 404"));
    assert!(String::from_utf8_lossy(&body).contains("no_frame_yet"));

    // Unknown stream id.
    let (head, _) = request(addr, "/streams/999/live").unwrap();
    assert!(head.starts_with("HTTP/1.1 404"));

    // On-demand cycle populates the cache and reports the detection.
    let (head, body) = request(addr, "/streams/101/detect").unwrap();
    assert!(head.starts_with("HTTP/1.1 200"));
    let report: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(report["stream_id"], 101);
    assert_eq!(report["counts"]["person"], 1);
    assert_eq!(report["notified"], true);

    // Now the live frame is served as JPEG.
    let (head, body) = request(addr, "/streams/101/live").unwrap();
    assert!(head.starts_with("HTTP/1.1 200"));
    assert!(head.contains("image/jpeg"));
    assert_eq!(&body[..2], &[0xFF, 0xD8]);

    // Viewers re-reading between cycles see the same frame again.
    let (_, body_again) = request(addr, "/streams/101/live").unwrap();
    assert_eq!(body, body_again);

    shutdown.store(true, Ordering::SeqCst);
    handle.stop().expect("stop api");
}

#[test]
fn non_get_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let engine = test_engine(dir.path(), Vec::new());
    let streams = vec![StreamSource::new(1, "stub://cam")];

    let shutdown = Arc::new(AtomicBool::new(false));
    let handle = ApiServer::new(
        ApiConfig {
            addr: "127.0.0.1:0".to_string(),
        },
        engine,
        &streams,
    )
    .spawn(shutdown.clone())
    .expect("spawn api");

    let mut stream = TcpStream::connect(handle.addr).unwrap();
    write!(
        stream,
        "POST /streams/1/detect HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n"
    )
    .unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    assert!(response.starts_with("HTTP/1.1 405"));

    shutdown.store(true, Ordering::SeqCst);
    handle.stop().expect("stop api");
}

#[test]
fn detect_reports_classified_failure() {
    // A locator the stub backend cannot open surfaces as stream_unavailable.
    let dir = tempfile::tempdir().unwrap();
    let engine = test_engine(dir.path(), Vec::new());
    let streams = vec![StreamSource::new(5, "rtsp://nonexistent/stream")];

    let shutdown = Arc::new(AtomicBool::new(false));
    let handle = ApiServer::new(
        ApiConfig {
            addr: "127.0.0.1:0".to_string(),
        },
        engine,
        &streams,
    )
    .spawn(shutdown.clone())
    .expect("spawn api");

    let (head, body) = request(handle.addr, "/streams/5/detect").unwrap();
    assert!(head.starts_with("HTTP/1.1 502"));
    assert!(String::from_utf8_lossy(&body).contains("stream_unavailable"));

    shutdown.store(true, Ordering::SeqCst);
    handle.stop().expect("stop api");
}
