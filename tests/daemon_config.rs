use std::sync::Mutex;

use tempfile::NamedTempFile;

use skywatch::config::{DetectorKind, ResolverKind, SkywatchConfig, StorageKind};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "SKYWATCH_CONFIG",
        "SKYWATCH_NOTIFY_URL",
        "SKYWATCH_API_ADDR",
        "SKYWATCH_STORAGE_ROOT",
        "SKYWATCH_DETECTOR_URL",
        "SKYWATCH_COOLDOWN_SECS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_run_the_stub_pipeline() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = SkywatchConfig::load().expect("load default config");

    assert_eq!(cfg.detector.kind, DetectorKind::Stub);
    assert_eq!(cfg.storage.backend, StorageKind::Local);
    assert_eq!(cfg.resolver.kind, ResolverKind::Direct);
    assert_eq!(cfg.cooldown.as_secs(), 300);
    assert_eq!(cfg.streams.len(), 1);
    assert!(cfg.streams[0].locator.starts_with("stub://"));

    clear_env();
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "notify_url": "http://backend:8080/api/ai/detect",
        "api": { "addr": "0.0.0.0:9100" },
        "detector": {
            "kind": "http",
            "endpoint": "http://model:5000/infer",
            "confidence_threshold": 0.6,
            "interest_classes": ["person", "airplane"]
        },
        "storage": {
            "backend": "http",
            "base_url": "http://objects:9000/evidence",
            "public_base": "https://cdn.example.com/evidence"
        },
        "sampling": { "source_fps": 25, "pacing_secs": 0.4, "max_discard": 30 },
        "suppression": { "cooldown_secs": 600 },
        "cycle": { "delay_secs": 0.5, "retry_delay_secs": 3.0 },
        "resolver": { "kind": "streamlink", "quality": "480p" },
        "streams": [
            { "id": 101, "locator": "https://youtube.example/watch?v=abc" },
            { "id": 102, "locator": "rtsp://camera-2/stream" }
        ]
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("SKYWATCH_CONFIG", file.path());
    std::env::set_var("SKYWATCH_NOTIFY_URL", "http://other:8080/api/ai/detect");
    std::env::set_var("SKYWATCH_COOLDOWN_SECS", "120");

    let cfg = SkywatchConfig::load().expect("load config");

    assert_eq!(cfg.notify_url, "http://other:8080/api/ai/detect");
    assert_eq!(cfg.api_addr, "0.0.0.0:9100");
    assert_eq!(cfg.detector.kind, DetectorKind::Http);
    assert_eq!(cfg.detector.endpoint.as_deref(), Some("http://model:5000/infer"));
    assert_eq!(cfg.detector.interest_classes, vec!["person", "airplane"]);
    assert_eq!(cfg.storage.backend, StorageKind::Http);
    assert_eq!(cfg.sampler.source_fps, 25);
    assert_eq!(cfg.sampler.max_discard, 30);
    assert_eq!(cfg.cooldown.as_secs(), 120);
    assert_eq!(cfg.resolver.kind, ResolverKind::Streamlink);
    assert_eq!(cfg.resolver.quality, "480p");
    assert_eq!(cfg.streams.len(), 2);
    assert_eq!(cfg.streams[1].id, 102);

    clear_env();
}

#[test]
fn rejects_duplicate_stream_ids() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "streams": [
            { "id": 7, "locator": "stub://a" },
            { "id": 7, "locator": "stub://b" }
        ]
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("SKYWATCH_CONFIG", file.path());

    let err = SkywatchConfig::load().unwrap_err();
    assert!(err.to_string().contains("unique"));

    clear_env();
}

#[test]
fn rejects_zero_cooldown() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{ "suppression": { "cooldown_secs": 0 } }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("SKYWATCH_CONFIG", file.path());

    assert!(SkywatchConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_malformed_notify_url() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("SKYWATCH_NOTIFY_URL", "not a url");

    let err = SkywatchConfig::load().unwrap_err();
    assert!(err.to_string().contains("notify_url"));

    clear_env();
}

#[test]
fn http_detector_requires_endpoint() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{ "detector": { "kind": "http" } }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("SKYWATCH_CONFIG", file.path());

    assert!(SkywatchConfig::load().is_err());

    clear_env();
}
