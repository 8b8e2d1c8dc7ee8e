//! Evidence image persistence.
//!
//! The core only needs one storage capability: `put(bytes, key) -> locator`.
//! Two interchangeable backends implement it: per-stream, per-date directories
//! on local disk, and a remote object store addressed over HTTP. The
//! dispatcher derives the key (`<stream>/<date>/<time>.jpg`) and delegates.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

/// Storage capability: store `bytes` under `key`, return a resolvable locator
/// (a filesystem path or a public URL).
pub trait ImageStore: Send + Sync {
    fn put(&self, bytes: &[u8], key: &str) -> Result<String>;
}

/// Writes under `<root>/<key>`, creating parent directories on demand.
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ImageStore for LocalImageStore {
    fn put(&self, bytes: &[u8], key: &str) -> Result<String> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create evidence directory {}", parent.display()))?;
        }
        fs::write(&path, bytes)
            .with_context(|| format!("write evidence image {}", path.display()))?;
        Ok(path.to_string_lossy().into_owned())
    }
}

const DEFAULT_PUT_TIMEOUT: Duration = Duration::from_secs(15);

/// PUTs to `<base_url>/<key>` and returns `<public_base>/<key>`.
pub struct HttpObjectStore {
    base_url: String,
    public_base: String,
    agent: ureq::Agent,
}

impl HttpObjectStore {
    pub fn new(base_url: impl Into<String>, public_base: impl Into<String>) -> Self {
        Self {
            base_url: trim_slash(base_url.into()),
            public_base: trim_slash(public_base.into()),
            agent: ureq::AgentBuilder::new()
                .timeout_connect(Duration::from_secs(5))
                .timeout(DEFAULT_PUT_TIMEOUT)
                .build(),
        }
    }
}

fn trim_slash(mut value: String) -> String {
    while value.ends_with('/') {
        value.pop();
    }
    value
}

impl ImageStore for HttpObjectStore {
    fn put(&self, bytes: &[u8], key: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url, key);
        // ureq maps any non-2xx status to Err, so Ok here means the upload landed.
        self.agent
            .put(&url)
            .set("Content-Type", "image/jpeg")
            .send_bytes(bytes)
            .with_context(|| format!("upload evidence image to {url}"))?;
        Ok(format!("{}/{}", self.public_base, key))
    }
}

/// Builds storage keys and dispatches to the configured backend.
pub struct PersistenceDispatcher {
    store: Arc<dyn ImageStore>,
}

impl PersistenceDispatcher {
    pub fn new(store: Arc<dyn ImageStore>) -> Self {
        Self { store }
    }

    /// Store one annotated frame and return its reference.
    pub fn persist(&self, jpeg: &[u8], stream_id: u32, at: DateTime<Utc>) -> Result<String> {
        let key = storage_key(stream_id, at);
        self.store.put(jpeg, &key)
    }
}

/// `<stream>/<YYYY-MM-DD>/<HH-MM-SS>.jpg`
fn storage_key(stream_id: u32, at: DateTime<Utc>) -> String {
    format!(
        "{}/{}/{}.jpg",
        stream_id,
        at.format("%Y-%m-%d"),
        at.format("%H-%M-%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn storage_key_is_stream_date_time() {
        let at = Utc.with_ymd_and_hms(2026, 8, 23, 14, 5, 33).unwrap();
        assert_eq!(storage_key(101, at), "101/2026-08-23/14-05-33.jpg");
    }

    #[test]
    fn local_store_writes_nested_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path());

        let reference = store.put(b"jpegbytes", "7/2026-08-23/10-00-00.jpg").unwrap();
        let written = std::fs::read(dir.path().join("7/2026-08-23/10-00-00.jpg")).unwrap();
        assert_eq!(written, b"jpegbytes");
        assert!(reference.ends_with("10-00-00.jpg"));
    }

    #[test]
    fn dispatcher_persists_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = PersistenceDispatcher::new(Arc::new(LocalImageStore::new(dir.path())));
        let at = Utc.with_ymd_and_hms(2026, 8, 23, 9, 30, 0).unwrap();

        let reference = dispatcher.persist(b"img", 42, at).unwrap();
        assert!(reference.contains("42/2026-08-23"));
    }
}
