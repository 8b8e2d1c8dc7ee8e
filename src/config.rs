//! Daemon configuration.
//!
//! Loaded from a JSON file addressed by `SKYWATCH_CONFIG`, then overridden by
//! individual environment variables, then validated. Every field has a default
//! so an empty environment runs the stub demo pipeline.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::capture::SamplerConfig;
use crate::StreamSource;

const DEFAULT_NOTIFY_URL: &str = "http://127.0.0.1:8080/api/ai/detect";
const DEFAULT_API_ADDR: &str = "127.0.0.1:8890";
const DEFAULT_CONFIDENCE: f32 = 0.5;
const DEFAULT_INTEREST_CLASSES: &[&str] = &["person", "vehicle", "airplane", "bird", "mammal"];
const DEFAULT_STORAGE_ROOT: &str = "evidence";
const DEFAULT_COOLDOWN_SECS: u64 = 300;
const DEFAULT_CYCLE_DELAY_SECS: f64 = 0.2;
const DEFAULT_RETRY_DELAY_SECS: f64 = 5.0;
const DEFAULT_STREAM_LOCATOR: &str = "stub://demo";

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    notify_url: Option<String>,
    api: Option<ApiConfigFile>,
    detector: Option<DetectorConfigFile>,
    storage: Option<StorageConfigFile>,
    sampling: Option<SamplingConfigFile>,
    suppression: Option<SuppressionConfigFile>,
    cycle: Option<CycleConfigFile>,
    resolver: Option<ResolverConfigFile>,
    streams: Option<Vec<StreamConfigFile>>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    addr: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    kind: Option<String>,
    endpoint: Option<String>,
    confidence_threshold: Option<f32>,
    interest_classes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct StorageConfigFile {
    backend: Option<String>,
    root: Option<String>,
    base_url: Option<String>,
    public_base: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SamplingConfigFile {
    source_fps: Option<u32>,
    pacing_secs: Option<f64>,
    max_discard: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct SuppressionConfigFile {
    cooldown_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CycleConfigFile {
    delay_secs: Option<f64>,
    retry_delay_secs: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct ResolverConfigFile {
    kind: Option<String>,
    quality: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamConfigFile {
    id: u32,
    locator: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorKind {
    Stub,
    Http,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    Local,
    Http,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolverKind {
    Direct,
    Streamlink,
}

#[derive(Clone, Debug)]
pub struct DetectorSettings {
    pub kind: DetectorKind,
    pub endpoint: Option<String>,
    pub confidence_threshold: f32,
    pub interest_classes: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct StorageSettings {
    pub backend: StorageKind,
    pub root: String,
    pub base_url: Option<String>,
    pub public_base: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ResolverSettings {
    pub kind: ResolverKind,
    pub quality: String,
}

#[derive(Clone, Debug)]
pub struct SkywatchConfig {
    pub notify_url: String,
    pub api_addr: String,
    pub detector: DetectorSettings,
    pub storage: StorageSettings,
    pub sampler: SamplerConfig,
    pub cooldown: Duration,
    pub cycle_delay: Duration,
    pub retry_delay: Duration,
    pub resolver: ResolverSettings,
    pub streams: Vec<StreamSource>,
}

impl SkywatchConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SKYWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => read_config_file(Path::new(path))?,
            None => ConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ConfigFile) -> Result<Self> {
        let notify_url = file
            .notify_url
            .unwrap_or_else(|| DEFAULT_NOTIFY_URL.to_string());
        let api_addr = file
            .api
            .and_then(|api| api.addr)
            .unwrap_or_else(|| DEFAULT_API_ADDR.to_string());

        let detector_file = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            kind: match detector_file.kind.as_deref() {
                None | Some("stub") => DetectorKind::Stub,
                Some("http") => DetectorKind::Http,
                Some(other) => return Err(anyhow!("unknown detector kind '{}'", other)),
            },
            endpoint: detector_file.endpoint,
            confidence_threshold: detector_file
                .confidence_threshold
                .unwrap_or(DEFAULT_CONFIDENCE),
            interest_classes: detector_file.interest_classes.unwrap_or_else(|| {
                DEFAULT_INTEREST_CLASSES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            }),
        };

        let storage_file = file.storage.unwrap_or_default();
        let storage = StorageSettings {
            backend: match storage_file.backend.as_deref() {
                None | Some("local") => StorageKind::Local,
                Some("http") => StorageKind::Http,
                Some(other) => return Err(anyhow!("unknown storage backend '{}'", other)),
            },
            root: storage_file
                .root
                .unwrap_or_else(|| DEFAULT_STORAGE_ROOT.to_string()),
            base_url: storage_file.base_url,
            public_base: storage_file.public_base,
        };

        let sampling = file.sampling.unwrap_or_default();
        let defaults = SamplerConfig::default();
        let sampler = SamplerConfig {
            source_fps: sampling.source_fps.unwrap_or(defaults.source_fps),
            pacing_secs: sampling.pacing_secs.unwrap_or(defaults.pacing_secs),
            max_discard: sampling.max_discard.unwrap_or(defaults.max_discard),
        };

        let cooldown = Duration::from_secs(
            file.suppression
                .and_then(|s| s.cooldown_secs)
                .unwrap_or(DEFAULT_COOLDOWN_SECS),
        );

        let cycle = file.cycle.unwrap_or_default();
        let cycle_delay =
            Duration::from_secs_f64(cycle.delay_secs.unwrap_or(DEFAULT_CYCLE_DELAY_SECS));
        let retry_delay =
            Duration::from_secs_f64(cycle.retry_delay_secs.unwrap_or(DEFAULT_RETRY_DELAY_SECS));

        let resolver_file = file.resolver.unwrap_or_default();
        let resolver = ResolverSettings {
            kind: match resolver_file.kind.as_deref() {
                None | Some("direct") => ResolverKind::Direct,
                Some("streamlink") => ResolverKind::Streamlink,
                Some(other) => return Err(anyhow!("unknown resolver kind '{}'", other)),
            },
            quality: resolver_file.quality.unwrap_or_else(|| "720p".to_string()),
        };

        let streams = file
            .streams
            .map(|streams| {
                streams
                    .into_iter()
                    .map(|s| StreamSource::new(s.id, s.locator))
                    .collect()
            })
            .unwrap_or_else(|| vec![StreamSource::new(1, DEFAULT_STREAM_LOCATOR)]);

        Ok(Self {
            notify_url,
            api_addr,
            detector,
            storage,
            sampler,
            cooldown,
            cycle_delay,
            retry_delay,
            resolver,
            streams,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("SKYWATCH_NOTIFY_URL") {
            if !url.trim().is_empty() {
                self.notify_url = url;
            }
        }
        if let Ok(addr) = std::env::var("SKYWATCH_API_ADDR") {
            if !addr.trim().is_empty() {
                self.api_addr = addr;
            }
        }
        if let Ok(root) = std::env::var("SKYWATCH_STORAGE_ROOT") {
            if !root.trim().is_empty() {
                self.storage.root = root;
            }
        }
        if let Ok(endpoint) = std::env::var("SKYWATCH_DETECTOR_URL") {
            if !endpoint.trim().is_empty() {
                self.detector.kind = DetectorKind::Http;
                self.detector.endpoint = Some(endpoint);
            }
        }
        if let Ok(cooldown) = std::env::var("SKYWATCH_COOLDOWN_SECS") {
            let seconds: u64 = cooldown.parse().map_err(|_| {
                anyhow!("SKYWATCH_COOLDOWN_SECS must be an integer number of seconds")
            })?;
            self.cooldown = Duration::from_secs(seconds);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        check_url("notify_url", &self.notify_url)?;
        if !(0.0..=1.0).contains(&self.detector.confidence_threshold) {
            return Err(anyhow!("confidence_threshold must be within 0..=1"));
        }
        if self.detector.kind == DetectorKind::Http {
            match &self.detector.endpoint {
                Some(endpoint) => check_url("detector.endpoint", endpoint)?,
                None => return Err(anyhow!("http detector requires detector.endpoint")),
            }
        }
        if self.storage.backend == StorageKind::Http {
            match (&self.storage.base_url, &self.storage.public_base) {
                (Some(base_url), Some(public_base)) => {
                    check_url("storage.base_url", base_url)?;
                    check_url("storage.public_base", public_base)?;
                }
                _ => {
                    return Err(anyhow!(
                        "http storage requires storage.base_url and storage.public_base"
                    ))
                }
            }
        }
        if self.cooldown.as_secs() == 0 {
            return Err(anyhow!("suppression cooldown must be greater than zero"));
        }
        if self.streams.is_empty() {
            return Err(anyhow!("at least one stream must be configured"));
        }
        let mut ids: Vec<u32> = self.streams.iter().map(|s| s.id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() != self.streams.len() {
            return Err(anyhow!("stream ids must be unique"));
        }
        if self.sampler.pacing_secs < 0.0 {
            return Err(anyhow!("sampling pacing_secs must not be negative"));
        }
        Ok(())
    }
}

fn check_url(field: &str, value: &str) -> Result<()> {
    url::Url::parse(value).map_err(|e| anyhow!("{} is not a valid URL ({}): {}", field, value, e))?;
    Ok(())
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
