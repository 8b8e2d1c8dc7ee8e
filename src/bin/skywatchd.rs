//! skywatchd - multi-stream detection daemon
//!
//! Wires the configured components together and runs:
//! 1. one supervisor thread per configured stream (sample -> detect -> cache
//!    -> suppress -> persist -> notify)
//! 2. the live-view HTTP server (latest annotated frame + on-demand cycles)
//!
//! Ctrl-C flips the shared shutdown flag; supervisors finish their current
//! cycle, then the capture registry releases every handle.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use skywatch::api::{ApiConfig, ApiServer};
use skywatch::config::{DetectorKind, ResolverKind, SkywatchConfig, StorageKind};
use skywatch::{
    CaptureRegistry, DetectionAdapter, DetectionEngine, Detector, DirectResolver, HttpDetector,
    HttpNotifier, HttpObjectStore, ImageStore, LiveViewCache, LocalImageStore,
    PersistenceDispatcher, SourceResolver, StreamSupervisor, StreamlinkResolver, StubCaptureBackend,
    StubDetector, SuppressionEngine,
};

#[derive(Parser, Debug)]
#[command(name = "skywatchd", version, about = "Multi-stream CCTV detection daemon")]
struct Args {
    /// Path to the JSON config file.
    #[arg(long, env = "SKYWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Run one detection cycle per configured stream, print the reports, exit.
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Some(path) = &args.config {
        std::env::set_var("SKYWATCH_CONFIG", path);
    }
    let cfg = SkywatchConfig::load().context("load configuration")?;

    let resolver: Arc<dyn SourceResolver> = match cfg.resolver.kind {
        ResolverKind::Direct => Arc::new(DirectResolver),
        ResolverKind::Streamlink => Arc::new(StreamlinkResolver::new(cfg.resolver.quality.clone())),
    };

    // Real decode backends plug in behind CaptureBackend; the built-in one
    // synthesizes frames for stub:// locators.
    let registry = Arc::new(CaptureRegistry::new(
        Arc::new(StubCaptureBackend::new(640, 480)),
        resolver,
    ));

    let detector: Arc<dyn Detector> = match cfg.detector.kind {
        DetectorKind::Stub => Arc::new(StubDetector::returning(Vec::new())),
        DetectorKind::Http => {
            let endpoint = cfg
                .detector
                .endpoint
                .clone()
                .context("http detector requires an endpoint")?;
            Arc::new(HttpDetector::new(endpoint))
        }
    };
    let adapter = Arc::new(DetectionAdapter::new(
        detector,
        cfg.detector.confidence_threshold,
        cfg.detector.interest_classes.clone(),
    ));

    let store: Arc<dyn ImageStore> = match cfg.storage.backend {
        StorageKind::Local => Arc::new(LocalImageStore::new(cfg.storage.root.clone())),
        StorageKind::Http => {
            let base_url = cfg
                .storage
                .base_url
                .clone()
                .context("http storage requires base_url")?;
            let public_base = cfg
                .storage
                .public_base
                .clone()
                .context("http storage requires public_base")?;
            Arc::new(HttpObjectStore::new(base_url, public_base))
        }
    };

    let engine = Arc::new(DetectionEngine {
        registry: registry.clone(),
        sampler: cfg.sampler,
        adapter,
        cache: Arc::new(LiveViewCache::new()),
        suppression: Arc::new(SuppressionEngine::new()),
        dispatcher: Arc::new(PersistenceDispatcher::new(store)),
        notifier: Arc::new(HttpNotifier::new(cfg.notify_url.clone())),
        cooldown: cfg.cooldown,
    });

    if args.once {
        for source in &cfg.streams {
            match engine.run_cycle(source) {
                Ok(report) => println!("{}", serde_json::to_string_pretty(&report)?),
                Err(failure) => log::error!("stream {}: {}", source.id, failure),
            }
        }
        registry.release_all();
        return Ok(());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            log::info!("shutdown requested");
            shutdown.store(true, Ordering::SeqCst);
        })
        .context("install ctrl-c handler")?;
    }

    let api_handle = ApiServer::new(
        ApiConfig {
            addr: cfg.api_addr.clone(),
        },
        engine.clone(),
        &cfg.streams,
    )
    .spawn(shutdown.clone())?;
    log::info!("live api listening on {}", api_handle.addr);

    log::info!(
        "starting {} stream supervisor(s), cooldown {}s, notify {}",
        cfg.streams.len(),
        cfg.cooldown.as_secs(),
        cfg.notify_url
    );
    let mut handles = Vec::with_capacity(cfg.streams.len());
    for source in &cfg.streams {
        let supervisor = StreamSupervisor::new(
            engine.clone(),
            source.clone(),
            cfg.cycle_delay,
            cfg.retry_delay,
            shutdown.clone(),
        );
        handles.push(supervisor.spawn().context("spawn stream supervisor")?);
    }

    for handle in handles {
        if handle.join().is_err() {
            log::error!("a stream supervisor thread panicked");
        }
    }
    api_handle.stop()?;
    registry.release_all();
    log::info!("skywatchd stopped");
    Ok(())
}
