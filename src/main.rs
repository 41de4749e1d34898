#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Provider registry demo entrypoint.
//!
//! Opens a `sled`-backed registry at a configurable data directory, starts
//! the sweeper, and demonstrates `add_provider`/`get_providers` before
//! waiting for a shutdown signal. The network layer that would drive this
//! in a full DHT node (peer discovery, the routing table) is out of scope
//! for this crate.

use std::sync::Arc;

use tracing::{info, warn};

use provider_registry::backend::SledDatastore;
use provider_registry::codec::ContentId;
use provider_registry::metrics::Metrics;
use provider_registry::{Datastore, PeerId, Registry, RegistryConfig};

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .compact()
        .try_init();

    let config_path = env("PROVIDER_REGISTRY_CONFIG", "");
    let mut config = if config_path.is_empty() {
        RegistryConfig::default()
    } else {
        match RegistryConfig::from_file(&config_path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!(%err, path = %config_path, "failed to load config, using defaults");
                RegistryConfig::default()
            }
        }
    };
    config.data_dir = env("PROVIDER_REGISTRY_DATA_DIR", &config.data_dir);

    let metrics = match Metrics::new() {
        Ok(m) => Some(m),
        Err(err) => {
            warn!(?err, "metrics init failed, continuing without metrics");
            None
        }
    };

    let backend: Arc<dyn Datastore> = match SledDatastore::open(&config.data_dir) {
        Ok(ds) => Arc::new(ds),
        Err(err) => {
            eprintln!("failed to open provider backend at {}: {err}", config.data_dir);
            std::process::exit(1);
        }
    };

    info!(data_dir = %config.data_dir, cache_size = config.cache_size, "provider registry starting");
    let registry = Registry::with_parts(
        backend,
        config,
        Arc::new(provider_registry::time_source::SystemClock),
        Arc::new(provider_registry::time_source::TokioTimer),
        metrics,
    );
    registry.start();

    let cid = ContentId::from_bytes(b"demo-content".to_vec());
    let peer = PeerId::random();
    if let Err(err) = registry.add_provider(&cid, &peer).await {
        warn!(%err, "add_provider failed");
    }
    match registry.get_providers(&cid).await {
        Ok(providers) => info!(count = providers.len(), "demo lookup"),
        Err(err) => warn!(%err, "get_providers failed"),
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => warn!(%err, "failed to listen for shutdown signal"),
    }
    registry.stop();
}
