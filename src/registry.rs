// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! The public registry façade: `start`, `stop`, `add_provider`,
//! `get_providers`.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use libp2p::PeerId;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, Datastore};
use crate::cache::{CacheTier, PeerMap};
use crate::codec::{cid_text, encode_timestamp, peer_text, ContentId};
use crate::config::RegistryConfig;
use crate::key_builder::{cid_prefix, parse_key, record_key};
use crate::metrics::Metrics;
use crate::serializer::Serializer;
use crate::sweeper::sweep;
use crate::time_source::{Clock, SystemClock, Timer, TokioTimer};

/// Registry-level errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The durable backend failed to service the request.
    #[error("backend failure")]
    Backend(#[source] BackendError),
}

impl From<BackendError> for RegistryError {
    fn from(err: BackendError) -> Self {
        RegistryError::Backend(err)
    }
}

struct Inner {
    backend: Arc<dyn Datastore>,
    serializer: Serializer<CacheTier>,
    clock: Arc<dyn Clock>,
    timer: Arc<dyn Timer>,
    config: RegistryConfig,
    metrics: Option<Metrics>,
    running: AtomicBool,
    sweep_task: StdMutex<Option<(JoinHandle<()>, watch::Sender<bool>)>>,
}

/// The provider registry façade.
///
/// Cheap to clone: internally an `Arc` handle shared between the caller and
/// the background sweep task.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

impl Registry {
    /// Construct a registry using the host's real clock and timer, with no
    /// metrics collection.
    pub fn new(backend: Arc<dyn Datastore>, config: RegistryConfig) -> Self {
        Self::with_parts(backend, config, Arc::new(SystemClock), Arc::new(TokioTimer), None)
    }

    /// Construct a registry with injected clock/timer/metrics, for tests and
    /// deployments that want Prometheus wiring.
    pub fn with_parts(
        backend: Arc<dyn Datastore>,
        config: RegistryConfig,
        clock: Arc<dyn Clock>,
        timer: Arc<dyn Timer>,
        metrics: Option<Metrics>,
    ) -> Self {
        let cache = CacheTier::new(config.cache_size);
        Self {
            inner: Arc::new(Inner {
                backend,
                serializer: Serializer::new(cache),
                clock,
                timer,
                config,
                metrics,
                running: AtomicBool::new(false),
                sweep_task: StdMutex::new(None),
            }),
        }
    }

    /// This registry's metrics, if any were configured.
    pub fn metrics(&self) -> Option<&Metrics> {
        self.inner.metrics.as_ref()
    }

    /// Start the sweeper. Idempotent: a second call while already running
    /// is a no-op. No sweep runs before `start`.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            let interval = Duration::from_millis(inner.config.cleanup_interval_ms);
            loop {
                tokio::select! {
                    _ = inner.timer.sleep(interval) => {}
                    _ = stop_rx.changed() => {}
                }
                if *stop_rx.borrow() {
                    break;
                }

                let backend = inner.backend.clone();
                let clock = inner.clock.clone();
                let metrics = inner.metrics.clone();
                let provide_validity_ms = inner.config.provide_validity_ms;
                let now_ms = clock.now_ms();
                debug!(now_ms, "sweep starting");
                let report = inner
                    .serializer
                    .submit(move |cache| {
                        let backend = backend.clone();
                        let metrics = metrics.clone();
                        async move {
                            sweep(backend.as_ref(), cache, now_ms, provide_validity_ms, metrics.as_ref()).await
                        }
                    })
                    .await;
                match report {
                    Ok(report) => {
                        info!(deleted = report.deleted, malformed = report.malformed, "sweep finished");
                    }
                    Err(err) => {
                        warn!(error = %err, "sweep aborted by backend failure, retrying next tick");
                    }
                }
            }
        });

        *self.inner.sweep_task.lock().unwrap() = Some((handle, stop_tx));
        info!("provider registry started");
    }

    /// Stop scheduling future sweeps. Idempotent. Does not cancel a sweep
    /// that is already in flight — it runs to completion because it holds
    /// the serializer. `add_provider`/`get_providers` keep working after
    /// `stop`.
    pub fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some((_, stop_tx)) = self.inner.sweep_task.lock().unwrap().take() {
            let _ = stop_tx.send(true);
        }
        info!("provider registry stopped");
    }

    /// Record that `peer` claims to provide `cid`, refreshing the timestamp
    /// if the claim already existed.
    pub async fn add_provider(&self, cid: &ContentId, peer: &PeerId) -> Result<(), RegistryError> {
        let backend = self.inner.backend.clone();
        let clock = self.inner.clock.clone();
        let metrics = self.inner.metrics.clone();
        let cid = cid.clone();
        let peer = peer.clone();

        self.inner
            .serializer
            .submit(move |cache| {
                let backend = backend.clone();
                let metrics = metrics.clone();
                async move {
                    let cid_t = cid_text(&cid);
                    let mut map = match cache.get(&cid_t) {
                        Some(map) => {
                            if let Some(m) = &metrics {
                                m.cache_hits_total.inc();
                            }
                            map.clone()
                        }
                        None => {
                            if let Some(m) = &metrics {
                                m.cache_misses_total.inc();
                            }
                            debug!(cid = %cid_t, "cache miss, scanning backend");
                            load_peer_map(backend.as_ref(), &cid).await?
                        }
                    };

                    let now_ms = clock.now_ms();
                    map.insert(peer_text(&peer), now_ms);
                    cache.put(cid_t, map);

                    let key = record_key(&cid, &peer);
                    let value = encode_timestamp(now_ms);
                    if let Err(err) = backend.put(&key, &value).await {
                        if let Some(m) = &metrics {
                            m.backend_failures_total.inc();
                        }
                        return Err(RegistryError::from(err));
                    }

                    if let Some(m) = &metrics {
                        m.cache_size.set(cache.len() as i64);
                    }
                    Ok(())
                }
            })
            .await
    }

    /// The peers currently known to provide `cid`. Returns the empty list,
    /// never an error, for an unknown CID. Order is unspecified but stable
    /// within a single call.
    pub async fn get_providers(&self, cid: &ContentId) -> Result<Vec<PeerId>, RegistryError> {
        let backend = self.inner.backend.clone();
        let metrics = self.inner.metrics.clone();
        let cid = cid.clone();

        self.inner
            .serializer
            .submit(move |cache| {
                let backend = backend.clone();
                let metrics = metrics.clone();
                async move {
                    let cid_t = cid_text(&cid);
                    let map = match cache.get(&cid_t) {
                        Some(map) => {
                            if let Some(m) = &metrics {
                                m.cache_hits_total.inc();
                            }
                            map.clone()
                        }
                        None => {
                            if let Some(m) = &metrics {
                                m.cache_misses_total.inc();
                            }
                            debug!(cid = %cid_t, "cache miss, scanning backend");
                            let map = load_peer_map(backend.as_ref(), &cid).await?;
                            cache.put(cid_t, map.clone());
                            if let Some(m) = &metrics {
                                m.cache_size.set(cache.len() as i64);
                            }
                            map
                        }
                    };

                    Ok(map
                        .keys()
                        .filter_map(|text| match PeerId::from_str(text) {
                            Ok(peer) => Some(peer),
                            Err(_) => {
                                warn!(peer_text = %text, "dropping unparsable peer-id from cache");
                                None
                            }
                        })
                        .collect())
                }
            })
            .await
    }
}

/// Prefix-scan the backend for every record under `cid` and materialize its
/// peer-map. Malformed entries are tolerated the same way the sweep
/// tolerates them: logged and skipped, never surfaced as an error.
async fn load_peer_map(backend: &dyn Datastore, cid: &ContentId) -> Result<PeerMap, RegistryError> {
    let prefix = cid_prefix(cid);
    let expected_cid_text = cid_text(cid);
    let rows = backend.query_prefix(&prefix).await?;

    let mut map = PeerMap::new();
    for (key, value) in rows {
        let (row_cid_text, peer_text) = match parse_key(&key) {
            Ok(parts) => parts,
            Err(_) => {
                warn!(key = %key, "skipping malformed provider key during load");
                continue;
            }
        };
        if row_cid_text != expected_cid_text {
            // `prefix` is a string prefix of the scan, not a `/`-delimited
            // one: a shorter cid-text can be a literal prefix of a longer
            // one, so the scan can return rows belonging to a different cid.
            warn!(key = %key, "skipping row from prefix scan belonging to a different cid");
            continue;
        }
        match crate::codec::decode_timestamp(&value) {
            Ok(ts) => {
                map.insert(peer_text, ts);
            }
            Err(_) => {
                warn!(key = %key, "skipping malformed provider record during load");
            }
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SledDatastore;
    use crate::time_source::ManualClock;

    fn cid(bytes: &[u8]) -> ContentId {
        ContentId::from_bytes(bytes.to_vec())
    }

    async fn new_registry(validity_ms: u64, clock: Arc<ManualClock>) -> (tempfile::TempDir, Registry) {
        let dir = tempfile::tempdir().unwrap();
        let backend: Arc<dyn Datastore> = Arc::new(SledDatastore::open(dir.path()).unwrap());
        let config = RegistryConfig {
            cache_size: 16,
            cleanup_interval_ms: 3_600_000,
            provide_validity_ms: validity_ms,
            data_dir: dir.path().to_string_lossy().into_owned(),
        };
        let registry = Registry::with_parts(backend, config, clock, Arc::new(TokioTimer), None);
        (dir, registry)
    }

    #[tokio::test]
    async fn empty_lookup_returns_empty_list() {
        let (_dir, registry) = new_registry(1_000, Arc::new(ManualClock::new(0))).await;
        let providers = registry.get_providers(&cid(b"cid-a")).await.unwrap();
        assert!(providers.is_empty());
    }

    #[tokio::test]
    async fn add_then_get_returns_the_peer() {
        let (_dir, registry) = new_registry(1_000, Arc::new(ManualClock::new(0))).await;
        let peer = PeerId::random();
        registry.add_provider(&cid(b"cid-a"), &peer).await.unwrap();
        let providers = registry.get_providers(&cid(b"cid-a")).await.unwrap();
        assert_eq!(providers, vec![peer]);
    }

    #[tokio::test]
    async fn multi_peer_and_multi_cid() {
        let (_dir, registry) = new_registry(1_000, Arc::new(ManualClock::new(0))).await;
        let peer1 = PeerId::random();
        let peer2 = PeerId::random();
        let cid_a = cid(b"cid-a");
        let cid_b = cid(b"cid-b");

        registry.add_provider(&cid_a, &peer1).await.unwrap();
        registry.add_provider(&cid_a, &peer2).await.unwrap();
        registry.add_provider(&cid_b, &peer1).await.unwrap();

        let mut providers_a = registry.get_providers(&cid_a).await.unwrap();
        providers_a.sort();
        let mut expected = vec![peer1, peer2];
        expected.sort();
        assert_eq!(providers_a, expected);

        assert_eq!(registry.get_providers(&cid_b).await.unwrap(), vec![peer1]);
    }

    #[tokio::test]
    async fn readd_refreshes_timestamp_without_duplicating() {
        let (dir, registry) = new_registry(1_000, Arc::new(ManualClock::new(0))).await;
        let peer = PeerId::random();
        let c = cid(b"cid-a");
        registry.add_provider(&c, &peer).await.unwrap();
        registry.add_provider(&c, &peer).await.unwrap();

        let backend = SledDatastore::open(dir.path()).unwrap();
        let rows = backend.query_prefix(&cid_prefix(&c)).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn load_ignores_rows_whose_cid_text_is_only_a_string_prefix_match() {
        let (dir, registry) = new_registry(1_000, Arc::new(ManualClock::new(0))).await;
        let short = cid(b"cid-a");
        let short_text = cid_text(&short);

        // Craft a key whose cid segment merely starts with `short_text` (as
        // a literal string prefix) rather than equaling it, simulating a
        // longer cid whose base32 text happens to extend the shorter one's.
        let colliding_key = format!("/providers/{short_text}-longer/peer-x");
        let backend = SledDatastore::open(dir.path()).unwrap();
        backend
            .put(&colliding_key, &encode_timestamp(0))
            .await
            .unwrap();

        let providers = registry.get_providers(&short).await.unwrap();
        assert!(
            providers.is_empty(),
            "a row under a different, merely-prefix-matching cid must not be folded into this cid's providers"
        );
    }

    #[tokio::test]
    async fn restart_durability() {
        let dir = tempfile::tempdir().unwrap();
        let peer = PeerId::random();
        let c = cid(b"cid-a");

        {
            let backend: Arc<dyn Datastore> = Arc::new(SledDatastore::open(dir.path()).unwrap());
            let config = RegistryConfig {
                cache_size: 16,
                ..RegistryConfig::default()
            };
            let registry =
                Registry::with_parts(backend, config, Arc::new(ManualClock::new(0)), Arc::new(TokioTimer), None);
            registry.add_provider(&c, &peer).await.unwrap();
        }

        let backend: Arc<dyn Datastore> = Arc::new(SledDatastore::open(dir.path()).unwrap());
        let config = RegistryConfig {
            cache_size: 16,
            ..RegistryConfig::default()
        };
        let registry =
            Registry::with_parts(backend, config, Arc::new(ManualClock::new(0)), Arc::new(TokioTimer), None);
        let providers = registry.get_providers(&c).await.unwrap();
        assert_eq!(providers, vec![peer]);
    }
}
