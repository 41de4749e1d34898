#![forbid(unsafe_code)]

//! Integration tests for the §8 concrete scenarios that need the full
//! `Registry` wired to a real `sled` backend, including the scheduled
//! sweeper driven through virtual time.

use std::sync::Arc;
use std::time::Duration;

use provider_registry::backend::SledDatastore;
use provider_registry::cache::CacheTier;
use provider_registry::codec::ContentId;
use provider_registry::sweeper::sweep;
use provider_registry::time_source::{ManualClock, TokioTimer};
use provider_registry::{Datastore, PeerId, Registry, RegistryConfig};

fn cid(bytes: &[u8]) -> ContentId {
    ContentId::from_bytes(bytes.to_vec())
}

fn registry_over(
    backend: Arc<dyn Datastore>,
    clock: Arc<ManualClock>,
    cleanup_interval_ms: u64,
    provide_validity_ms: u64,
) -> Registry {
    let config = RegistryConfig {
        cache_size: 16,
        cleanup_interval_ms,
        provide_validity_ms,
        data_dir: String::new(),
    };
    Registry::with_parts(backend, config, clock, Arc::new(TokioTimer), None)
}

#[tokio::test(start_paused = true)]
async fn scheduled_sweep_expires_stale_records() {
    let dir = tempfile::tempdir().unwrap();
    let backend: Arc<dyn Datastore> = Arc::new(SledDatastore::open(dir.path()).unwrap());
    let clock = Arc::new(ManualClock::new(0));
    let registry = registry_over(backend.clone(), clock.clone(), 1_000, 1_000);

    let peer = PeerId::random();
    let c = cid(b"cid-a");
    registry.add_provider(&c, &peer).await.unwrap();
    assert_eq!(registry.get_providers(&c).await.unwrap(), vec![peer.clone()]);

    registry.start();
    clock.set(2_000);
    tokio::time::advance(Duration::from_millis(1_100)).await;

    let mut empty = false;
    for _ in 0..200 {
        if registry.get_providers(&c).await.unwrap().is_empty() {
            empty = true;
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(empty, "expected the sweep to have expired the stale record");

    let remaining = backend.query_prefix("/providers").await.unwrap();
    assert!(remaining.is_empty());

    registry.stop();
}

#[tokio::test(start_paused = true)]
async fn selective_expiry_keeps_fresh_peer() {
    let dir = tempfile::tempdir().unwrap();
    let backend: Arc<dyn Datastore> = Arc::new(SledDatastore::open(dir.path()).unwrap());
    let clock = Arc::new(ManualClock::new(0));
    let registry = registry_over(backend.clone(), clock.clone(), 1_000, 1_000);

    let peer1 = PeerId::random();
    let peer2 = PeerId::random();
    let c = cid(b"cid-a");

    registry.add_provider(&c, &peer1).await.unwrap();
    clock.set(1_500);
    registry.add_provider(&c, &peer2).await.unwrap();

    registry.start();
    clock.set(2_000);
    tokio::time::advance(Duration::from_millis(1_100)).await;

    let mut settled = false;
    for _ in 0..200 {
        let providers = registry.get_providers(&c).await.unwrap();
        if providers.len() == 1 && providers[0] == peer2 {
            settled = true;
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(settled, "expected only the fresh peer to survive the sweep");

    registry.stop();
}

#[tokio::test]
async fn malformed_entry_is_tolerated_by_a_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let backend: Arc<dyn Datastore> = Arc::new(SledDatastore::open(dir.path()).unwrap());

    backend
        .put("/providers/cid-a/peer-1", &[0xff; 11])
        .await
        .unwrap();

    let peer = PeerId::random();
    let c = cid(b"cid-b");
    let clock = Arc::new(ManualClock::new(0));
    let registry = registry_over(backend.clone(), clock.clone(), 3_600_000, 86_400_000);
    registry.add_provider(&c, &peer).await.unwrap();

    let report = sweep(
        backend.as_ref(),
        &mut CacheTier::new(16),
        clock.now_ms(),
        86_400_000,
        None,
    )
    .await
    .unwrap();
    assert_eq!(report.malformed, 1);

    // Well-formed entries are unaffected.
    assert_eq!(registry.get_providers(&c).await.unwrap(), vec![peer]);
}

#[tokio::test]
async fn stop_prevents_future_sweeps_but_keeps_serving_reads_and_writes() {
    let dir = tempfile::tempdir().unwrap();
    let backend: Arc<dyn Datastore> = Arc::new(SledDatastore::open(dir.path()).unwrap());
    let clock = Arc::new(ManualClock::new(0));
    let registry = registry_over(backend.clone(), clock.clone(), 3_600_000, 86_400_000);

    registry.start();
    registry.start(); // idempotent
    registry.stop();
    registry.stop(); // idempotent

    let peer = PeerId::random();
    let c = cid(b"cid-a");
    registry.add_provider(&c, &peer).await.unwrap();
    assert_eq!(registry.get_providers(&c).await.unwrap(), vec![peer]);
}
