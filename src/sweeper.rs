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

//! The periodic expiry sweep: scans the backend, deletes stale provider
//! records in one atomic batch, and reconciles the cache.
//!
//! The sweep itself is just a function — it is the caller's job (the
//! registry's scheduling loop) to admit it through the
//! [`crate::serializer::Serializer`] so it runs with exclusive access to the
//! cache, same as any mutating operation.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::backend::{BackendError, Datastore};
use crate::cache::CacheTier;
use crate::codec::decode_timestamp;
use crate::key_builder::{parse_key, PROVIDER_PREFIX};
use crate::metrics::Metrics;

/// Outcome of a single completed sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Number of provider records deleted.
    pub deleted: usize,
    /// Number of malformed keys/records skipped (logged, not fatal).
    pub malformed: usize,
}

/// Run one sweep pass.
///
/// Per §4.7: scan `/providers`, stage deletions for every record older than
/// `provide_validity_ms`, commit them as a single atomic batch, then
/// reconcile the cache. Malformed entries are logged and skipped — they
/// never abort the sweep. A backend scan or commit failure aborts this pass
/// with no partial batch committed; the next scheduled tick retries from
/// scratch.
pub async fn sweep(
    backend: &dyn Datastore,
    cache: &mut CacheTier,
    now_ms: u64,
    provide_validity_ms: u64,
    metrics: Option<&Metrics>,
) -> Result<SweepReport, BackendError> {
    let rows = backend.query_prefix(PROVIDER_PREFIX).await?;

    let mut stale_keys = Vec::new();
    let mut deleted: HashMap<String, HashSet<String>> = HashMap::new();
    let mut malformed = 0usize;

    for (key, value) in rows {
        let (cid_text, peer_text) = match parse_key(&key) {
            Ok(parts) => parts,
            Err(_) => {
                warn!(key = %key, "skipping malformed provider key during sweep");
                malformed += 1;
                continue;
            }
        };
        let ts = match decode_timestamp(&value) {
            Ok(ts) => ts,
            Err(_) => {
                warn!(key = %key, "skipping malformed provider record during sweep");
                malformed += 1;
                continue;
            }
        };

        if now_ms.saturating_sub(ts) > provide_validity_ms {
            stale_keys.push(key);
            deleted.entry(cid_text).or_default().insert(peer_text);
        }
    }

    if !stale_keys.is_empty() {
        backend.batch_delete(stale_keys).await?;
    }

    let deleted_count: usize = deleted.values().map(|peers| peers.len()).sum();

    for (cid_text, peers) in deleted {
        if let Some(map) = cache.get(&cid_text) {
            let mut map = map.clone();
            for peer in &peers {
                map.remove(peer);
            }
            if map.is_empty() {
                cache.remove(&cid_text);
            } else {
                cache.put(cid_text, map);
            }
        }
    }

    if let Some(metrics) = metrics {
        metrics.sweeps_total.inc();
        metrics.sweep_deleted_total.inc_by(deleted_count as u64);
        metrics.sweep_malformed_total.inc_by(malformed as u64);
        metrics.cache_size.set(cache.len() as i64);
    }

    Ok(SweepReport {
        deleted: deleted_count,
        malformed,
    })
}
