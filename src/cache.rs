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

//! Bounded in-memory cache tier: a fixed-capacity LRU mapping
//! `cid_text -> (peer_text -> timestamp_ms)`.
//!
//! The cache is advisory. Losing an entry never loses data — the backend is
//! authoritative — it only forces a prefix scan on the next access. It is
//! touched only from inside the [`crate::serializer::Serializer`]-admitted
//! unit of work, so it carries no internal locking of its own.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use lru::LruCache;

/// Default LRU capacity in number of resident CIDs.
pub const DEFAULT_CACHE_SIZE: usize = 256;

/// `peer_text -> timestamp_ms`, order is irrelevant.
pub type PeerMap = HashMap<String, u64>;

/// Fixed-capacity LRU cache keyed by `cid_text`.
pub struct CacheTier {
    inner: LruCache<String, PeerMap>,
}

impl CacheTier {
    /// Construct a cache with the given capacity (number of resident CIDs).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            inner: LruCache::new(capacity),
        }
    }

    /// Look up the peer-map for `cid_text`. `None` means "not cached", not
    /// "no providers". Touches LRU recency.
    pub fn get(&mut self, cid_text: &str) -> Option<&PeerMap> {
        self.inner.get(cid_text)
    }

    /// Insert or replace the peer-map for `cid_text`, evicting the
    /// least-recently-used entry on overflow.
    pub fn put(&mut self, cid_text: String, map: PeerMap) {
        self.inner.put(cid_text, map);
    }

    /// Remove the cache entry for `cid_text`, if present.
    pub fn remove(&mut self, cid_text: &str) {
        self.inner.pop(cid_text);
    }

    /// Number of CIDs currently resident (for P6 bound checks).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the cache currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer_map(entries: &[(&str, u64)]) -> PeerMap {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn miss_returns_none() {
        let mut cache = CacheTier::new(4);
        assert!(cache.get("cid-a").is_none());
    }

    #[test]
    fn put_then_get_returns_map() {
        let mut cache = CacheTier::new(4);
        cache.put("cid-a".into(), peer_map(&[("peer-1", 10)]));
        let map = cache.get("cid-a").unwrap();
        assert_eq!(map.get("peer-1"), Some(&10));
    }

    #[test]
    fn eviction_respects_capacity() {
        let mut cache = CacheTier::new(2);
        cache.put("a".into(), peer_map(&[]));
        cache.put("b".into(), peer_map(&[]));
        cache.put("c".into(), peer_map(&[]));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn get_refreshes_recency() {
        let mut cache = CacheTier::new(2);
        cache.put("a".into(), peer_map(&[]));
        cache.put("b".into(), peer_map(&[]));
        // touch "a" so "b" becomes the LRU victim
        let _ = cache.get("a");
        cache.put("c".into(), peer_map(&[]));
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn remove_drops_entry() {
        let mut cache = CacheTier::new(4);
        cache.put("a".into(), peer_map(&[]));
        cache.remove("a");
        assert!(cache.get("a").is_none());
    }
}
