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

//! `sled`-backed [`Datastore`] implementation.

use async_trait::async_trait;

use super::{BackendError, Datastore, ScanEntry};

/// A `Datastore` backed by an embedded `sled` database.
///
/// Every call runs on a blocking-pool thread via `spawn_blocking`, since
/// `sled`'s API is synchronous; this keeps the suspension points the
/// serializer relies on (see the crate's concurrency notes) real rather
/// than notional.
#[derive(Clone)]
pub struct SledDatastore {
    db: sled::Db,
}

impl SledDatastore {
    /// Open (or create) a `sled` database at `path`.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, BackendError> {
        let db = sled::open(path).map_err(BackendError::io)?;
        Ok(Self { db })
    }
}

#[async_trait]
impl Datastore for SledDatastore {
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), BackendError> {
        let db = self.db.clone();
        let key = key.to_string();
        let value = value.to_vec();
        tokio::task::spawn_blocking(move || db.insert(key.as_bytes(), value))
            .await
            .map_err(BackendError::io)?
            .map_err(BackendError::io)?;
        Ok(())
    }

    async fn query_prefix(&self, prefix: &str) -> Result<Vec<ScanEntry>, BackendError> {
        let db = self.db.clone();
        let prefix = prefix.to_string();
        tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            for item in db.scan_prefix(prefix.as_bytes()) {
                let (k, v) = item.map_err(BackendError::io)?;
                let key = String::from_utf8_lossy(&k).into_owned();
                out.push((key, v.to_vec()));
            }
            Ok(out)
        })
        .await
        .map_err(BackendError::io)?
    }

    async fn batch_delete(&self, keys: Vec<String>) -> Result<(), BackendError> {
        if keys.is_empty() {
            return Ok(());
        }
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let mut batch = sled::Batch::default();
            for key in &keys {
                batch.remove(key.as_bytes());
            }
            db.apply_batch(batch)
        })
        .await
        .map_err(BackendError::io)?
        .map_err(BackendError::io)?;
        Ok(())
    }
}
