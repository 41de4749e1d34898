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

//! The `Datastore` contract the registry depends on, and a concrete
//! `sled`-backed implementation.
//!
//! The durable key-value backend is, per the registry's design, an external
//! collaborator specified only as a capability-set: `put`, a prefix scan,
//! and an atomically-committed batch of deletes. This module defines that
//! contract as a trait so alternative backends can be substituted in tests
//! or in a future deployment, and ships the one implementation this crate
//! needs to be runnable.

mod sled_backend;

pub use sled_backend::SledDatastore;

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a backend operation, with the underlying cause attached.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend rejected or failed to perform an I/O operation.
    #[error("backend failure")]
    Io(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BackendError {
    /// Wrap an arbitrary error as a backend I/O failure.
    pub fn io(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        BackendError::Io(Box::new(err))
    }
}

/// A single backend key/value pair observed during a prefix scan.
pub type ScanEntry = (String, Vec<u8>);

/// The durable key-value backend the registry reads through and writes to.
///
/// Implementations must be linearizable for single-key `put`/`get`
/// operations, and must make `batch_delete` atomic: either every staged key
/// is removed, or none are (on failure, no partial batch is committed).
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Write a single key/value pair.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), BackendError>;

    /// Collect every key/value pair whose key starts with `prefix`.
    ///
    /// The registry only ever needs the full set for a given scan (a
    /// prefix-scoped reconciliation or the full `/providers` sweep), so this
    /// returns a materialized list rather than a streaming iterator; the
    /// atomicity and ordering guarantees the registry depends on are
    /// unaffected by that simplification.
    async fn query_prefix(&self, prefix: &str) -> Result<Vec<ScanEntry>, BackendError>;

    /// Atomically delete every key in `keys`. A no-op if `keys` is empty.
    async fn batch_delete(&self, keys: Vec<String>) -> Result<(), BackendError>;
}
