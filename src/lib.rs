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

//! Provider registry for a content-addressed peer-to-peer overlay.
//!
//! This crate provides:
//! - A two-tier provider store: a durable key-value backend fronted by a
//!   bounded in-memory LRU cache.
//! - A serialization discipline (a single-slot async work queue) that keeps
//!   the two tiers consistent under concurrent mutation.
//! - A periodic sweeper that expires stale provider records without
//!   blocking foreground reads or writes.
//! - The key/value encoding used on the backend, and a `sled`-backed
//!   `Datastore` implementation.
//!
//! The content-identifier and peer-identifier formats, network-level
//! provider discovery, and cryptographic verification of claims are treated
//! as external collaborators and are out of scope for this crate.

/// Backend value encoding: timestamp varints and text-form id canonicalization.
pub mod codec;

/// Backend key composition and parsing.
pub mod key_builder;

/// The bounded in-memory cache tier.
pub mod cache;

/// The `Datastore` contract and its `sled`-backed implementation.
pub mod backend;

/// The single-slot serializer that totally orders state-touching operations.
pub mod serializer;

/// Clock and timer injection points, used by the sweeper and exercised by tests.
pub mod time_source;

/// The periodic expiry sweep.
pub mod sweeper;

/// The public registry façade.
pub mod registry;

/// File-based configuration loading.
pub mod config;

/// Prometheus metrics.
pub mod metrics;

pub use backend::{BackendError, Datastore};
pub use codec::{CodecError, ContentId};
pub use config::RegistryConfig;
pub use key_builder::KeyError;
pub use registry::{Registry, RegistryError};

pub use libp2p::PeerId;
