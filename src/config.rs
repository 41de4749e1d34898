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

//! File-based configuration for the registry.
//!
//! ## Format (TOML)
//!
//! ```text
//! cache_size = 256
//! cleanup_interval_ms = 3600000
//! provide_validity_ms = 86400000
//! data_dir = "./data/providers"
//! ```
//!
//! All fields are optional; omitted fields fall back to the defaults in
//! [`RegistryConfig::default`].

use serde::Deserialize;
use thiserror::Error;

use crate::cache::DEFAULT_CACHE_SIZE;

/// One hour, in milliseconds.
pub const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 3_600_000;
/// 24 hours, in milliseconds.
pub const DEFAULT_PROVIDE_VALIDITY_MS: u64 = 86_400_000;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not read the configuration file.
    #[error("read config")]
    Read(#[source] std::io::Error),
    /// Could not parse the configuration file as TOML.
    #[error("parse config")]
    Parse(#[source] toml::de::Error),
}

/// Runtime configuration for the registry.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// LRU capacity in number of CIDs.
    pub cache_size: usize,
    /// Milliseconds between sweep ticks.
    pub cleanup_interval_ms: u64,
    /// Milliseconds after which a record is expired.
    pub provide_validity_ms: u64,
    /// Directory for the `sled` backend, used by the demo binary.
    pub data_dir: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            cleanup_interval_ms: DEFAULT_CLEANUP_INTERVAL_MS,
            provide_validity_ms: DEFAULT_PROVIDE_VALIDITY_MS,
            data_dir: "./data/providers".to_string(),
        }
    }
}

impl RegistryConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// any field the file omits.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        toml::from_str(&raw).map_err(ConfigError::Parse)
    }
}
