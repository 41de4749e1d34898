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

use prometheus::{IntCounter, IntGauge, Registry};
use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A `prometheus` registration call failed (e.g. duplicate metric name).
    #[error("prometheus")]
    Prom,
}

/// Registry metrics container.
#[derive(Clone)]
pub struct Metrics {
    /// Registry.
    pub registry: Registry,

    /// Cache hits on `get_providers`/`add_provider` lookups.
    pub cache_hits_total: IntCounter,
    /// Cache misses that required a backend prefix scan.
    pub cache_misses_total: IntCounter,
    /// CIDs currently resident in the cache.
    pub cache_size: IntGauge,

    /// Completed sweep passes.
    pub sweeps_total: IntCounter,
    /// Provider records deleted across all sweeps.
    pub sweep_deleted_total: IntCounter,
    /// Malformed keys/records skipped during a sweep.
    pub sweep_malformed_total: IntCounter,
    /// Sweeps aborted by a backend failure.
    pub sweep_failures_total: IntCounter,

    /// Backend failures surfaced from `add_provider`/`get_providers`.
    pub backend_failures_total: IntCounter,
}

impl Metrics {
    /// Create and register metrics against a fresh `prometheus::Registry`.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let cache_hits_total =
            IntCounter::new("provider_registry_cache_hits_total", "Cache hits")
                .map_err(|_| MetricsError::Prom)?;
        let cache_misses_total =
            IntCounter::new("provider_registry_cache_misses_total", "Cache misses")
                .map_err(|_| MetricsError::Prom)?;
        let cache_size = IntGauge::new(
            "provider_registry_cache_size",
            "CIDs currently resident in the cache",
        )
        .map_err(|_| MetricsError::Prom)?;

        let sweeps_total =
            IntCounter::new("provider_registry_sweeps_total", "Completed sweep passes")
                .map_err(|_| MetricsError::Prom)?;
        let sweep_deleted_total = IntCounter::new(
            "provider_registry_sweep_deleted_total",
            "Provider records deleted by sweeps",
        )
        .map_err(|_| MetricsError::Prom)?;
        let sweep_malformed_total = IntCounter::new(
            "provider_registry_sweep_malformed_total",
            "Malformed keys/records skipped during a sweep",
        )
        .map_err(|_| MetricsError::Prom)?;
        let sweep_failures_total = IntCounter::new(
            "provider_registry_sweep_failures_total",
            "Sweeps aborted by a backend failure",
        )
        .map_err(|_| MetricsError::Prom)?;

        let backend_failures_total = IntCounter::new(
            "provider_registry_backend_failures_total",
            "Backend failures surfaced to callers",
        )
        .map_err(|_| MetricsError::Prom)?;

        registry
            .register(Box::new(cache_hits_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(cache_misses_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(cache_size.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(sweeps_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(sweep_deleted_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(sweep_malformed_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(sweep_failures_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(backend_failures_total.clone()))
            .map_err(|_| MetricsError::Prom)?;

        Ok(Self {
            registry,
            cache_hits_total,
            cache_misses_total,
            cache_size,
            sweeps_total,
            sweep_deleted_total,
            sweep_malformed_total,
            sweep_failures_total,
            backend_failures_total,
        })
    }
}
