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

//! Injectable clock and timer, so the sweep scenarios can drive virtual time
//! instead of depending on the host's wall clock and sleep primitive.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

/// A source of wall-clock milliseconds since the Unix epoch.
///
/// A single reading is taken per comparison (e.g. once per sweep pass); the
/// design tolerates small clock skew because `provide_validity_ms` is
/// expected to be large.
pub trait Clock: Send + Sync {
    /// Current wall-clock time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

/// The host's real wall clock.
#[derive(Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A clock whose reading is set by the test driving it, for scenarios that
/// need exact control over "now" (§8 concrete scenarios).
#[derive(Default)]
pub struct ManualClock {
    ms: AtomicU64,
}

impl ManualClock {
    /// Construct a manual clock starting at `now_ms`.
    pub fn new(now_ms: u64) -> Self {
        Self {
            ms: AtomicU64::new(now_ms),
        }
    }

    /// Advance the clock to `now_ms`. Must be monotonically non-decreasing
    /// for callers that rely on the expiry math, though nothing enforces it.
    pub fn set(&self, now_ms: u64) {
        self.ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.ms.load(Ordering::SeqCst)
    }
}

/// A source of periodic sweep ticks.
///
/// The default implementation sleeps on the host's `tokio` timer; tests
/// drive it with `tokio::time::pause`/`advance` under
/// `#[tokio::test(start_paused = true)]` rather than a bespoke fake, since
/// the registry's sweep loop is itself `tokio`-native.
#[async_trait]
pub trait Timer: Send + Sync {
    /// Sleep for `dur`.
    async fn sleep(&self, dur: Duration);
}

/// The host's real timer, backed by `tokio::time::sleep`.
#[derive(Default, Clone, Copy)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    async fn sleep(&self, dur: Duration) {
        tokio::time::sleep(dur).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_reads_back_what_was_set() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now_ms(), 100);
        clock.set(2_000);
        assert_eq!(clock.now_ms(), 2_000);
    }
}
