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

//! A single-slot FIFO work queue that totally orders every state-touching
//! registry operation.
//!
//! Every mutating operation and every sweep is submitted as a unit of work
//! through [`Serializer::submit`]; the queue preserves submission order and
//! runs one unit to completion (including any `.await` points inside it)
//! before starting the next. `get_providers` is admitted through the same
//! queue as writes so that reads observe a consistent snapshot relative to
//! concurrent mutation.
//!
//! This is modeled as an async mutex guarding the mutable registry state,
//! held for the full duration of the admitted unit. A lock that were
//! released across an I/O suspension would not give this guarantee — it
//! must be held across awaits, not merely around the synchronous parts of
//! an operation.

use std::future::Future;

use tokio::sync::Mutex;

/// Serializes access to some mutable state `S` behind a single FIFO slot.
pub struct Serializer<S> {
    state: Mutex<S>,
}

impl<S> Serializer<S> {
    /// Construct a serializer guarding `state`.
    pub fn new(state: S) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// Submit a unit of work. `f` receives exclusive access to the guarded
    /// state for as long as its returned future is pending; no other
    /// submitted unit can run concurrently, regardless of how many
    /// `.await` points `f` contains.
    pub async fn submit<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut S) -> Fut,
        Fut: Future<Output = T>,
    {
        let mut guard = self.state.lock().await;
        f(&mut guard).await
    }
}
