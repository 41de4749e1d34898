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

//! Composition and parsing of the structured backend keys
//! `/providers/<cid-text>/<peer-text>`.

use crate::codec::{cid_text, peer_text, ContentId};
use libp2p::PeerId;
use thiserror::Error;

/// Key parsing errors.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The key did not split into the expected `/`-delimited segments.
    #[error("malformed key")]
    MalformedKey,
}

/// The fixed prefix under which every provider record lives.
pub const PROVIDER_PREFIX: &str = "/providers";

/// Prefix under which all records for a single content-id live.
pub fn cid_prefix(cid: &ContentId) -> String {
    format!("{}/{}", PROVIDER_PREFIX, cid_text(cid))
}

/// The full backend key for a single `(cid, peer)` record.
pub fn record_key(cid: &ContentId, peer: &PeerId) -> String {
    format!("{}/{}", cid_prefix(cid), peer_text(peer))
}

/// Parse a backend key back into its `(cid_text, peer_text)` components.
///
/// Exactly four `/`-delimited segments are accepted (including the leading
/// empty one from the leading `/`): `""`, `"providers"`, `<cid-text>`,
/// `<peer-text>`. Keys that don't match this shape are rejected rather than
/// normalized.
pub fn parse_key(key: &str) -> Result<(String, String), KeyError> {
    let parts: Vec<&str> = key.split('/').collect();
    if parts.len() != 4 || !parts[0].is_empty() || parts[1] != "providers" {
        return Err(KeyError::MalformedKey);
    }
    if parts[2].is_empty() || parts[3].is_empty() {
        return Err(KeyError::MalformedKey);
    }
    Ok((parts[2].to_string(), parts[3].to_string()))
}
