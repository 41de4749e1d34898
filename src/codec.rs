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

//! Canonical text encodings for content-ids, peer-ids, and backend timestamps.
//!
//! The content-id and peer-id formats themselves are out of scope for this
//! crate (they are external collaborators per the registry's design); what
//! lives here is only the stable, injective mapping from those opaque
//! identifiers to the text used inside backend keys, plus the timestamp
//! wire format.

use libp2p::PeerId;
use thiserror::Error;

/// Codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A backend value did not decode to a valid timestamp.
    #[error("malformed record")]
    MalformedRecord,
}

/// An opaque content-addressed identifier.
///
/// The registry never inspects the bytes beyond taking their canonical text
/// form; callers are responsible for the actual hashing/multihash scheme.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentId(Vec<u8>);

impl ContentId {
    /// Wrap raw multihash bytes as a content-id.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw bytes of this content-id.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Canonical base-32 multihash text form of a content-id.
///
/// Lower-case RFC4648 base32 without padding, which keeps the text safe to
/// embed directly in a `/`-delimited backend key.
pub fn cid_text(cid: &ContentId) -> String {
    base32::encode(base32::Alphabet::Rfc4648Lower { padding: false }, cid.as_bytes())
}

/// Canonical textual form of a peer-id (base58, `libp2p`'s own encoding).
pub fn peer_text(peer: &PeerId) -> String {
    peer.to_base58()
}

/// Encode a wall-clock millisecond timestamp as an LEB128 unsigned varint.
pub fn encode_timestamp(ms: u64) -> Vec<u8> {
    let mut buf = unsigned_varint::encode::u64_buffer();
    unsigned_varint::encode::u64(ms, &mut buf).to_vec()
}

/// Decode an LEB128 unsigned varint back into a millisecond timestamp.
///
/// Fails with [`CodecError::MalformedRecord`] on truncation, trailing bytes,
/// or an encoded value that overflows `u64`.
pub fn decode_timestamp(bytes: &[u8]) -> Result<u64, CodecError> {
    let (ms, rest) =
        unsigned_varint::decode::u64(bytes).map_err(|_| CodecError::MalformedRecord)?;
    if !rest.is_empty() {
        return Err(CodecError::MalformedRecord);
    }
    Ok(ms)
}
