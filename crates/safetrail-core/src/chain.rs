//! Hash-chain primitives: block hashing and linkage verification.
//!
//! A block's content hash is SHA-256 over the compact JSON encoding of this
//! object, keys in exactly this order:
//!
//! ```text
//! {"docHash":"","tripId":…,"validFrom":…,"validUntil":…,
//!  "verificationType":…,"timestamp":…,"previousHash":…,"identityNumber":…}
//! ```
//!
//! `docHash` is always the empty string and dates use millisecond ISO-8601
//! (`2025-01-01T00:00:00.000Z`).  The identity secret appears only in the
//! preimage, never in the stored block.

use serde::Serialize;
use sha2::{Digest, Sha256};

use safetrail_contracts::{
    block::{Block, VerificationType},
    time::iso_millis,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashPreimage<'a> {
    doc_hash: &'a str,
    trip_id: &'a str,
    valid_from: String,
    valid_until: String,
    verification_type: VerificationType,
    timestamp: i64,
    previous_hash: &'a str,
    identity_number: &'a str,
}

/// The exact bytes that are fed into SHA-256 for `block`.
///
/// `block.content_hash` is ignored.
///
/// # Panics
///
/// Panics if the preimage cannot be serialized to JSON, which cannot happen
/// for a struct of strings and integers.
pub fn hash_preimage(block: &Block, identity_secret: &str) -> Vec<u8> {
    let preimage = HashPreimage {
        doc_hash: "",
        trip_id: &block.trip_id,
        valid_from: iso_millis::format(&block.valid_from),
        valid_until: iso_millis::format(&block.valid_until),
        verification_type: block.verification_type,
        timestamp: block.timestamp,
        previous_hash: &block.previous_hash,
        identity_number: identity_secret,
    };
    serde_json::to_vec(&preimage).expect("hash preimage must always be serializable to JSON")
}

/// Compute the content hash of `block` bound to `identity_secret`.
///
/// Returns a lowercase 64-character hex string.
pub fn hash_block(block: &Block, identity_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(hash_preimage(block, identity_secret));
    hex::encode(hasher.finalize())
}

/// True iff recomputing `block`'s hash with `identity_secret` reproduces
/// its stored `content_hash`.
pub fn block_matches_secret(block: &Block, identity_secret: &str) -> bool {
    hash_block(block, identity_secret) == block.content_hash
}

/// Index of the first block whose `previous_hash` does not match its
/// predecessor's `content_hash`, or `None` when every link holds.
pub fn first_broken_link(blocks: &[Block]) -> Option<usize> {
    blocks
        .windows(2)
        .position(|pair| pair[1].previous_hash != pair[0].content_hash)
        .map(|i| i + 1)
}

/// Check linkage continuity of a chain.
///
/// Empty and single-block chains are valid.  Content hashes are NOT
/// recomputed: that needs each block's identity secret, which is never
/// stored.  Use `block_matches_secret` when the secret is at hand.
pub fn verify_chain(blocks: &[Block]) -> bool {
    first_broken_link(blocks).is_none()
}
