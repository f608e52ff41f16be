//! Status snapshot reported by the ledger.

use serde::{Deserialize, Serialize};

/// A point-in-time summary of the chain.
///
/// `last_hash` is the ledger's cached head, not a value re-read from disk;
/// `is_valid` is the result of a linkage check over the stored chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainState {
    pub total_blocks: usize,
    pub last_hash: String,
    pub is_valid: bool,
}
