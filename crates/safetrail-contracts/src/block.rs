//! The ledger block and its verification-type tag.
//!
//! A `Block` is immutable once appended.  Its `content_hash` is the
//! externally visible "blockchain ID" handed back to the KYC flow.  The
//! identity secret that went into the hash is never part of this type, so
//! nothing that serializes a `Block` can leak it.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::iso_millis;

/// The identity document a tourist was verified with.
///
/// Serialized in lowercase (`"aadhar"` / `"passport"`), matching the records
/// already stored by the KYC backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationType {
    Aadhar,
    Passport,
}

impl VerificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationType::Aadhar => "aadhar",
            VerificationType::Passport => "passport",
        }
    }
}

impl fmt::Display for VerificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aadhar" | "aadhaar" => Ok(VerificationType::Aadhar),
            "passport" => Ok(VerificationType::Passport),
            other => Err(format!(
                "unknown verification type '{}': expected 'aadhar' or 'passport'",
                other
            )),
        }
    }
}

/// One record in the hash chain.
///
/// On disk the content hash is stored under the key `docHash`; every other
/// field uses its camelCase name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// SHA-256 (hex) over this block's fields plus the identity secret.
    #[serde(rename = "docHash")]
    pub content_hash: String,

    /// Opaque trip identifier supplied by the caller.
    pub trip_id: String,

    /// Start of the validity window.
    #[serde(with = "iso_millis")]
    pub valid_from: DateTime<Utc>,

    /// End of the validity window.
    #[serde(with = "iso_millis")]
    pub valid_until: DateTime<Utc>,

    pub verification_type: VerificationType,

    /// Creation instant in milliseconds since the Unix epoch.
    pub timestamp: i64,

    /// `content_hash` of the preceding block, or `GENESIS_HASH` for the
    /// first block.
    pub previous_hash: String,
}

impl Block {
    /// The `previous_hash` carried by the first block of every chain.
    ///
    /// 64 hex zeros, the same width as a real SHA-256 digest.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";

    /// True when this block claims to be the first in its chain.
    pub fn is_genesis(&self) -> bool {
        self.previous_hash == Self::GENESIS_HASH
    }
}
