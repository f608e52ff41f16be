//! Identity documents submitted with a KYC request.

use serde::{Deserialize, Serialize};

use safetrail_contracts::block::VerificationType;

/// The identity numbers a tourist supplied.  At least one is needed to
/// register on the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityDocument {
    #[serde(default)]
    pub aadhar_number: Option<String>,
    #[serde(default)]
    pub passport_number: Option<String>,
}

impl IdentityDocument {
    pub fn aadhar(number: impl Into<String>) -> Self {
        Self {
            aadhar_number: Some(number.into()),
            passport_number: None,
        }
    }

    pub fn passport(number: impl Into<String>) -> Self {
        Self {
            aadhar_number: None,
            passport_number: Some(number.into()),
        }
    }

    /// The secret to hash into the block and the matching verification type.
    ///
    /// Aadhaar wins when both numbers are present.  Blank numbers count as
    /// absent.  The number is returned exactly as submitted so the hash
    /// matches blocks registered before this crate existed.
    pub fn identity(&self) -> Option<(&str, VerificationType)> {
        fn present(number: &Option<String>) -> Option<&str> {
            number.as_deref().filter(|n| !n.trim().is_empty())
        }

        present(&self.aadhar_number)
            .map(|n| (n, VerificationType::Aadhar))
            .or_else(|| present(&self.passport_number).map(|n| (n, VerificationType::Passport)))
    }
}
