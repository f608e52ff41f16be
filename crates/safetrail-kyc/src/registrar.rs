//! Registration of KYC submissions on the ledger.
//!
//! This is the ledger-facing slice of the KYC submission flow: it picks the
//! identity secret, mints a trip id, chooses the validity window and hands
//! the rest to `HashChainLedger::register_tourist`.  Everything else about a
//! submission (name, address, images) stays with the caller's own record.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use safetrail_contracts::{
    block::Block,
    error::{LedgerError, LedgerResult},
};
use safetrail_core::{
    ledger::HashChainLedger,
    traits::{Clock, SystemClock},
};

use crate::{
    error::{KycError, KycResult},
    identity::IdentityDocument,
};

/// Default length of a fresh registration's validity window.
pub const DEFAULT_VALIDITY_DAYS: u32 = 90;

/// What the caller stores alongside its own KYC record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// The block's content hash.
    pub blockchain_id: String,
    pub block: Block,
}

impl From<Block> for Registration {
    fn from(block: Block) -> Self {
        Self {
            blockchain_id: block.content_hash.clone(),
            block,
        }
    }
}

pub struct KycRegistrar {
    ledger: Arc<HashChainLedger>,
    clock: Box<dyn Clock>,
    validity_days: u32,
}

impl KycRegistrar {
    pub fn new(ledger: Arc<HashChainLedger>, validity_days: u32) -> Self {
        Self::with_clock(ledger, validity_days, Box::new(SystemClock))
    }

    pub fn with_clock(ledger: Arc<HashChainLedger>, validity_days: u32, clock: Box<dyn Clock>) -> Self {
        Self {
            ledger,
            clock,
            validity_days,
        }
    }

    pub fn ledger(&self) -> &Arc<HashChainLedger> {
        &self.ledger
    }

    /// Register a new submission valid from now for `validity_days`.
    ///
    /// Returns `KycError::MissingIdentity` without touching the ledger when
    /// the document carries no usable number, and a `Config` ledger error
    /// when the window end is not representable.
    pub fn register(&self, document: &IdentityDocument) -> KycResult<Registration> {
        let now = self.clock.now();
        let valid_until = validity_end(now, self.validity_days)?;
        self.register_window(document, now, valid_until)
    }

    /// Register a submission with an explicit validity window.
    pub fn register_window(
        &self,
        document: &IdentityDocument,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> KycResult<Registration> {
        let (secret, verification_type) = document.identity().ok_or(KycError::MissingIdentity)?;
        let trip_id = self.next_trip_id();

        let block = self.ledger.register_tourist(
            secret,
            trip_id,
            valid_from,
            valid_until,
            verification_type,
        )?;

        info!(
            blockchain_id = %block.content_hash,
            trip_id = %block.trip_id,
            "kyc submission registered"
        );
        Ok(Registration::from(block))
    }

    /// `TRIP-<epoch millis>`.
    pub fn next_trip_id(&self) -> String {
        format!("TRIP-{}", self.clock.now().timestamp_millis())
    }
}

/// `start` plus `days`, or `LedgerError::Config` when the result falls
/// outside the representable date range.
pub fn validity_end(start: DateTime<Utc>, days: u32) -> LedgerResult<DateTime<Utc>> {
    start
        .checked_add_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| LedgerError::Config {
            reason: format!("a validity window of {} days from {} is out of range", days, start),
        })
}
