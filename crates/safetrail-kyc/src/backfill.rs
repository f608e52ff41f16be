//! Batch registration of KYC records that predate the ledger.
//!
//! Each record with an identity number is registered using its tour dates
//! as the validity window.  Records without one are skipped; a ledger error
//! on one record is logged and the batch moves on.  The run ends with a
//! linkage check over the whole chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{
    error::KycResult,
    identity::IdentityDocument,
    registrar::KycRegistrar,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourDates {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// An existing KYC record, as exported from the application database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycRecord {
    pub name: String,
    #[serde(flatten)]
    pub identity: IdentityDocument,
    pub tour_dates: TourDates,
}

/// One successfully registered record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillEntry {
    pub name: String,
    pub blockchain_id: String,
    pub trip_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    pub total: usize,
    pub registered: Vec<BackfillEntry>,
    pub skipped: usize,
    pub failed: usize,
    pub chain_valid: bool,
}

impl KycRegistrar {
    /// Register every record in `records`, in order.
    ///
    /// Only the final chain verification can fail the whole run.
    pub fn backfill(&self, records: &[KycRecord]) -> KycResult<BackfillReport> {
        let mut report = BackfillReport {
            total: records.len(),
            ..BackfillReport::default()
        };

        for record in records {
            if record.identity.identity().is_none() {
                warn!(name = %record.name, "skipping record without an identity number");
                report.skipped += 1;
                continue;
            }

            match self.register_window(
                &record.identity,
                record.tour_dates.start_date,
                record.tour_dates.end_date,
            ) {
                Ok(registration) => report.registered.push(BackfillEntry {
                    name: record.name.clone(),
                    blockchain_id: registration.blockchain_id,
                    trip_id: registration.block.trip_id,
                }),
                Err(e) => {
                    error!(name = %record.name, error = %e, "failed to register record");
                    report.failed += 1;
                }
            }
        }

        report.chain_valid = self.ledger().verify_chain()?;

        info!(
            total = report.total,
            registered = report.registered.len(),
            skipped = report.skipped,
            failed = report.failed,
            chain_valid = report.chain_valid,
            "backfill complete"
        );
        Ok(report)
    }
}
