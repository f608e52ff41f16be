//! # safetrail-kyc
//!
//! The KYC side of SafeTrail's ledger integration.
//!
//! - [`KycRegistrar::register`]: turn a fresh KYC submission into a ledger
//!   block and the "blockchain ID" the submission is stored under.
//! - [`KycRegistrar::backfill`]: register existing KYC records in bulk
//!   using their tour dates.
//!
//! Input validation beyond "is there an identity number" belongs to the
//! submission endpoint, not here.

pub mod backfill;
pub mod error;
pub mod identity;
pub mod registrar;

pub use backfill::{BackfillEntry, BackfillReport, KycRecord, TourDates};
pub use error::{KycError, KycResult};
pub use identity::IdentityDocument;
pub use registrar::{validity_end, KycRegistrar, Registration, DEFAULT_VALIDITY_DAYS};

// ── Tests ─────────────────────────────────────────────────────────────────────
