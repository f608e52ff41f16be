use thiserror::Error;

use safetrail_contracts::error::LedgerError;

#[derive(Debug, Error)]
pub enum KycError {
    /// Neither an Aadhaar nor a passport number was supplied.
    #[error("either an Aadhaar or a passport number is required")]
    MissingIdentity,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub type KycResult<T> = Result<T, KycError>;
