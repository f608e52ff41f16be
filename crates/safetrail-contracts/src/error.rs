//! Error types for the SafeTrail ledger.
//!
//! Every fallible ledger operation returns `LedgerResult<T>`.  Nothing is
//! swallowed or retried inside the ledger; the caller decides what to tell
//! the user.

use thiserror::Error;

/// The unified error type for ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The storage location is unusable: the directory cannot be created, or
    /// a chain file exists but cannot be read or parsed.
    ///
    /// Fatal.  A corrupt file is never replaced with an empty chain.
    #[error("ledger initialization failed: {reason}")]
    Initialization { reason: String },

    /// Reading or writing the chain failed after initialization.
    ///
    /// The cached head hash is not advanced when an append fails.
    #[error("ledger persistence failed: {reason}")]
    Persistence { reason: String },

    /// A configuration file is missing, unreadable or malformed.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

/// Convenience alias used throughout the SafeTrail crates.
pub type LedgerResult<T> = Result<T, LedgerError>;
