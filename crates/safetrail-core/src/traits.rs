//! Seams between the ledger and the outside world.
//!
//! - `ChainStore`: durable storage for the ordered block sequence
//! - `Clock`: source of block creation time
//!
//! `HashChainLedger` owns one of each.  It never touches the filesystem or
//! the system clock directly.

use chrono::{DateTime, Utc};

use safetrail_contracts::{block::Block, error::LedgerResult};

/// Durable storage for the chain.
///
/// A store is owned by exactly one ledger; no other component writes to it.
/// Implementations do not need internal locking around `append` because
/// the ledger serializes appends, but `load` may be called concurrently with
/// an `append` and must never observe a partially written chain.
pub trait ChainStore: Send + Sync {
    /// Prepare the storage location and return the persisted chain.
    ///
    /// Creates missing parent directories and an empty chain when nothing
    /// has been persisted yet.  An existing but unreadable or unparsable
    /// chain is `LedgerError::Initialization`; it is never replaced.
    fn initialize(&self) -> LedgerResult<Vec<Block>>;

    /// Read the full chain in append order.
    ///
    /// Failures are `LedgerError::Persistence`.
    fn load(&self) -> LedgerResult<Vec<Block>>;

    /// Durably add `block` to the end of the chain.
    ///
    /// Must not return `Ok` until the block would survive a crash.
    /// Failures are `LedgerError::Persistence` and leave the stored chain
    /// as it was.
    fn append(&self, block: &Block) -> LedgerResult<()>;

    /// Human-readable location used in log lines.
    fn location(&self) -> String;
}

/// Source of the current time for new blocks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time in UTC.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
