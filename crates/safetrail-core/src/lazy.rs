//! Once-guarded construction of the process's ledger.
//!
//! The startup routine owns a `LazyLedger` and hands `get()` results to
//! request handlers.  The first call opens the ledger; concurrent first
//! calls wait on the same mutex, so initialization runs exactly once.  A
//! failed open caches nothing and the next `get()` tries again.

use std::sync::{Arc, Mutex};

use safetrail_contracts::error::{LedgerError, LedgerResult};

use crate::ledger::HashChainLedger;

pub struct LazyLedger<F>
where
    F: Fn() -> LedgerResult<HashChainLedger> + Send + Sync,
{
    open: F,
    slot: Mutex<Option<Arc<HashChainLedger>>>,
}

impl<F> LazyLedger<F>
where
    F: Fn() -> LedgerResult<HashChainLedger> + Send + Sync,
{
    /// Wrap `open`, which will be called at most once on success.
    pub fn new(open: F) -> Self {
        Self {
            open,
            slot: Mutex::new(None),
        }
    }

    /// The shared ledger, opening it on first use.
    pub fn get(&self) -> LedgerResult<Arc<HashChainLedger>> {
        let mut slot = self.slot.lock().map_err(|e| LedgerError::Initialization {
            reason: format!("ledger slot lock poisoned: {}", e),
        })?;

        if let Some(ledger) = slot.as_ref() {
            return Ok(Arc::clone(ledger));
        }

        let ledger = Arc::new((self.open)()?);
        *slot = Some(Arc::clone(&ledger));
        Ok(ledger)
    }

    pub fn is_initialized(&self) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }
}
