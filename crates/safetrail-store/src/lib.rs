//! # safetrail-store
//!
//! `ChainStore` implementations for the SafeTrail ledger.
//!
//! - [`JsonFileStore`]: one JSON array, rewritten atomically per append.
//!   This is the layout the KYC backend has always written.
//! - [`JsonLinesStore`]: one block per line, appended in place.
//! - [`MemoryStore`]: volatile, for tests and dry runs.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use safetrail_core::LedgerConfig;
//! use safetrail_store::open_ledger;
//!
//! let config = LedgerConfig::from_file(Path::new("safetrail.toml"))?;
//! let ledger = open_ledger(&config)?;
//! ```

mod fs_util;

pub mod file;
pub mod lines;
pub mod memory;

pub use file::JsonFileStore;
pub use lines::JsonLinesStore;
pub use memory::MemoryStore;

use safetrail_contracts::error::LedgerResult;
use safetrail_core::{
    config::{LedgerConfig, StoreFormat},
    ledger::HashChainLedger,
    traits::ChainStore,
};

/// Build the store selected by `config`.
pub fn store_for(config: &LedgerConfig) -> Box<dyn ChainStore> {
    match config.format {
        StoreFormat::Json => Box::new(JsonFileStore::new(&config.chain_file)),
        StoreFormat::JsonLines => Box::new(JsonLinesStore::new(&config.chain_file)),
    }
}

/// Open the ledger described by `config` using wall-clock time.
pub fn open_ledger(config: &LedgerConfig) -> LedgerResult<HashChainLedger> {
    HashChainLedger::open(store_for(config))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
