//! Volatile chain store.
//!
//! Nothing survives the process.  Used for dry runs and tests.

use std::sync::{Arc, Mutex, MutexGuard};

use safetrail_contracts::{
    block::Block,
    error::{LedgerError, LedgerResult},
};
use safetrail_core::traits::ChainStore;

/// An in-memory store.  Clones share the same chain.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blocks: Arc<Mutex<Vec<Block>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing chain.
    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: Arc::new(Mutex::new(blocks)),
        }
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, Vec<Block>>> {
        self.blocks.lock().map_err(|e| LedgerError::Persistence {
            reason: format!("memory store lock poisoned: {}", e),
        })
    }
}

impl ChainStore for MemoryStore {
    fn initialize(&self) -> LedgerResult<Vec<Block>> {
        self.load()
    }

    fn load(&self) -> LedgerResult<Vec<Block>> {
        Ok(self.lock()?.clone())
    }

    fn append(&self, block: &Block) -> LedgerResult<()> {
        self.lock()?.push(block.clone());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
