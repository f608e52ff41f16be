//! The hash-chain ledger service.
//!
//! `HashChainLedger` is constructed once by the process's startup routine
//! and shared behind an `Arc`.  Construction runs initialization; there is
//! no separate `initialize()` to forget to call.
//!
//! Appends are serialized by the `head` mutex, which is held across the
//! whole read-chain → hash → write-chain → advance-head sequence.  Two
//! concurrent registrations therefore always produce two linked blocks,
//! never a lost update.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use safetrail_contracts::{
    block::{Block, VerificationType},
    error::{LedgerError, LedgerResult},
    state::ChainState,
};

use crate::{
    chain::{block_matches_secret, first_broken_link, hash_block},
    traits::{ChainStore, Clock, SystemClock},
};

/// A durable, tamper-evident, append-only log of tourist verifications.
pub struct HashChainLedger {
    store: Box<dyn ChainStore>,
    clock: Box<dyn Clock>,
    /// Cached `content_hash` of the newest block, or `Block::GENESIS_HASH`.
    head: Mutex<String>,
}

impl HashChainLedger {
    /// Open the ledger over `store`, using wall-clock time for new blocks.
    pub fn open(store: Box<dyn ChainStore>) -> LedgerResult<Self> {
        Self::open_with_clock(store, Box::new(SystemClock))
    }

    /// Open the ledger over `store` with an explicit clock.
    ///
    /// Initializes the store and restores the cached head from the last
    /// persisted block.  Returns `LedgerError::Initialization` when the
    /// storage location is unusable.
    pub fn open_with_clock(store: Box<dyn ChainStore>, clock: Box<dyn Clock>) -> LedgerResult<Self> {
        let chain = store.initialize()?;
        let head = chain
            .last()
            .map(|block| block.content_hash.clone())
            .unwrap_or_else(|| Block::GENESIS_HASH.to_string());

        info!(
            location = %store.location(),
            total_blocks = chain.len(),
            last_hash = %head,
            "ledger initialized"
        );

        Ok(Self {
            store,
            clock,
            head: Mutex::new(head),
        })
    }

    /// Append a verification block for one tourist.
    ///
    /// `identity_secret` is mixed into the content hash and then dropped; it
    /// is never stored.  On any persistence failure the cached head stays
    /// where it was, so the next append links to the last block that
    /// actually reached storage.
    pub fn register_tourist(
        &self,
        identity_secret: &str,
        trip_id: impl Into<String>,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
        verification_type: VerificationType,
    ) -> LedgerResult<Block> {
        let mut head = self.lock_head()?;

        let mut block = Block {
            content_hash: String::new(),
            trip_id: trip_id.into(),
            valid_from,
            valid_until,
            verification_type,
            timestamp: self.clock.now().timestamp_millis(),
            previous_hash: head.clone(),
        };
        block.content_hash = hash_block(&block, identity_secret);

        self.store.append(&block)?;
        *head = block.content_hash.clone();

        info!(
            trip_id = %block.trip_id,
            verification_type = %block.verification_type,
            content_hash = %block.content_hash,
            previous_hash = %block.previous_hash,
            "block appended"
        );

        Ok(block)
    }

    /// Check that every stored block links to its predecessor.
    ///
    /// Linkage only; see `chain::verify_chain` for why hashes are not
    /// recomputed.
    pub fn verify_chain(&self) -> LedgerResult<bool> {
        let chain = self.store.load()?;
        Ok(check_linkage(&chain))
    }

    /// Block count, cached head and linkage validity in one snapshot.
    ///
    /// Holds the append lock while reading so the count and the cached head
    /// describe the same chain.
    pub fn chain_state(&self) -> LedgerResult<ChainState> {
        let head = self.lock_head()?;
        let chain = self.store.load()?;
        Ok(ChainState {
            total_blocks: chain.len(),
            last_hash: head.clone(),
            is_valid: check_linkage(&chain),
        })
    }

    /// The cached `content_hash` of the newest block.
    pub fn last_hash(&self) -> LedgerResult<String> {
        Ok(self.lock_head()?.clone())
    }

    /// Every stored block in append order.
    pub fn blocks(&self) -> LedgerResult<Vec<Block>> {
        self.store.load()
    }

    /// Look up a block by its content hash ("blockchain ID").
    pub fn find_block(&self, content_hash: &str) -> LedgerResult<Option<Block>> {
        let chain = self.store.load()?;
        Ok(chain.into_iter().find(|block| block.content_hash == content_hash))
    }

    /// True iff the block `content_hash` exists and was produced with
    /// `identity_secret`.
    pub fn recognize(&self, content_hash: &str, identity_secret: &str) -> LedgerResult<bool> {
        let recognized = self
            .find_block(content_hash)?
            .map(|block| block_matches_secret(&block, identity_secret))
            .unwrap_or(false);
        debug!(content_hash = %content_hash, recognized, "recognition check");
        Ok(recognized)
    }

    /// Where the chain is stored, for status output.
    pub fn location(&self) -> String {
        self.store.location()
    }

    fn lock_head(&self) -> LedgerResult<MutexGuard<'_, String>> {
        self.head.lock().map_err(|e| LedgerError::Persistence {
            reason: format!("ledger head lock poisoned: {}", e),
        })
    }
}

fn check_linkage(chain: &[Block]) -> bool {
    match first_broken_link(chain) {
        None => {
            debug!(total_blocks = chain.len(), "chain linkage verified");
            true
        }
        Some(index) => {
            warn!(
                index,
                previous_hash = %chain[index].previous_hash,
                expected = %chain[index - 1].content_hash,
                "chain linkage broken"
            );
            false
        }
    }
}
