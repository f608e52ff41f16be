//! # safetrail-core
//!
//! The append-only, SHA-256 hash-chained ledger behind SafeTrail's
//! "blockchain IDs".
//!
//! This crate provides:
//! - The `ChainStore` and `Clock` traits
//! - Block hashing and chain linkage verification (`chain`)
//! - `HashChainLedger`, the serialized-append ledger service
//! - `LazyLedger`, a once-guarded accessor for the process's ledger
//! - `LedgerConfig`, the TOML deployment configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use safetrail_core::HashChainLedger;
//! use safetrail_store::JsonFileStore;
//!
//! let ledger = HashChainLedger::open(Box::new(JsonFileStore::new("data/blockchain.json")))?;
//! let block = ledger.register_tourist("A1234567", "TRIP-1", from, until, VerificationType::Passport)?;
//! assert!(ledger.verify_chain()?);
//! ```

pub mod chain;
pub mod config;
pub mod lazy;
pub mod ledger;
pub mod traits;

pub use chain::{block_matches_secret, hash_block, verify_chain};
pub use config::{LedgerConfig, StoreFormat, MAX_VALIDITY_DAYS};
pub use lazy::LazyLedger;
pub use ledger::HashChainLedger;
pub use traits::{ChainStore, Clock, SystemClock};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use chrono::{DateTime, TimeZone, Utc};

    use safetrail_contracts::{
        block::{Block, VerificationType},
        error::{LedgerError, LedgerResult},
    };

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// A store over a shared `Vec` so tests can inspect and tamper with it.
    #[derive(Clone, Default)]
    struct VecStore {
        blocks: Arc<Mutex<Vec<Block>>>,
        fail_appends: Arc<AtomicBool>,
        fail_initialize: bool,
    }

    impl ChainStore for VecStore {
        fn initialize(&self) -> LedgerResult<Vec<Block>> {
            if self.fail_initialize {
                return Err(LedgerError::Initialization {
                    reason: "chain file is corrupt".to_string(),
                });
            }
            self.load()
        }

        fn load(&self) -> LedgerResult<Vec<Block>> {
            Ok(self.blocks.lock().unwrap().clone())
        }

        fn append(&self, block: &Block) -> LedgerResult<()> {
            if self.fail_appends.load(Ordering::SeqCst) {
                return Err(LedgerError::Persistence {
                    reason: "disk full".to_string(),
                });
            }
            // Widen the read-modify-write window to expose unserialized appends.
            let mut chain = self.load()?;
            std::thread::yield_now();
            chain.push(block.clone());
            *self.blocks.lock().unwrap() = chain;
            Ok(())
        }

        fn location(&self) -> String {
            "memory://test".to_string()
        }
    }

    /// A clock that advances one second on every reading.
    struct StepClock {
        next_millis: AtomicI64,
    }

    impl StepClock {
        fn starting_at(start: DateTime<Utc>) -> Self {
            Self {
                next_millis: AtomicI64::new(start.timestamp_millis()),
            }
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let millis = self.next_millis.fetch_add(1_000, Ordering::SeqCst);
            Utc.timestamp_millis_opt(millis).unwrap()
        }
    }

    fn jan_1() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn apr_1() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap()
    }

    fn open(store: &VecStore) -> HashChainLedger {
        HashChainLedger::open_with_clock(
            Box::new(store.clone()),
            Box::new(StepClock::starting_at(jan_1())),
        )
        .unwrap()
    }

    fn register(ledger: &HashChainLedger, secret: &str, trip: &str) -> Block {
        ledger
            .register_tourist(secret, trip, jan_1(), apr_1(), VerificationType::Passport)
            .unwrap()
    }

    fn unhashed_block(timestamp: i64) -> Block {
        Block {
            content_hash: String::new(),
            trip_id: "TRIP-1".to_string(),
            valid_from: jan_1(),
            valid_until: apr_1(),
            verification_type: VerificationType::Passport,
            timestamp,
            previous_hash: Block::GENESIS_HASH.to_string(),
        }
    }

    // ── Hashing ───────────────────────────────────────────────────────────────

    /// The preimage layout is fixed so chains written by the earlier KYC
    /// backend hash identically.
    #[test]
    fn test_hash_preimage_layout() {
        let block = unhashed_block(1_735_689_600_000);
        let preimage = String::from_utf8(chain::hash_preimage(&block, "A1234567")).unwrap();

        assert_eq!(
            preimage,
            format!(
                concat!(
                    r#"{{"docHash":"","tripId":"TRIP-1","#,
                    r#""validFrom":"2025-01-01T00:00:00.000Z","validUntil":"2025-04-01T00:00:00.000Z","#,
                    r#""verificationType":"passport","timestamp":1735689600000,"#,
                    r#""previousHash":"{}","identityNumber":"A1234567"}}"#
                ),
                Block::GENESIS_HASH
            )
        );
    }

    #[test]
    fn test_hash_golden_vector() {
        let block = unhashed_block(1_735_689_600_000);
        assert_eq!(
            hash_block(&block, "A1234567"),
            "0f5f92a7ed967da986d349ee05ca2922796bad10909f24ef38eb1ee67b4cee6c"
        );
    }

    /// Changing only the timestamp changes the hash.
    #[test]
    fn test_hash_sensitive_to_timestamp() {
        let a = hash_block(&unhashed_block(1_000), "A1234567");
        let b = hash_block(&unhashed_block(1_001), "A1234567");
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_sensitive_to_every_field() {
        let base = unhashed_block(1_000);
        let base_hash = hash_block(&base, "A1234567");

        let variants = vec![
            Block { trip_id: "TRIP-2".to_string(), ..base.clone() },
            Block { valid_from: apr_1(), ..base.clone() },
            Block { valid_until: jan_1(), ..base.clone() },
            Block { verification_type: VerificationType::Aadhar, ..base.clone() },
            Block { previous_hash: "1".repeat(64), ..base.clone() },
        ];
        for variant in &variants {
            assert_ne!(hash_block(variant, "A1234567"), base_hash, "variant {:?}", variant);
        }
        assert_ne!(hash_block(&base, "B7654321"), base_hash, "secret must be hashed in");
    }

    #[test]
    fn test_hash_ignores_stored_content_hash() {
        let mut block = unhashed_block(1_000);
        let before = hash_block(&block, "A1234567");
        block.content_hash = before.clone();
        assert_eq!(hash_block(&block, "A1234567"), before);
        assert!(block_matches_secret(&block, "A1234567"));
        assert!(!block_matches_secret(&block, "wrong"));
    }

    // ── Ledger ────────────────────────────────────────────────────────────────

    /// A fresh ledger reports zero blocks and the genesis sentinel.
    #[test]
    fn test_genesis_state() {
        let ledger = open(&VecStore::default());
        let state = ledger.chain_state().unwrap();

        assert_eq!(state.total_blocks, 0);
        assert_eq!(state.last_hash, Block::GENESIS_HASH);
        assert!(state.is_valid);
    }

    #[test]
    fn test_end_to_end_single_registration() {
        let ledger = open(&VecStore::default());
        let block = register(&ledger, "A1234567", "TRIP-1");

        assert_eq!(block.previous_hash, Block::GENESIS_HASH);
        assert_eq!(block.content_hash.len(), 64);
        assert!(block.content_hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(block.timestamp, jan_1().timestamp_millis());

        let state = ledger.chain_state().unwrap();
        assert_eq!(state.total_blocks, 1);
        assert_eq!(state.last_hash, block.content_hash);
        assert!(state.is_valid);
    }

    /// Each block links to the one before it, and the first to genesis.
    #[test]
    fn test_linkage_over_five_blocks() {
        let store = VecStore::default();
        let ledger = open(&store);
        for i in 0..5 {
            register(&ledger, &format!("SECRET-{i}"), &format!("TRIP-{i}"));
        }

        let blocks = ledger.blocks().unwrap();
        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[0].previous_hash, Block::GENESIS_HASH);
        for i in 1..blocks.len() {
            assert_eq!(blocks[i].previous_hash, blocks[i - 1].content_hash, "link {i}");
        }
        assert!(ledger.verify_chain().unwrap());
    }

    #[test]
    fn test_verify_detects_broken_linkage() {
        let store = VecStore::default();
        let ledger = open(&store);
        for i in 0..4 {
            register(&ledger, "A1234567", &format!("TRIP-{i}"));
        }

        store.blocks.lock().unwrap()[2].previous_hash = "f".repeat(64);

        assert!(!ledger.verify_chain().unwrap());
        assert!(!ledger.chain_state().unwrap().is_valid);
    }

    /// Linkage-only verification cannot spot an edited field whose hash was
    /// left alone; recognition with the secret can.
    #[test]
    fn test_content_edit_passes_linkage_but_fails_recognition() {
        let store = VecStore::default();
        let ledger = open(&store);
        let first = register(&ledger, "A1234567", "TRIP-1");
        register(&ledger, "B7654321", "TRIP-2");

        store.blocks.lock().unwrap()[0].trip_id = "TRIP-FORGED".to_string();

        assert!(ledger.verify_chain().unwrap());
        assert!(!ledger.recognize(&first.content_hash, "A1234567").unwrap());
    }

    #[test]
    fn test_single_block_chain_is_valid_regardless_of_previous_hash() {
        let store = VecStore::default();
        let ledger = open(&store);
        register(&ledger, "A1234567", "TRIP-1");
        store.blocks.lock().unwrap()[0].previous_hash = "f".repeat(64);

        assert!(ledger.verify_chain().unwrap());
    }

    #[test]
    fn test_secret_never_stored() {
        let store = VecStore::default();
        let ledger = open(&store);
        register(&ledger, "SECRET-PASSPORT-998877", "TRIP-1");
        register(&ledger, "SECRET-AADHAR-123412341234", "TRIP-2");

        let persisted = serde_json::to_string(&*store.blocks.lock().unwrap()).unwrap();
        assert!(!persisted.contains("SECRET-PASSPORT-998877"));
        assert!(!persisted.contains("SECRET-AADHAR-123412341234"));
    }

    /// A failed write must not advance the cached head.
    #[test]
    fn test_failed_append_leaves_head_unchanged() {
        let store = VecStore::default();
        let ledger = open(&store);
        let first = register(&ledger, "A1234567", "TRIP-1");

        store.fail_appends.store(true, Ordering::SeqCst);
        let err = ledger
            .register_tourist("B7654321", "TRIP-2", jan_1(), apr_1(), VerificationType::Aadhar)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Persistence { .. }), "got {err:?}");
        assert_eq!(ledger.last_hash().unwrap(), first.content_hash);

        store.fail_appends.store(false, Ordering::SeqCst);
        let second = register(&ledger, "B7654321", "TRIP-2");
        assert_eq!(second.previous_hash, first.content_hash);
        assert_eq!(ledger.chain_state().unwrap().total_blocks, 2);
    }

    #[test]
    fn test_reopen_restores_head() {
        let store = VecStore::default();
        let last = {
            let ledger = open(&store);
            register(&ledger, "A1234567", "TRIP-1");
            register(&ledger, "B7654321", "TRIP-2")
        };

        let reopened = open(&store);
        assert_eq!(reopened.last_hash().unwrap(), last.content_hash);

        let next = register(&reopened, "C0000000", "TRIP-3");
        assert_eq!(next.previous_hash, last.content_hash);
    }

    #[test]
    fn test_initialization_error_propagates() {
        let store = VecStore {
            fail_initialize: true,
            ..VecStore::default()
        };
        let result = HashChainLedger::open(Box::new(store));
        assert!(matches!(result, Err(LedgerError::Initialization { .. })));
    }

    #[test]
    fn test_find_and_recognize() {
        let ledger = open(&VecStore::default());
        let block = register(&ledger, "A1234567", "TRIP-1");

        assert_eq!(ledger.find_block(&block.content_hash).unwrap(), Some(block.clone()));
        assert_eq!(ledger.find_block(&"e".repeat(64)).unwrap(), None);

        assert!(ledger.recognize(&block.content_hash, "A1234567").unwrap());
        assert!(!ledger.recognize(&block.content_hash, "A1234568").unwrap());
        assert!(!ledger.recognize(&"e".repeat(64), "A1234567").unwrap());
    }

    /// Two simultaneous registrations must both land, correctly linked.
    #[test]
    fn test_concurrent_appends_are_serialized() {
        let store = VecStore::default();
        let ledger = Arc::new(open(&store));

        std::thread::scope(|scope| {
            for i in 0..2 {
                let ledger = Arc::clone(&ledger);
                scope.spawn(move || register(&ledger, &format!("SECRET-{i}"), &format!("TRIP-{i}")));
            }
        });

        let state = ledger.chain_state().unwrap();
        assert_eq!(state.total_blocks, 2);
        assert!(state.is_valid);
        assert!(ledger.verify_chain().unwrap());
    }

    #[test]
    fn test_many_concurrent_appends() {
        let ledger = Arc::new(open(&VecStore::default()));

        std::thread::scope(|scope| {
            for i in 0..16 {
                let ledger = Arc::clone(&ledger);
                scope.spawn(move || register(&ledger, &format!("SECRET-{i}"), &format!("TRIP-{i}")));
            }
        });

        let blocks = ledger.blocks().unwrap();
        assert_eq!(blocks.len(), 16);
        assert!(verify_chain(&blocks));
        assert_eq!(blocks[0].previous_hash, Block::GENESIS_HASH);
        assert_eq!(ledger.last_hash().unwrap(), blocks[15].content_hash);
    }

    // ── LazyLedger ────────────────────────────────────────────────────────────

    #[test]
    fn test_lazy_ledger_initializes_once() {
        let opens = AtomicUsize::new(0);
        let store = VecStore::default();
        let lazy = LazyLedger::new(|| {
            opens.fetch_add(1, Ordering::SeqCst);
            HashChainLedger::open(Box::new(store.clone()))
        });
        assert!(!lazy.is_initialized());

        let handles: Vec<Arc<HashChainLedger>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8).map(|_| scope.spawn(|| lazy.get().unwrap())).collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert!(lazy.is_initialized());
        for handle in &handles[1..] {
            assert!(Arc::ptr_eq(&handles[0], handle));
        }
    }

    #[test]
    fn test_lazy_ledger_retries_after_failed_open() {
        let attempts = AtomicUsize::new(0);
        let lazy = LazyLedger::new(|| {
            let store = VecStore {
                fail_initialize: attempts.fetch_add(1, Ordering::SeqCst) == 0,
                ..VecStore::default()
            };
            HashChainLedger::open(Box::new(store))
        });

        assert!(matches!(lazy.get(), Err(LedgerError::Initialization { .. })));
        assert!(!lazy.is_initialized());
        assert!(lazy.get().is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    // ── LedgerConfig ──────────────────────────────────────────────────────────

    #[test]
    fn test_config_defaults() {
        let config = LedgerConfig::from_toml_str("").unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.chain_file, std::path::PathBuf::from("data/blockchain.json"));
        assert_eq!(config.format, StoreFormat::Json);
        assert_eq!(config.validity_days, 90);
    }

    #[test]
    fn test_config_overrides() {
        let toml = r#"
            chain_file = "/var/lib/safetrail/chain.jsonl"
            format = "json-lines"
            validity_days = 30
            log_filter = "safetrail_core=debug"
        "#;
        let config = LedgerConfig::from_toml_str(toml).unwrap();

        assert_eq!(config.format, StoreFormat::JsonLines);
        assert_eq!(config.validity_days, 30);
        assert_eq!(config.log_filter, "safetrail_core=debug");
    }

    #[test]
    fn test_config_rejects_bad_input() {
        for toml in [
            "validity_days = 0",
            "validity_days = 36501",
            "validity_days = 100000000",
            "format = \"yaml\"",
            "chain_file = \"\"",
            "chainfile = \"typo.json\"",
            "validity_days = ",
        ] {
            let err = LedgerConfig::from_toml_str(toml).unwrap_err();
            assert!(matches!(err, LedgerError::Config { .. }), "{toml}: {err:?}");
        }
    }

    #[test]
    fn test_shipped_config_parses() {
        let config = LedgerConfig::from_toml_str(include_str!("../../../safetrail.toml")).unwrap();
        assert_eq!(config, LedgerConfig::default());
    }

    #[test]
    fn test_config_accepts_maximum_validity() {
        let config = LedgerConfig::from_toml_str("validity_days = 36500").unwrap();
        assert_eq!(config.validity_days, MAX_VALIDITY_DAYS);
    }

    #[test]
    fn test_config_missing_file() {
        let err = LedgerConfig::from_file(std::path::Path::new("/nonexistent/safetrail.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/safetrail.toml"));
    }
}
