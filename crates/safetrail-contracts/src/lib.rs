//! # safetrail-contracts
//!
//! Shared types and error contracts for the SafeTrail tourist ledger.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate: only data definitions and error types.

pub mod block;
pub mod error;
pub mod state;
pub mod time;

pub use block::{Block, VerificationType};
pub use error::{LedgerError, LedgerResult};
pub use state::ChainState;
