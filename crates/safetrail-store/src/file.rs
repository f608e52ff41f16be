//! The JSON-array chain file.
//!
//! The whole chain lives in one pretty-printed JSON array and is rewritten
//! on every append.  A rewrite goes to `<file>.tmp`, is synced, and is then
//! renamed over the chain file, so a concurrent reader sees either the old
//! chain or the new one and never a half-written array.  The directory is
//! synced after the rename so the new chain survives a crash.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use tracing::{debug, info};

use safetrail_contracts::{
    block::Block,
    error::{LedgerError, LedgerResult},
};
use safetrail_core::traits::ChainStore;

use crate::fs_util::{ensure_parent_dir, read_if_exists, sync_parent_dir};

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn parse(&self, contents: &str) -> Result<Vec<Block>, String> {
        serde_json::from_str(contents)
            .map_err(|e| format!("chain file '{}' is corrupt: {}", self.path.display(), e))
    }

    fn write_chain(&self, chain: &[Block]) -> Result<(), String> {
        let bytes = serde_json::to_vec_pretty(chain)
            .map_err(|e| format!("failed to serialize chain: {}", e))?;
        let temp = self.temp_path();

        let mut file = File::create(&temp)
            .map_err(|e| format!("failed to create '{}': {}", temp.display(), e))?;
        file.write_all(&bytes)
            .and_then(|()| file.sync_all())
            .map_err(|e| format!("failed to write '{}': {}", temp.display(), e))?;
        fs::rename(&temp, &self.path).map_err(|e| {
            format!(
                "failed to move '{}' over '{}': {}",
                temp.display(),
                self.path.display(),
                e
            )
        })?;
        sync_parent_dir(&self.path).map_err(|e| {
            format!("failed to sync directory of '{}': {}", self.path.display(), e)
        })?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "chain file rewritten");
        Ok(())
    }
}

impl ChainStore for JsonFileStore {
    fn initialize(&self) -> LedgerResult<Vec<Block>> {
        ensure_parent_dir(&self.path).map_err(|e| LedgerError::Initialization {
            reason: format!(
                "failed to create directory for '{}': {}",
                self.path.display(),
                e
            ),
        })?;

        let existing = read_if_exists(&self.path).map_err(|e| LedgerError::Initialization {
            reason: format!("failed to read '{}': {}", self.path.display(), e),
        })?;

        match existing {
            Some(contents) => self
                .parse(&contents)
                .map_err(|reason| LedgerError::Initialization { reason }),
            None => {
                self.write_chain(&[])
                    .map_err(|reason| LedgerError::Initialization { reason })?;
                info!(path = %self.path.display(), "created empty chain file");
                Ok(Vec::new())
            }
        }
    }

    fn load(&self) -> LedgerResult<Vec<Block>> {
        let contents = fs::read_to_string(&self.path).map_err(|e| LedgerError::Persistence {
            reason: format!("failed to read '{}': {}", self.path.display(), e),
        })?;
        self.parse(&contents)
            .map_err(|reason| LedgerError::Persistence { reason })
    }

    fn append(&self, block: &Block) -> LedgerResult<()> {
        let mut chain = self.load()?;
        chain.push(block.clone());
        self.write_chain(&chain)
            .map_err(|reason| LedgerError::Persistence { reason })
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
