//! The JSON-lines chain file: one block per line, appended in place.
//!
//! Appends cost O(1) instead of rewriting the whole chain.  A reader that
//! races an append may see the new line without its terminating newline;
//! `load` drops such an unterminated tail.  At `initialize` time nothing is
//! in flight, so an unterminated tail means a torn write and is reported as
//! corruption, and `append` refuses to write behind it.  A failed append
//! truncates the file back to its previous length.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use safetrail_contracts::{
    block::Block,
    error::{LedgerError, LedgerResult},
};
use safetrail_core::traits::ChainStore;

use crate::fs_util::{ensure_parent_dir, read_if_exists, sync_parent_dir};

#[derive(Debug, Clone)]
pub struct JsonLinesStore {
    path: PathBuf,
}

impl JsonLinesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse complete lines.  Returns the blocks and whether an
    /// unterminated tail was skipped.
    fn parse(&self, contents: &str) -> Result<(Vec<Block>, bool), String> {
        let (complete, tail) = match contents.rfind('\n') {
            Some(end) => contents.split_at(end + 1),
            None => ("", contents),
        };

        let mut blocks = Vec::new();
        for (index, line) in complete.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let block = serde_json::from_str(line).map_err(|e| {
                format!(
                    "chain file '{}' is corrupt at line {}: {}",
                    self.path.display(),
                    index + 1,
                    e
                )
            })?;
            blocks.push(block);
        }

        Ok((blocks, !tail.trim().is_empty()))
    }
}

impl ChainStore for JsonLinesStore {
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
            Some(contents) => {
                let (blocks, torn) = self
                    .parse(&contents)
                    .map_err(|reason| LedgerError::Initialization { reason })?;
                if torn {
                    return Err(LedgerError::Initialization {
                        reason: format!(
                            "chain file '{}' ends with an incomplete record",
                            self.path.display()
                        ),
                    });
                }
                Ok(blocks)
            }
            None => {
                File::create(&self.path)
                    .and_then(|file| file.sync_all())
                    .and_then(|()| sync_parent_dir(&self.path))
                    .map_err(|e| LedgerError::Initialization {
                        reason: format!("failed to create '{}': {}", self.path.display(), e),
                    })?;
                info!(path = %self.path.display(), "created empty chain log");
                Ok(Vec::new())
            }
        }
    }

    fn load(&self) -> LedgerResult<Vec<Block>> {
        let contents = fs::read_to_string(&self.path).map_err(|e| LedgerError::Persistence {
            reason: format!("failed to read '{}': {}", self.path.display(), e),
        })?;
        let (blocks, torn) = self
            .parse(&contents)
            .map_err(|reason| LedgerError::Persistence { reason })?;
        if torn {
            warn!(path = %self.path.display(), "skipping unterminated trailing record");
        }
        Ok(blocks)
    }

    fn append(&self, block: &Block) -> LedgerResult<()> {
        let mut line = serde_json::to_string(block).map_err(|e| LedgerError::Persistence {
            reason: format!("failed to serialize block: {}", e),
        })?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LedgerError::Persistence {
                reason: format!("failed to open '{}': {}", self.path.display(), e),
            })?;

        let original_len = file.metadata().map(|m| m.len()).map_err(|e| LedgerError::Persistence {
            reason: format!("failed to stat '{}': {}", self.path.display(), e),
        })?;
        if !ends_with_newline(&mut file, original_len).map_err(|e| LedgerError::Persistence {
            reason: format!("failed to read '{}': {}", self.path.display(), e),
        })? {
            return Err(LedgerError::Persistence {
                reason: format!(
                    "chain file '{}' ends with an incomplete record; refusing to append",
                    self.path.display()
                ),
            });
        }

        if let Err(e) = file.write_all(line.as_bytes()).and_then(|()| file.sync_data()) {
            // Cut off whatever part of the line made it to disk.
            if let Err(truncate) = file.set_len(original_len).and_then(|()| file.sync_data()) {
                warn!(
                    path = %self.path.display(),
                    error = %truncate,
                    "failed to roll back partial append"
                );
            }
            return Err(LedgerError::Persistence {
                reason: format!("failed to append to '{}': {}", self.path.display(), e),
            });
        }

        debug!(path = %self.path.display(), content_hash = %block.content_hash, "block line appended");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// True when the file is empty or its last byte is a newline.
fn ends_with_newline(file: &mut File, len: u64) -> io::Result<bool> {
    if len == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
