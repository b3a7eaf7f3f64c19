//! Persisted fingerprint → class identity cache.
//!
//! The file is a flat JSON object, pretty-printed:
//!
//! ```json
//! {
//!   "3f9c...": { "classHash": "0x...", "compiledClassHash": "0x..." }
//! }
//! ```
//!
//! Entries are content facts, so they are never overwritten and survive ledger resets.
//! Several processes may share the file; there is no locking, and a concurrent rewrite can
//! drop a recent entry, which only costs a recomputation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::Fingerprint;
use crate::artifacts::ClassIdentity;
use crate::error::{HarnessError, Result};

pub struct ClassHashCache {
    path: PathBuf,
    entries: BTreeMap<Fingerprint, ClassIdentity>,
}

impl ClassHashCache {
    /// Creates an empty cache backed by `path`. Nothing is read until [`Self::load_if_empty`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<ClassIdentity> {
        self.entries.get(fingerprint).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Fingerprint, &ClassIdentity)> {
        self.entries.iter()
    }

    /// Loads the whole file if nothing is in memory yet, creating `{}` when it is absent.
    pub async fn load_if_empty(&mut self) -> Result<()> {
        if !self.entries.is_empty() {
            return Ok(());
        }

        if !tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| HarnessError::cache_io(&self.path, e))?
        {
            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| HarnessError::cache_io(&self.path, e))?;
            }
            tokio::fs::write(&self.path, "{}")
                .await
                .map_err(|e| HarnessError::cache_io(&self.path, e))?;
            tracing::debug!(
                target: "starknet_harness::cache",
                "Created empty class hash cache at {}",
                self.path.display()
            );
            return Ok(());
        }

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| HarnessError::cache_io(&self.path, e))?;
        self.entries =
            serde_json::from_slice(&bytes).map_err(|e| HarnessError::cache_io(&self.path, e))?;

        tracing::debug!(
            target: "starknet_harness::cache",
            "Loaded {} class hash(es) from {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Adds an entry and rewrites the file. An existing entry is kept as is.
    ///
    /// The in-memory entry is recorded even when the write fails.
    pub async fn put(&mut self, fingerprint: Fingerprint, identity: ClassIdentity) -> Result<()> {
        if self.entries.contains_key(&fingerprint) {
            return Ok(());
        }
        self.entries.insert(fingerprint, identity);
        self.flush().await
    }

    /// Rewrites the whole file from memory.
    pub async fn flush(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.entries)
            .map_err(|e| HarnessError::cache_io(&self.path, e))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| HarnessError::cache_io(&self.path, e))
    }
}
