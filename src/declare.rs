//! Declaration orchestration.
//!
//! [`Declarer`] turns a logical contract name into a declared class hash, skipping every
//! step whose result is already known:
//!
//! 1. Names declared earlier in this process return immediately, without I/O.
//! 2. The artifact is resolved and read, and fingerprinted from the bytes that were read.
//! 3. The fingerprint is looked up in the persisted class hash cache; only unknown artifacts
//!    go through class hash computation.
//! 4. The ledger declares the class if it does not know it yet, and a new declaration is
//!    awaited unless the caller opted out.
//!
//! A ledger reset (devnet restart) invalidates the per-process registry through
//! [`Declarer::clear_class_cache`]. The persisted cache survives: it records content facts
//! that do not depend on ledger state.
//!
//! Concurrent first declarations of the same name share a single in-flight attempt. A
//! failed attempt leaves nothing behind, so the next call starts over.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use starknet::core::types::Felt;
use tokio::sync::{Mutex, OnceCell};

use crate::artifacts::{
    resolve_contract_file, ClassIdentity, ClassIdentityExtractor, ContractArtifact,
};
use crate::cache::{AbiCache, ClassHashCache};
use crate::error::Result;
use crate::ledger::{DeclareRequest, Ledger, ResourceBounds, TransactionDetails};

/// Per-call declaration options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclareOptions {
    /// Wait for a new declaration to be accepted before returning.
    pub wait: bool,
}

impl Default for DeclareOptions {
    fn default() -> Self {
        Self { wait: true }
    }
}

impl DeclareOptions {
    pub fn no_wait() -> Self {
        Self { wait: false }
    }
}

type Slot = Arc<OnceCell<Felt>>;

pub struct Declarer {
    ledger: Arc<dyn Ledger>,
    extractor: Arc<dyn ClassIdentityExtractor>,
    devnet_bounds: ResourceBounds,
    /// Contract name → class hash declared in this session.
    declared: Mutex<HashMap<String, Slot>>,
    class_hashes: Mutex<ClassHashCache>,
    abi_cache: Arc<AbiCache>,
}

impl Declarer {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        extractor: Arc<dyn ClassIdentityExtractor>,
        class_hashes: ClassHashCache,
        abi_cache: Arc<AbiCache>,
    ) -> Self {
        Self {
            ledger,
            extractor,
            devnet_bounds: ResourceBounds::DEVNET,
            declared: Mutex::new(HashMap::new()),
            class_hashes: Mutex::new(class_hashes),
            abi_cache,
        }
    }

    pub fn with_devnet_bounds(mut self, bounds: ResourceBounds) -> Self {
        self.devnet_bounds = bounds;
        self
    }

    pub fn abi_cache(&self) -> Arc<AbiCache> {
        self.abi_cache.clone()
    }

    /// Class hash recorded for `contract_name` in this session, if any.
    pub async fn declared_class(&self, contract_name: &str) -> Option<Felt> {
        let declared = self.declared.lock().await;
        declared
            .get(contract_name)
            .and_then(|slot| slot.get().copied())
    }

    /// Forgets every name declared in this session and returns how many there were.
    ///
    /// Must be called after the ledger is reset, before the next declaration.
    pub async fn clear_class_cache(&self) -> usize {
        let mut declared = self.declared.lock().await;
        let count = declared.len();
        tracing::debug!(
            target: "starknet_harness::declare",
            "Clearing {} declared contract(s)",
            count
        );
        declared.clear();
        count
    }

    /// Declares `contract_name` from `folder` and returns its class hash.
    pub async fn declare(
        &self,
        contract_name: &str,
        folder: &Path,
        options: DeclareOptions,
    ) -> Result<Felt> {
        let slot = {
            let mut declared = self.declared.lock().await;
            declared.entry(contract_name.to_string()).or_default().clone()
        };

        if let Some(class_hash) = slot.get() {
            return Ok(*class_hash);
        }

        match slot
            .get_or_try_init(|| self.declare_uncached(contract_name, folder, options))
            .await
        {
            Ok(class_hash) => Ok(*class_hash),
            Err(e) => {
                self.release_slot(contract_name, &slot).await;
                Err(e)
            }
        }
    }

    /// Drops the registry entry of a failed attempt. The entry stays while another caller
    /// still holds it, or once it was replaced or filled.
    async fn release_slot(&self, contract_name: &str, slot: &Slot) {
        let mut declared = self.declared.lock().await;
        // Held by the registry and by this caller only.
        let stale = declared.get(contract_name).is_some_and(|current| {
            Arc::ptr_eq(current, slot) && Arc::strong_count(current) == 2 && !current.initialized()
        });
        if stale {
            declared.remove(contract_name);
        }
    }

    async fn declare_uncached(
        &self,
        contract_name: &str,
        folder: &Path,
        options: DeclareOptions,
    ) -> Result<Felt> {
        let path = resolve_contract_file(contract_name, folder).await?;
        let artifact = ContractArtifact::load(&path).await?;

        let details = if self.ledger.is_devnet() {
            TransactionDetails::devnet(self.devnet_bounds)
        } else {
            TransactionDetails::estimated()
        };

        let identity = self.class_identity(contract_name, &artifact).await?;

        let outcome = self
            .ledger
            .declare_if_absent(DeclareRequest {
                artifact: &artifact,
                identity,
                details,
            })
            .await?;

        match outcome.transaction_hash {
            Some(transaction_hash) if options.wait => {
                self.ledger.wait_for_transaction(transaction_hash).await?;
                tracing::info!(
                    target: "starknet_harness::declare",
                    "{} declared ({:#x})",
                    contract_name,
                    outcome.class_hash
                );
            }
            Some(transaction_hash) => {
                tracing::info!(
                    target: "starknet_harness::declare",
                    "{} declaration sent in {:#x}",
                    contract_name,
                    transaction_hash
                );
            }
            None => {
                tracing::debug!(
                    target: "starknet_harness::declare",
                    "{} already declared ({:#x})",
                    contract_name,
                    outcome.class_hash
                );
            }
        }

        self.abi_cache
            .insert(outcome.class_hash, artifact.abi())
            .await;
        Ok(outcome.class_hash)
    }

    /// Looks the artifact up in the persisted cache, computing and recording its identity
    /// on a miss. Cache failures only cost a recomputation.
    async fn class_identity(
        &self,
        contract_name: &str,
        artifact: &ContractArtifact,
    ) -> Result<ClassIdentity> {
        let mut class_hashes = self.class_hashes.lock().await;

        if let Err(e) = class_hashes.load_if_empty().await {
            tracing::warn!(
                target: "starknet_harness::declare",
                "Ignoring class hash cache: {}",
                e
            );
        }

        let fingerprint = artifact.fingerprint();
        if let Some(identity) = class_hashes.get(&fingerprint) {
            tracing::debug!(
                target: "starknet_harness::declare",
                "Class hash cache hit for {} ({})",
                contract_name,
                fingerprint
            );
            return Ok(identity);
        }

        tracing::info!(
            target: "starknet_harness::declare",
            "Updating cache for {} ({}) with {}",
            contract_name,
            fingerprint,
            self.extractor.name()
        );
        let identity = self.extractor.extract(artifact)?;
        if let Err(e) = class_hashes.put(fingerprint, identity).await {
            tracing::warn!(
                target: "starknet_harness::declare",
                "Failed to persist class hash of {}: {}",
                contract_name,
                e
            );
        }
        Ok(identity)
    }
}
