//! In-memory class hash → ABI cache.

use std::collections::HashMap;
use std::sync::Arc;

use starknet::core::types::Felt;
use tokio::sync::RwLock;

use crate::artifacts::ContractAbi;

/// ABIs known to this process, keyed by class hash.
///
/// Populated whenever an ABI becomes known (declaration or node lookup) and consulted
/// before fetching a class from the node. A class hash always maps to the same ABI, so
/// entries outlive ledger resets.
#[derive(Debug, Default)]
pub struct AbiCache {
    entries: RwLock<HashMap<Felt, Arc<ContractAbi>>>,
}

impl AbiCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, class_hash: Felt) -> Option<Arc<ContractAbi>> {
        self.entries.read().await.get(&class_hash).cloned()
    }

    pub async fn insert(&self, class_hash: Felt, abi: Arc<ContractAbi>) {
        self.entries.write().await.insert(class_hash, abi);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
