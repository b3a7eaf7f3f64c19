//! Shared fixtures: an in-memory ledger and a counting class identity extractor.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use starknet::core::types::{Call, FunctionCall};
use starknet::core::utils::get_selector_from_name;
use starknet::macros::felt;
use starknet_harness::artifacts::{ClassIdentity, ClassIdentityExtractor, ContractAbi, ContractArtifact};
use starknet_harness::ledger::udc::deploy_call;
use starknet_harness::ledger::{
    DeclareOutcome, DeclareRequest, DeployOutcome, DeployRequest, Ledger, TransactionDetails,
    TransactionExecution,
};
use starknet_harness::{async_trait, Felt, HarnessError, Result};

pub const DEPLOYER: Felt = felt!("0xde9107e7");

#[derive(Default)]
pub struct MockLedger {
    devnet: bool,
    declare_delay: Option<Duration>,
    reject_declarations: Mutex<Option<String>>,
    declared: Mutex<HashSet<Felt>>,
    abis: Mutex<HashMap<Felt, ContractAbi>>,
    deployed: Mutex<HashMap<Felt, Felt>>,
    last_details: Mutex<Option<TransactionDetails>>,
    rewrite_on_devnet_check: Mutex<Option<(PathBuf, String)>>,
    call_results: Mutex<HashMap<(Felt, Felt), Vec<Felt>>>,
    invoked: Mutex<Vec<Call>>,
    reverted: Mutex<HashMap<Felt, String>>,
    timestamp: AtomicU64,
    pub declare_calls: AtomicUsize,
    pub declare_transactions: AtomicUsize,
    pub wait_calls: AtomicUsize,
    pub get_class_at_calls: AtomicUsize,
    pub deploy_calls: AtomicUsize,
    pub call_count: AtomicUsize,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn devnet() -> Self {
        Self {
            devnet: true,
            ..Self::default()
        }
    }

    pub fn with_declare_delay(mut self, delay: Duration) -> Self {
        self.declare_delay = Some(delay);
        self
    }

    /// Marks a class as declared by someone else.
    pub fn predeclare(&self, class_hash: Felt) {
        self.declared.lock().unwrap().insert(class_hash);
    }

    pub fn is_declared(&self, class_hash: Felt) -> bool {
        self.declared.lock().unwrap().contains(&class_hash)
    }

    /// Forgets every declared class and deployed contract, like a devnet restart.
    pub fn reset(&self) {
        self.declared.lock().unwrap().clear();
        self.deployed.lock().unwrap().clear();
    }

    pub fn reject_declarations(&self, reason: Option<&str>) {
        *self.reject_declarations.lock().unwrap() = reason.map(str::to_string);
    }

    /// Registers a contract deployed outside the harness.
    pub fn insert_contract(&self, address: Felt, class_hash: Felt, abi: ContractAbi) {
        self.deployed.lock().unwrap().insert(address, class_hash);
        self.abis.lock().unwrap().insert(class_hash, abi);
    }

    /// Overwrites `path` with `contents` the next time the declarer asks whether the ledger
    /// is a devnet, which happens after the artifact was read.
    pub fn rewrite_on_devnet_check(&self, path: &Path, contents: String) {
        *self.rewrite_on_devnet_check.lock().unwrap() = Some((path.to_path_buf(), contents));
    }

    /// Answers calls of `function` on `address` with `result`.
    pub fn set_call_result(&self, address: Felt, function: &str, result: Vec<Felt>) {
        let selector = get_selector_from_name(function).unwrap();
        self.call_results
            .lock()
            .unwrap()
            .insert((address, selector), result);
    }

    pub fn invoked(&self) -> Vec<Call> {
        self.invoked.lock().unwrap().clone()
    }

    pub fn revert_transaction(&self, transaction_hash: Felt, reason: &str) {
        self.reverted
            .lock()
            .unwrap()
            .insert(transaction_hash, reason.to_string());
    }

    pub fn set_timestamp(&self, timestamp: u64) {
        self.timestamp.store(timestamp, Ordering::SeqCst);
    }

    pub fn last_details(&self) -> Option<TransactionDetails> {
        *self.last_details.lock().unwrap()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ledger for MockLedger {
    fn is_devnet(&self) -> bool {
        if let Some((path, contents)) = self.rewrite_on_devnet_check.lock().unwrap().take() {
            std::fs::write(path, contents).unwrap();
        }
        self.devnet
    }

    async fn declare_if_absent(&self, request: DeclareRequest<'_>) -> Result<DeclareOutcome> {
        self.declare_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_details.lock().unwrap() = Some(request.details);

        let class_hash = request.identity.class_hash;
        if self.is_declared(class_hash) {
            return Ok(DeclareOutcome {
                class_hash,
                transaction_hash: None,
            });
        }

        if let Some(reason) = self.reject_declarations.lock().unwrap().clone() {
            return Err(HarnessError::LedgerRejected {
                operation: "declare",
                reason,
            });
        }

        if let Some(delay) = self.declare_delay {
            tokio::time::sleep(delay).await;
        }

        let transaction = self.declare_transactions.fetch_add(1, Ordering::SeqCst) + 1;
        self.declared.lock().unwrap().insert(class_hash);
        self.abis
            .lock()
            .unwrap()
            .insert(class_hash, request.artifact.abi().as_ref().clone());

        Ok(DeclareOutcome {
            class_hash,
            transaction_hash: Some(Felt::from(transaction)),
        })
    }

    async fn wait_for_acceptance(&self, transaction_hash: Felt) -> Result<TransactionExecution> {
        self.wait_calls.fetch_add(1, Ordering::SeqCst);
        Ok(match self.reverted.lock().unwrap().get(&transaction_hash) {
            Some(reason) => TransactionExecution::Reverted {
                reason: reason.clone(),
            },
            None => TransactionExecution::Succeeded,
        })
    }

    async fn get_class_hash_at(&self, contract_address: Felt) -> Result<Felt> {
        self.deployed
            .lock()
            .unwrap()
            .get(&contract_address)
            .copied()
            .ok_or_else(|| HarnessError::LedgerRejected {
                operation: "getClassHashAt",
                reason: "Contract not found".to_string(),
            })
    }

    async fn get_class_at(&self, contract_address: Felt) -> Result<ContractAbi> {
        self.get_class_at_calls.fetch_add(1, Ordering::SeqCst);
        let class_hash = self.get_class_hash_at(contract_address).await?;
        self.abis
            .lock()
            .unwrap()
            .get(&class_hash)
            .cloned()
            .ok_or_else(|| HarnessError::LedgerRejected {
                operation: "getClassAt",
                reason: "Class hash not found".to_string(),
            })
    }

    async fn deploy_via_udc(&self, class_hash: Felt, request: &DeployRequest) -> Result<DeployOutcome> {
        self.deploy_calls.fetch_add(1, Ordering::SeqCst);
        if !self.is_declared(class_hash) {
            return Err(HarnessError::LedgerRejected {
                operation: "deploy",
                reason: format!("Class with hash {class_hash:#x} is not declared"),
            });
        }

        let (contract_address, _) = deploy_call(
            class_hash,
            request.salt,
            request.unique,
            &request.constructor_calldata,
            DEPLOYER,
        );
        self.deployed
            .lock()
            .unwrap()
            .insert(contract_address, class_hash);

        Ok(DeployOutcome {
            contract_address,
            transaction_hash: Felt::from(0xd3_u64),
        })
    }

    async fn call(&self, call: FunctionCall) -> Result<Vec<Felt>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.call_results
            .lock()
            .unwrap()
            .get(&(call.contract_address, call.entry_point_selector))
            .cloned()
            .ok_or_else(|| HarnessError::LedgerRejected {
                operation: "call",
                reason: "Requested entrypoint does not exist in the contract".to_string(),
            })
    }

    async fn invoke(&self, calls: Vec<Call>, _details: Option<TransactionDetails>) -> Result<Felt> {
        let transaction_hash = {
            let mut invoked = self.invoked.lock().unwrap();
            invoked.extend(calls);
            Felt::from(0x1_0000_u64 + invoked.len() as u64)
        };
        self.wait_for_transaction(transaction_hash).await?;
        Ok(transaction_hash)
    }

    async fn block_timestamp(&self) -> Result<u64> {
        Ok(self.timestamp.load(Ordering::SeqCst))
    }
}

/// Derives a fake class hash from the artifact content and counts its invocations.
#[derive(Default)]
pub struct CountingExtractor {
    pub calls: AtomicUsize,
}

impl CountingExtractor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ClassIdentityExtractor for CountingExtractor {
    fn name(&self) -> &str {
        "counting"
    }

    fn extract(&self, artifact: &ContractArtifact) -> Result<ClassIdentity> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let hash = xxhash_rust::xxh3::xxh3_128(artifact.class().to_string().as_bytes());
        let class_hash = Felt::from(hash);
        Ok(ClassIdentity::new(class_hash, Some(class_hash + Felt::ONE)))
    }
}

/// Minimal Sierra-shaped artifact whose content depends on `marker`.
pub fn artifact_json(marker: &str) -> Value {
    json!({
        "sierra_program": [marker],
        "contract_class_version": "0.1.0",
        "entry_points_by_type": { "EXTERNAL": [], "L1_HANDLER": [], "CONSTRUCTOR": [] },
        "abi": [
            { "type": "function", "name": "get_marker", "inputs": [], "outputs": [], "state_mutability": "view" },
            { "type": "event", "name": "mock::Event", "kind": "enum", "variants": [] }
        ]
    })
}

/// Writes `<folder>/<file_stem>.contract_class.json` and its CASM companion.
pub fn write_artifact(folder: &Path, file_stem: &str, marker: &str) -> PathBuf {
    std::fs::create_dir_all(folder).unwrap();
    let path = folder.join(format!("{file_stem}.contract_class.json"));
    std::fs::write(&path, artifact_json(marker).to_string()).unwrap();
    std::fs::write(
        folder.join(format!("{file_stem}.compiled_contract_class.json")),
        json!({ "bytecode": [marker] }).to_string(),
    )
    .unwrap();
    path
}

pub fn ledger_and_extractor(ledger: MockLedger) -> (Arc<MockLedger>, Arc<CountingExtractor>) {
    (Arc::new(ledger), Arc::new(CountingExtractor::default()))
}
