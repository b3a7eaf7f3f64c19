//! Deploy coordination and contract loading.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use starknet::core::types::{Call, Felt, FunctionCall};
use starknet::core::utils::get_selector_from_name;

use crate::artifacts::ContractAbi;
use crate::cache::AbiCache;
use crate::declare::{DeclareOptions, Declarer};
use crate::error::{HarnessError, Result};
use crate::ledger::{DeployRequest, Ledger};

/// A deployed contract with the ABI of its class, bound to the ledger it lives on.
///
/// Calls are checked against the ABI when it lists any entry; an empty ABI accepts every
/// function name.
#[derive(Clone)]
pub struct ContractHandle {
    pub address: Felt,
    pub class_hash: Felt,
    pub abi: Arc<ContractAbi>,
    pub(crate) ledger: Arc<dyn Ledger>,
}

impl ContractHandle {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        address: Felt,
        class_hash: Felt,
        abi: Arc<ContractAbi>,
    ) -> Self {
        Self {
            address,
            class_hash,
            abi,
            ledger,
        }
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.abi.has_function(name)
    }

    /// Builds the call of `function`, for batching several calls in one transaction.
    pub fn populate(&self, function: &str, calldata: Vec<Felt>) -> Result<Call> {
        Ok(Call {
            to: self.address,
            selector: self.selector(function)?,
            calldata,
        })
    }

    /// Calls a view function at the latest block and returns the raw result felts.
    pub async fn call(&self, function: &str, calldata: Vec<Felt>) -> Result<Vec<Felt>> {
        let entry_point_selector = self.selector(function)?;
        self.ledger
            .call(FunctionCall {
                contract_address: self.address,
                entry_point_selector,
                calldata,
            })
            .await
    }

    /// Invokes `function` from the deployer account and waits for it to succeed.
    pub async fn invoke(&self, function: &str, calldata: Vec<Felt>) -> Result<Felt> {
        let call = self.populate(function, calldata)?;
        let transaction_hash = self.ledger.invoke(vec![call], None).await?;
        tracing::debug!(
            target: "starknet_harness::deploy",
            "Invoked {} on {:#x} in {:#x}",
            function,
            self.address,
            transaction_hash
        );
        Ok(transaction_hash)
    }

    fn selector(&self, function: &str) -> Result<Felt> {
        let unknown = || HarnessError::UnknownFunction {
            function: function.to_string(),
            address: self.address,
        };
        if !self.abi.is_empty() && !self.abi.has_function(function) {
            return Err(unknown());
        }
        get_selector_from_name(function).map_err(|_| unknown())
    }
}

impl fmt::Debug for ContractHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractHandle")
            .field("address", &self.address)
            .field("class_hash", &self.class_hash)
            .field("abi", &self.abi)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ContractHandle {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
            && self.class_hash == other.class_hash
            && self.abi == other.abi
    }
}

/// Declares, deploys through the UDC and loads contracts.
pub struct Deployer {
    ledger: Arc<dyn Ledger>,
    declarer: Arc<Declarer>,
    abi_cache: Arc<AbiCache>,
    contracts_folder: PathBuf,
}

impl Deployer {
    pub fn new(ledger: Arc<dyn Ledger>, declarer: Arc<Declarer>, contracts_folder: PathBuf) -> Self {
        let abi_cache = declarer.abi_cache();
        Self {
            ledger,
            declarer,
            abi_cache,
            contracts_folder,
        }
    }

    /// Loads the contract at `address`.
    ///
    /// `class_hash` is looked up on the ledger when not given. The ABI comes from the cache
    /// when the class is known, from the ledger otherwise.
    pub async fn load_contract(
        &self,
        address: Felt,
        class_hash: Option<Felt>,
    ) -> Result<ContractHandle> {
        let class_hash = match class_hash {
            Some(class_hash) => class_hash,
            None => self.ledger.get_class_hash_at(address).await?,
        };

        let abi = match self.abi_cache.get(class_hash).await {
            Some(abi) => abi,
            None => {
                tracing::debug!(
                    target: "starknet_harness::deploy",
                    "ABI of class {:#x} not cached, fetching from {:#x}",
                    class_hash,
                    address
                );
                let abi = Arc::new(self.ledger.get_class_at(address).await?);
                self.abi_cache.insert(class_hash, abi.clone()).await;
                abi
            }
        };

        Ok(ContractHandle::new(self.ledger.clone(), address, class_hash, abi))
    }

    /// Declares `contract_name` from the contracts folder (waiting for it), deploys it and
    /// loads the resulting contract.
    pub async fn declare_and_deploy(
        &self,
        contract_name: &str,
        request: DeployRequest,
    ) -> Result<ContractHandle> {
        let class_hash = self
            .declarer
            .declare(contract_name, &self.contracts_folder, DeclareOptions::default())
            .await?;

        let outcome = self.ledger.deploy_via_udc(class_hash, &request).await?;

        tracing::info!(
            target: "starknet_harness::deploy",
            "{} deployed at {:#x}",
            contract_name,
            outcome.contract_address
        );

        self.load_contract(outcome.contract_address, Some(class_hash))
            .await
    }
}
