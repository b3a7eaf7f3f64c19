//! Ledger client surface used by the declaration and deployment layers.
//!
//! The [`Ledger`] trait is the seam between the harness logic and the network: the
//! Starknet JSON-RPC implementation lives in [`rpc`], tests plug in an in-memory one.

pub mod retry;
pub mod rpc;
pub mod udc;

use async_trait::async_trait;
use starknet::core::types::{Call, Felt, FunctionCall};

use crate::artifacts::{ClassIdentity, ContractAbi, ContractArtifact};
use crate::error::{HarnessError, Result};

pub use retry::RetryPolicy;
pub use rpc::StarknetLedger;

/// Explicit V3 resource bounds. Setting all of them skips fee estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceBounds {
    pub l1_gas: u64,
    pub l1_gas_price: u128,
    pub l2_gas: u64,
    pub l2_gas_price: u128,
    pub l1_data_gas: u64,
    pub l1_data_gas_price: u128,
}

impl ResourceBounds {
    /// Generous bounds for a devnet whose prefunded accounts can afford them.
    pub const DEVNET: Self = Self {
        l1_gas: 0,
        l1_gas_price: 100_000_000_000,
        l2_gas: 10_000_000_000,
        l2_gas_price: 10_000_000_000,
        l1_data_gas: 1_000,
        l1_data_gas_price: 100_000_000_000,
    };
}

impl Default for ResourceBounds {
    fn default() -> Self {
        Self::DEVNET
    }
}

/// Fee and validation settings for a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionDetails {
    /// Skip account validation. starknet-rs has no such flag on send, so [`StarknetLedger`]
    /// ignores it and only skips fee estimation through `resource_bounds`.
    pub skip_validate: bool,
    /// `None` lets the client estimate fees.
    pub resource_bounds: Option<ResourceBounds>,
}

impl TransactionDetails {
    /// Let the client estimate fees.
    pub fn estimated() -> Self {
        Self::default()
    }

    /// Skip validation and fee estimation on a network the caller controls.
    pub fn devnet(resource_bounds: ResourceBounds) -> Self {
        Self {
            skip_validate: true,
            resource_bounds: Some(resource_bounds),
        }
    }
}

/// A declaration with its precomputed class identity.
#[derive(Debug, Clone, Copy)]
pub struct DeclareRequest<'a> {
    pub artifact: &'a ContractArtifact,
    pub identity: ClassIdentity,
    pub details: TransactionDetails,
}

/// Result of a declare-if-absent call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclareOutcome {
    pub class_hash: Felt,
    /// `None` when the class was already declared.
    pub transaction_hash: Option<Felt>,
}

/// Deployment through the Universal Deployer Contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub constructor_calldata: Vec<Felt>,
    pub salt: Felt,
    pub unique: bool,
    /// `None` picks devnet bounds on a devnet and estimation elsewhere.
    pub details: Option<TransactionDetails>,
}

impl DeployRequest {
    /// Random salt, unique deployment.
    pub fn new(constructor_calldata: Vec<Felt>) -> Self {
        Self {
            constructor_calldata,
            salt: Felt::from(rand::random::<u128>()),
            unique: true,
            details: None,
        }
    }

    pub fn with_salt(mut self, salt: Felt) -> Self {
        self.salt = salt;
        self
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn with_details(mut self, details: TransactionDetails) -> Self {
        self.details = Some(details);
        self
    }
}

impl Default for DeployRequest {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Result of a UDC deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployOutcome {
    pub contract_address: Felt,
    pub transaction_hash: Felt,
}

/// How an accepted transaction ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionExecution {
    Succeeded,
    Reverted { reason: String },
}

/// Operations the harness needs from a ledger.
///
/// Implementations own their retry and timeout policy; callers never retry on top.
/// Failures are reported as `LedgerRejected` with the node's message untouched.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Whether the ledger is a local network the caller fully controls.
    fn is_devnet(&self) -> bool;

    /// Declares the class unless it is already known to the ledger.
    ///
    /// An already declared class is not an error: its hash is returned without a
    /// transaction hash.
    async fn declare_if_absent(&self, request: DeclareRequest<'_>) -> Result<DeclareOutcome>;

    /// Waits until the transaction is accepted on L2 or L1, whatever its execution result.
    async fn wait_for_acceptance(&self, transaction_hash: Felt) -> Result<TransactionExecution>;

    /// Waits until the transaction is accepted and fails if its execution reverted.
    async fn wait_for_transaction(&self, transaction_hash: Felt) -> Result<()> {
        match self.wait_for_acceptance(transaction_hash).await? {
            TransactionExecution::Succeeded => Ok(()),
            TransactionExecution::Reverted { reason } => Err(HarnessError::TransactionReverted {
                transaction_hash,
                reason,
            }),
        }
    }

    async fn get_class_hash_at(&self, contract_address: Felt) -> Result<Felt>;

    /// ABI of the class deployed at `contract_address`.
    async fn get_class_at(&self, contract_address: Felt) -> Result<ContractAbi>;

    /// Deploys through the UDC and waits for the deployment to be accepted.
    async fn deploy_via_udc(&self, class_hash: Felt, request: &DeployRequest) -> Result<DeployOutcome>;

    /// Read-only call against the latest block.
    async fn call(&self, call: FunctionCall) -> Result<Vec<Felt>>;

    /// Sends `calls` from the deployer account as one transaction and waits for it to
    /// succeed. `None` details behave as for deployments.
    async fn invoke(&self, calls: Vec<Call>, details: Option<TransactionDetails>) -> Result<Felt>;

    /// Timestamp of the latest block, in seconds.
    async fn block_timestamp(&self) -> Result<u64>;
}
