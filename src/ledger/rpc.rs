//! Starknet JSON-RPC ledger, backed by a single-owner deployer account.

use std::sync::Arc;

use async_trait::async_trait;
use starknet::accounts::{Account, ExecutionEncoding, SingleOwnerAccount};
use starknet::core::types::contract::SierraClass;
use starknet::core::types::{
    BlockId, BlockTag, Call, ExecutionResult, Felt, FunctionCall, InvokeTransactionResult,
    MaybePreConfirmedBlockWithTxHashes, StarknetError, TransactionFinalityStatus,
    TransactionReceiptWithBlockInfo,
};
use starknet::providers::jsonrpc::{HttpTransport, JsonRpcClient};
use starknet::providers::{Provider, ProviderError, Url};
use starknet::signers::{LocalWallet, SigningKey};

use super::{
    udc, DeclareOutcome, DeclareRequest, DeployOutcome, DeployRequest, Ledger, ResourceBounds,
    RetryPolicy, TransactionDetails, TransactionExecution,
};
use crate::artifacts::{ClassKind, ContractAbi};
use crate::config::AccountCredentials;
use crate::devnet::is_devnet_url;
use crate::error::{HarnessError, Result};

pub type DeployerAccount = SingleOwnerAccount<JsonRpcClient<HttpTransport>, LocalWallet>;

/// Ledger talking to a Starknet node over JSON-RPC.
///
/// Declarations and deployments are signed by the configured deployer account. Receipts
/// are polled with `receipt_policy`, which is the only timeout applied to waits.
pub struct StarknetLedger {
    provider: Arc<JsonRpcClient<HttpTransport>>,
    account: DeployerAccount,
    is_devnet: bool,
    devnet_bounds: ResourceBounds,
    receipt_policy: RetryPolicy,
}

impl StarknetLedger {
    /// Connects to `node_url` and binds the deployer account to the node's chain id.
    pub async fn connect(
        node_url: Url,
        credentials: AccountCredentials,
        devnet_bounds: ResourceBounds,
        receipt_policy: RetryPolicy,
    ) -> Result<Self> {
        let provider = Arc::new(JsonRpcClient::new(HttpTransport::new(node_url.clone())));
        let chain_id = provider
            .chain_id()
            .await
            .map_err(|e| HarnessError::rejected("chainId", e))?;

        let signer = LocalWallet::from(SigningKey::from_secret_scalar(credentials.private_key));
        let account = SingleOwnerAccount::new(
            JsonRpcClient::new(HttpTransport::new(node_url.clone())),
            signer,
            credentials.address,
            chain_id,
            ExecutionEncoding::New,
        );

        let is_devnet = is_devnet_url(&node_url);
        tracing::info!(
            target: "starknet_harness::ledger",
            "Connected to {} (chain id {:#x}, devnet: {})",
            node_url,
            chain_id,
            is_devnet
        );

        Ok(Self {
            provider,
            account,
            is_devnet,
            devnet_bounds,
            receipt_policy,
        })
    }

    pub fn provider(&self) -> Arc<JsonRpcClient<HttpTransport>> {
        self.provider.clone()
    }

    pub fn account(&self) -> &DeployerAccount {
        &self.account
    }

    pub fn account_address(&self) -> Felt {
        self.account.address()
    }

    /// Polls until the transaction is accepted on L2 or L1.
    pub async fn wait_for_receipt(
        &self,
        transaction_hash: Felt,
    ) -> Result<TransactionReceiptWithBlockInfo> {
        let provider = &self.provider;
        self.receipt_policy
            .execute(|| async move {
                let receipt = provider
                    .get_transaction_receipt(transaction_hash)
                    .await
                    .map_err(|e| e.to_string())?;
                match receipt.receipt.finality_status() {
                    TransactionFinalityStatus::AcceptedOnL2
                    | TransactionFinalityStatus::AcceptedOnL1 => Ok(receipt),
                    status => Err(format!("finality status is {status:?}")),
                }
            })
            .await
            .map_err(|reason| HarnessError::FinalityTimeout {
                transaction_hash,
                attempts: self.receipt_policy.max_attempts(),
                reason,
            })
    }

    /// Signs and sends `calls` as one V3 invoke, then waits for it to succeed.
    async fn execute(
        &self,
        operation: &'static str,
        calls: Vec<Call>,
        details: Option<TransactionDetails>,
    ) -> Result<Felt> {
        let execution = self.account.execute_v3(calls);
        let execution = match self.bounds_for(details) {
            Some(bounds) => execution
                .l1_gas(bounds.l1_gas)
                .l1_gas_price(bounds.l1_gas_price)
                .l2_gas(bounds.l2_gas)
                .l2_gas_price(bounds.l2_gas_price)
                .l1_data_gas(bounds.l1_data_gas)
                .l1_data_gas_price(bounds.l1_data_gas_price),
            None => execution,
        };

        let InvokeTransactionResult { transaction_hash } = execution
            .send()
            .await
            .map_err(|e| HarnessError::rejected(operation, e))?;

        self.wait_for_transaction(transaction_hash).await?;
        Ok(transaction_hash)
    }

    fn bounds_for(&self, details: Option<TransactionDetails>) -> Option<ResourceBounds> {
        match details {
            Some(details) => details.resource_bounds,
            None if self.is_devnet => Some(self.devnet_bounds),
            None => None,
        }
    }

    async fn is_declared(&self, class_hash: Felt) -> Result<bool> {
        match self
            .provider
            .get_class(BlockId::Tag(BlockTag::Latest), class_hash)
            .await
        {
            Ok(_) => Ok(true),
            Err(ProviderError::StarknetError(StarknetError::ClassHashNotFound)) => Ok(false),
            Err(e) => Err(HarnessError::rejected("getClass", e)),
        }
    }
}

#[async_trait]
impl Ledger for StarknetLedger {
    fn is_devnet(&self) -> bool {
        self.is_devnet
    }

    async fn declare_if_absent(&self, request: DeclareRequest<'_>) -> Result<DeclareOutcome> {
        let class_hash = request.identity.class_hash;

        if self.is_declared(class_hash).await? {
            tracing::debug!(
                target: "starknet_harness::ledger",
                "Class {:#x} already declared",
                class_hash
            );
            return Ok(DeclareOutcome {
                class_hash,
                transaction_hash: None,
            });
        }

        if request.artifact.kind() == ClassKind::Legacy {
            return Err(HarnessError::UnsupportedClass(class_hash));
        }

        let compiled_class_hash = request
            .identity
            .compiled_class_hash
            .ok_or(HarnessError::MissingCompiledClass(class_hash))?;

        let class: SierraClass = request.artifact.parse_class()?;
        let flattened = class
            .flatten()
            .map_err(|e| HarnessError::ClassHash(e.to_string()))?;

        let declaration = self
            .account
            .declare_v3(Arc::new(flattened), compiled_class_hash);
        let declaration = match request.details.resource_bounds {
            Some(bounds) => declaration
                .l1_gas(bounds.l1_gas)
                .l1_gas_price(bounds.l1_gas_price)
                .l2_gas(bounds.l2_gas)
                .l2_gas_price(bounds.l2_gas_price)
                .l1_data_gas(bounds.l1_data_gas)
                .l1_data_gas_price(bounds.l1_data_gas_price),
            None => declaration,
        };

        let result = declaration
            .send()
            .await
            .map_err(|e| HarnessError::rejected("declare", e))?;

        tracing::debug!(
            target: "starknet_harness::ledger",
            "Declare transaction {:#x} sent for class {:#x}",
            result.transaction_hash,
            result.class_hash
        );

        Ok(DeclareOutcome {
            class_hash: result.class_hash,
            transaction_hash: Some(result.transaction_hash),
        })
    }

    async fn wait_for_acceptance(&self, transaction_hash: Felt) -> Result<TransactionExecution> {
        let receipt = self.wait_for_receipt(transaction_hash).await?;
        Ok(match receipt.receipt.execution_result() {
            ExecutionResult::Succeeded => TransactionExecution::Succeeded,
            ExecutionResult::Reverted { reason } => TransactionExecution::Reverted {
                reason: reason.clone(),
            },
        })
    }

    async fn get_class_hash_at(&self, contract_address: Felt) -> Result<Felt> {
        self.provider
            .get_class_hash_at(BlockId::Tag(BlockTag::Latest), contract_address)
            .await
            .map_err(|e| HarnessError::rejected("getClassHashAt", e))
    }

    async fn get_class_at(&self, contract_address: Felt) -> Result<ContractAbi> {
        let class = self
            .provider
            .get_class_at(BlockId::Tag(BlockTag::Latest), contract_address)
            .await
            .map_err(|e| HarnessError::rejected("getClassAt", e))?;
        ContractAbi::from_contract_class(class)
    }

    async fn deploy_via_udc(&self, class_hash: Felt, request: &DeployRequest) -> Result<DeployOutcome> {
        let (contract_address, call) = udc::deploy_call(
            class_hash,
            request.salt,
            request.unique,
            &request.constructor_calldata,
            self.account.address(),
        );

        let transaction_hash = self.execute("deploy", vec![call], request.details).await?;

        tracing::info!(
            target: "starknet_harness::ledger",
            "Deployed class {:#x} at {:#x}",
            class_hash,
            contract_address
        );

        Ok(DeployOutcome {
            contract_address,
            transaction_hash,
        })
    }

    async fn call(&self, call: FunctionCall) -> Result<Vec<Felt>> {
        self.provider
            .call(call, BlockId::Tag(BlockTag::Latest))
            .await
            .map_err(|e| HarnessError::rejected("call", e))
    }

    async fn invoke(&self, calls: Vec<Call>, details: Option<TransactionDetails>) -> Result<Felt> {
        let transaction_hash = self.execute("invoke", calls, details).await?;
        tracing::debug!(
            target: "starknet_harness::ledger",
            "Invoke transaction {:#x} succeeded",
            transaction_hash
        );
        Ok(transaction_hash)
    }

    async fn block_timestamp(&self) -> Result<u64> {
        let block = self
            .provider
            .get_block_with_tx_hashes(BlockId::Tag(BlockTag::Latest))
            .await
            .map_err(|e| HarnessError::rejected("getBlockWithTxHashes", e))?;
        Ok(match block {
            MaybePreConfirmedBlockWithTxHashes::Block(block) => block.timestamp,
            MaybePreConfirmedBlockWithTxHashes::PreConfirmedBlock(block) => block.timestamp,
        })
    }
}
