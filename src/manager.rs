//! Explicit harness context.
//!
//! A [`Manager`] owns everything a test suite shares: the ledger connection, the devnet
//! control client, the declared contract registry and the caches. It is created once and
//! passed around; nothing is global.

use std::sync::Arc;

use starknet::core::types::Felt;

use crate::artifacts::{find_bundle, ClassIdentityExtractor, StarknetClassHasher};
use crate::cache::{AbiCache, ClassHashCache};
use crate::config::{AccountCredentials, HarnessConfig};
use crate::declare::{DeclareOptions, Declarer};
use crate::deploy::{ContractHandle, Deployer};
use crate::devnet::DevnetClient;
use crate::error::{HarnessError, Result};
use crate::ledger::{DeployRequest, Ledger, StarknetLedger, TransactionExecution};
use crate::tokens::TokenManager;

pub struct Manager {
    config: HarnessConfig,
    ledger: Arc<dyn Ledger>,
    devnet: Option<DevnetClient>,
    declarer: Arc<Declarer>,
    deployer: Arc<Deployer>,
    tokens: TokenManager,
}

impl Manager {
    /// Validates `config`, resolves the deployer account and connects to the node.
    ///
    /// Without configured credentials the first predeployed devnet account is used.
    pub async fn connect(config: HarnessConfig) -> Result<Self> {
        config.validate()?;

        let devnet = if config.is_devnet() {
            Some(DevnetClient::new(config.node_url.clone())?.with_dump_path(&config.dump_path))
        } else {
            None
        };

        let credentials: AccountCredentials = match (config.deployer, &devnet) {
            (Some(credentials), _) => credentials,
            (None, Some(devnet)) => devnet.predeployed_account(None).await?.into(),
            (None, None) => {
                return Err(HarnessError::Config(
                    "No deployer account configured".to_string(),
                ))
            }
        };

        tracing::info!(
            target: "starknet_harness::manager",
            "Using deployer account {:#x}",
            credentials.address
        );

        let ledger = StarknetLedger::connect(
            config.node_url.clone(),
            credentials,
            config.devnet_bounds,
            config.receipt_policy(),
        )
        .await?;

        let mut manager = Self::with_ledger(config, Arc::new(ledger), Arc::new(StarknetClassHasher));
        manager.devnet = devnet;
        Ok(manager)
    }

    /// Builds a manager on top of an existing ledger, without devnet control.
    pub fn with_ledger(
        config: HarnessConfig,
        ledger: Arc<dyn Ledger>,
        extractor: Arc<dyn ClassIdentityExtractor>,
    ) -> Self {
        let declarer = Arc::new(
            Declarer::new(
                ledger.clone(),
                extractor,
                ClassHashCache::new(&config.class_cache_path),
                Arc::new(AbiCache::new()),
            )
            .with_devnet_bounds(config.devnet_bounds),
        );
        let deployer = Arc::new(Deployer::new(
            ledger.clone(),
            declarer.clone(),
            config.contracts_folder.clone(),
        ));
        let tokens = TokenManager::new(deployer.clone());

        Self {
            config,
            ledger,
            devnet: None,
            declarer,
            deployer,
            tokens,
        }
    }

    pub fn with_devnet(mut self, devnet: DevnetClient) -> Self {
        self.devnet = Some(devnet);
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn ledger(&self) -> Arc<dyn Ledger> {
        self.ledger.clone()
    }

    pub fn declarer(&self) -> Arc<Declarer> {
        self.declarer.clone()
    }

    /// Fee token contracts and balances.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Devnet control client. Fails with `NotDevnet` on any other network.
    pub fn devnet(&self) -> Result<&DevnetClient> {
        self.devnet
            .as_ref()
            .ok_or(HarnessError::NotDevnet("devnet control"))
    }

    /// Declares a contract from the project build output.
    pub async fn declare_local_contract(&self, contract_name: &str, wait: bool) -> Result<Felt> {
        self.declarer
            .declare(contract_name, &self.config.contracts_folder, DeclareOptions { wait })
            .await
    }

    /// Declares a test fixture contract.
    pub async fn declare_fixture_contract(&self, contract_name: &str, wait: bool) -> Result<Felt> {
        self.declarer
            .declare(contract_name, &self.config.fixtures_folder, DeclareOptions { wait })
            .await
    }

    /// Declares the account class of the released bundle matching `version`.
    pub async fn declare_artifact_account_contract(&self, version: &str, wait: bool) -> Result<Felt> {
        self.declare_artifact(&format!("account-{version}"), "ArgentAccount", wait)
            .await
    }

    /// Declares the multisig class of the released bundle matching `version`.
    pub async fn declare_artifact_multisig_contract(&self, version: &str, wait: bool) -> Result<Felt> {
        self.declare_artifact(&format!("multisig-{version}"), "ArgentMultisig", wait)
            .await
    }

    async fn declare_artifact(&self, prefix: &str, contract_name: &str, wait: bool) -> Result<Felt> {
        let folder = &self.config.artifacts_folder;
        let bundle = find_bundle(folder, prefix).await?;
        self.declarer
            .declare(&format!("/{bundle}/{contract_name}"), folder, DeclareOptions { wait })
            .await
    }

    pub async fn load_contract(
        &self,
        address: Felt,
        class_hash: Option<Felt>,
    ) -> Result<ContractHandle> {
        self.deployer.load_contract(address, class_hash).await
    }

    pub async fn declare_and_deploy_contract(
        &self,
        contract_name: &str,
        request: DeployRequest,
    ) -> Result<ContractHandle> {
        self.deployer.declare_and_deploy(contract_name, request).await
    }

    /// Forgets the contracts declared in this session.
    pub async fn clear_class_cache(&self) {
        self.declarer.clear_class_cache().await;
    }

    /// Timestamp of the latest block, in seconds.
    pub async fn current_timestamp(&self) -> Result<u64> {
        self.ledger.block_timestamp().await
    }

    /// Waits until the transaction is accepted and reports how its execution ended. A
    /// reverted transaction is not an error here.
    pub async fn ensure_accepted(&self, transaction_hash: Felt) -> Result<TransactionExecution> {
        self.ledger.wait_for_acceptance(transaction_hash).await
    }

    /// Waits until the transaction is accepted and fails if it reverted.
    pub async fn ensure_success(&self, transaction_hash: Felt) -> Result<()> {
        self.ledger.wait_for_transaction(transaction_hash).await
    }

    /// Restarts the devnet and forgets the contracts declared on it. Does nothing on other
    /// networks.
    pub async fn restart_devnet_and_clear_class_cache(&self) -> Result<()> {
        let Some(devnet) = &self.devnet else {
            tracing::debug!(
                target: "starknet_harness::manager",
                "Not a devnet, skipping restart"
            );
            return Ok(());
        };

        devnet.restart().await?;
        self.declarer.clear_class_cache().await;
        Ok(())
    }
}
