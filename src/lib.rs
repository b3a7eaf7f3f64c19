//! Starknet harness - declare and deploy contracts from integration tests.
//!
//! The harness keeps declarations cheap across a long test suite:
//!
//! - artifacts are fingerprinted and their class hashes persisted, so unchanged contracts are
//!   never hashed twice ([`cache::ClassHashCache`]);
//! - names declared in the current session return immediately ([`declare::Declarer`]);
//! - classes already known to the ledger are not declared again;
//! - ABIs are cached by class hash when loading contracts ([`cache::AbiCache`]).
//!
//! Loaded contracts can be called and invoked directly ([`deploy::ContractHandle`]), and the
//! fee tokens are available through [`tokens::TokenManager`].
//!
//! ```rust,ignore
//! use starknet_harness::{DeployRequest, Felt, HarnessConfig, Manager};
//!
//! let manager = Manager::connect(HarnessConfig::from_env()?).await?;
//! let class_hash = manager.declare_local_contract("ArgentAccount", true).await?;
//! let contract = manager
//!     .declare_and_deploy_contract("MockDapp", DeployRequest::default())
//!     .await?;
//! contract.invoke("set_number", vec![Felt::from(42)]).await?;
//! let balance = manager.tokens().strk_balance(contract.address).await?;
//! ```

pub mod artifacts;
pub mod cache;
pub mod config;
pub mod declare;
pub mod deploy;
pub mod devnet;
pub mod error;
pub mod ledger;
pub mod manager;
pub mod tokens;

pub use async_trait::async_trait;
pub use starknet::core::types::Felt;

pub use artifacts::{ClassIdentity, ClassIdentityExtractor, ContractAbi, ContractArtifact};
pub use cache::{AbiCache, ClassHashCache, Fingerprint};
pub use config::{AccountCredentials, HarnessConfig};
pub use declare::{DeclareOptions, Declarer};
pub use deploy::{ContractHandle, Deployer};
pub use devnet::DevnetClient;
pub use error::{HarnessError, Result};
pub use ledger::{
    DeployRequest, Ledger, ResourceBounds, RetryPolicy, StarknetLedger, TransactionExecution,
};
pub use manager::Manager;
pub use tokens::TokenManager;
