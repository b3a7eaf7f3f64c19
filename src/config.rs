//! Harness configuration.
//!
//! The configuration is built explicitly and handed to [`crate::Manager::connect`]; nothing
//! is read from the environment unless [`HarnessConfig::from_env`] is called.

use std::fmt;
use std::path::PathBuf;

use starknet::core::types::Felt;
use starknet::providers::Url;

use crate::devnet::is_devnet_url;
use crate::error::{HarnessError, Result};
use crate::ledger::{ResourceBounds, RetryPolicy};

pub const DEVNET_BASE_URL: &str = "http://127.0.0.1:5050";
pub const ALLOW_RPC_URL_FLAG: &str = "--allow-rpc-url-env";

/// Deployer account credentials.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AccountCredentials {
    pub address: Felt,
    pub private_key: Felt,
}

impl fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("address", &format_args!("{:#x}", self.address))
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// RPC node URL.
    pub node_url: Url,

    /// Allow a node URL other than the local devnet.
    pub allow_rpc_url_env: bool,

    /// Deployer account. `None` uses the first predeployed devnet account.
    pub deployer: Option<AccountCredentials>,

    /// Build output of the project under test.
    pub contracts_folder: PathBuf,

    /// Fixture contracts used only by tests.
    pub fixtures_folder: PathBuf,

    /// Versioned release bundles (`account-<version>/`, `multisig-<version>/`).
    pub artifacts_folder: PathBuf,

    /// Persisted fingerprint → class identity cache.
    pub class_cache_path: PathBuf,

    /// Devnet dump location used by `dump`/`load`.
    pub dump_path: PathBuf,

    /// Resource bounds applied on devnet to skip fee estimation.
    pub devnet_bounds: ResourceBounds,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            node_url: devnet_url(),
            allow_rpc_url_env: false,
            deployer: None,
            contracts_folder: PathBuf::from("./target/release"),
            fixtures_folder: PathBuf::from("./tests-integration/fixtures/argent_"),
            artifacts_folder: PathBuf::from("./deployments/artifacts"),
            class_cache_path: PathBuf::from("./dist/classHashCache.json"),
            dump_path: PathBuf::from("./dump"),
            devnet_bounds: ResourceBounds::DEVNET,
        }
    }
}

impl HarnessConfig {
    /// Reads `RPC_URL`, `ADDRESS`, `PRIVATE_KEY` and `ALLOW_RPC_URL_ENV` from the process
    /// environment; `--allow-rpc-url-env` on the command line also allows a custom URL.
    pub fn from_env() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_vars(|key| std::env::var(key).ok(), &args)
    }

    /// Same as [`Self::from_env`] with an explicit variable lookup.
    pub fn from_vars<F>(lookup: F, args: &[String]) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("RPC_URL") {
            config.node_url = Url::parse(&url)
                .map_err(|e| HarnessError::Config(format!("invalid RPC_URL '{url}': {e}")))?;
        }

        config.allow_rpc_url_env = args.iter().any(|arg| arg == ALLOW_RPC_URL_FLAG)
            || lookup("ALLOW_RPC_URL_ENV")
                .map(|v| matches!(v.as_str(), "1" | "true"))
                .unwrap_or(false);

        config.deployer = match (lookup("ADDRESS"), lookup("PRIVATE_KEY")) {
            (Some(address), Some(private_key)) => Some(AccountCredentials {
                address: parse_felt("ADDRESS", &address)?,
                private_key: parse_felt("PRIVATE_KEY", &private_key)?,
            }),
            (None, None) => None,
            _ => {
                return Err(HarnessError::Config(
                    "ADDRESS and PRIVATE_KEY must be set together".to_string(),
                ))
            }
        };

        Ok(config)
    }

    pub fn with_node_url(mut self, node_url: Url) -> Self {
        self.node_url = node_url;
        self
    }

    pub fn with_allow_rpc_url_env(mut self, allow: bool) -> Self {
        self.allow_rpc_url_env = allow;
        self
    }

    pub fn with_deployer(mut self, credentials: AccountCredentials) -> Self {
        self.deployer = Some(credentials);
        self
    }

    pub fn with_contracts_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.contracts_folder = folder.into();
        self
    }

    pub fn with_fixtures_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.fixtures_folder = folder.into();
        self
    }

    pub fn with_artifacts_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.artifacts_folder = folder.into();
        self
    }

    pub fn with_class_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.class_cache_path = path.into();
        self
    }

    pub fn is_devnet(&self) -> bool {
        is_devnet_url(&self.node_url)
    }

    /// Receipt polling: fast on a local network, slower elsewhere.
    pub fn receipt_policy(&self) -> RetryPolicy {
        if self.is_devnet() {
            RetryPolicy::devnet()
        } else {
            RetryPolicy::remote()
        }
    }

    /// Fails when a custom node URL is used without explicitly allowing it.
    pub fn validate(&self) -> Result<()> {
        if self.node_url != devnet_url() && !self.allow_rpc_url_env {
            return Err(HarnessError::Config(format!(
                "When using a custom RPC URL ({}), you must set allow_rpc_url_env or pass {}",
                self.node_url, ALLOW_RPC_URL_FLAG
            )));
        }
        if self.deployer.is_none() && !self.is_devnet() {
            return Err(HarnessError::Config(
                "A deployer account (ADDRESS, PRIVATE_KEY) is required outside devnet".to_string(),
            ));
        }
        Ok(())
    }
}

fn devnet_url() -> Url {
    Url::parse(DEVNET_BASE_URL).expect("devnet URL is valid")
}

fn parse_felt(name: &str, value: &str) -> Result<Felt> {
    Felt::from_hex(value).map_err(|e| HarnessError::Config(format!("invalid {name}: {e}")))
}
