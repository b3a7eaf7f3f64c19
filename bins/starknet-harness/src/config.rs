//! Command-line configuration for the harness front end

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use starknet::core::types::Felt;
use starknet_harness::config::DEVNET_BASE_URL;
use starknet_harness::{AccountCredentials, HarnessConfig};
use url::Url;

/// Declare and deploy Starknet contracts against a devnet or a custom node
#[derive(Parser, Debug)]
#[command(name = "starknet-harness")]
#[command(about = "Declare and deploy Starknet contracts", long_about = None)]
pub struct Config {
    /// Starknet RPC URL
    #[arg(long, env = "RPC_URL", default_value = DEVNET_BASE_URL, global = true)]
    pub rpc_url: String,

    /// Allow an RPC URL other than the local devnet
    #[arg(long, env = "ALLOW_RPC_URL_ENV", global = true)]
    pub allow_rpc_url_env: bool,

    /// Deployer account address (defaults to the first predeployed devnet account)
    #[arg(long, env = "ADDRESS", requires = "private_key", global = true)]
    pub address: Option<String>,

    /// Deployer account private key
    #[arg(long, env = "PRIVATE_KEY", requires = "address", hide_env_values = true, global = true)]
    pub private_key: Option<String>,

    /// Build output of the project
    #[arg(long, default_value = "./target/release", global = true)]
    pub contracts_folder: PathBuf,

    /// Persisted class hash cache
    #[arg(long, default_value = "./dist/classHashCache.json", global = true)]
    pub class_cache_path: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Declare a contract unless it is already declared
    Declare {
        /// Contract name, e.g. ArgentAccount
        name: String,

        /// Folder to look the artifact up in (defaults to the contracts folder)
        #[arg(long)]
        folder: Option<PathBuf>,

        /// Return as soon as the declaration is sent
        #[arg(long)]
        no_wait: bool,
    },

    /// Declare a contract if needed and deploy it through the UDC
    Deploy {
        /// Contract name
        name: String,

        /// Constructor calldata (comma-separated felts)
        ///
        /// Example: --calldata 0x1,0x2
        #[arg(long, value_delimiter = ',')]
        calldata: Vec<String>,

        /// Deployment salt (random when omitted)
        #[arg(long)]
        salt: Option<String>,
    },

    /// Restart the devnet
    Restart,

    /// Mint fee tokens on the devnet
    Mint {
        address: String,
        amount: u128,

        /// Mint STRK instead of ETH
        #[arg(long)]
        strk: bool,
    },

    /// Move the devnet clock forward
    IncreaseTime { seconds: u64 },

    /// Print the fee token balance of an account
    Balance {
        address: String,

        /// Read the STRK balance instead of ETH
        #[arg(long)]
        strk: bool,
    },

    /// Print the timestamp of the latest block
    Timestamp,

    /// Print the persisted class hash cache
    Cache,
}

impl Config {
    /// Harness configuration for the global options
    pub fn harness_config(&self) -> Result<HarnessConfig> {
        let node_url = Url::parse(&self.rpc_url)
            .with_context(|| format!("Invalid RPC URL '{}'", self.rpc_url))?;

        let mut config = HarnessConfig::default()
            .with_node_url(node_url)
            .with_allow_rpc_url_env(self.allow_rpc_url_env)
            .with_contracts_folder(&self.contracts_folder)
            .with_class_cache_path(&self.class_cache_path);

        if let (Some(address), Some(private_key)) = (&self.address, &self.private_key) {
            config = config.with_deployer(AccountCredentials {
                address: parse_felt(address)?,
                private_key: parse_felt(private_key)?,
            });
        }

        Ok(config)
    }
}

pub fn parse_felt(value: &str) -> Result<Felt> {
    Felt::from_hex(value).with_context(|| format!("Invalid felt '{value}'"))
}
