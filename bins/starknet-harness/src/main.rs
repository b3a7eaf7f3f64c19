//! Starknet harness command-line front end
//!
//! # Usage
//!
//! ```bash
//! # Declare a contract from ./target/release
//! starknet-harness declare ArgentAccount
//!
//! # Deploy it with constructor calldata
//! starknet-harness deploy MockDapp --calldata 0x1,0x2
//!
//! # Against a custom node
//! RPC_URL=https://... ADDRESS=0x... PRIVATE_KEY=0x... starknet-harness --allow-rpc-url-env declare MockDapp
//! ```

mod config;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::Parser;
use config::{parse_felt, Command, Config};
use starknet_harness::{ClassHashCache, DeclareOptions, DeployRequest, Manager};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(true)
        .init();

    let harness_config = config.harness_config()?;

    // Inspecting the cache does not need a node.
    if let Command::Cache = config.command {
        let mut cache = ClassHashCache::new(&harness_config.class_cache_path);
        cache
            .load_if_empty()
            .await
            .context("Failed to read the class hash cache")?;
        let entries: BTreeMap<_, _> = cache.iter().collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let manager = Manager::connect(harness_config)
        .await
        .context("Failed to connect to the node")?;

    match config.command {
        Command::Declare {
            name,
            folder,
            no_wait,
        } => {
            let folder = folder.unwrap_or_else(|| manager.config().contracts_folder.clone());
            let class_hash = manager
                .declarer()
                .declare(&name, &folder, DeclareOptions { wait: !no_wait })
                .await
                .with_context(|| format!("Failed to declare {name}"))?;
            println!("{class_hash:#x}");
        }
        Command::Deploy {
            name,
            calldata,
            salt,
        } => {
            let calldata = calldata
                .iter()
                .map(String::as_str)
                .map(parse_felt)
                .collect::<Result<Vec<_>>>()?;
            let mut request = DeployRequest::new(calldata);
            if let Some(salt) = salt {
                request = request.with_salt(parse_felt(&salt)?);
            }

            let contract = manager
                .declare_and_deploy_contract(&name, request)
                .await
                .with_context(|| format!("Failed to deploy {name}"))?;
            println!("{:#x}", contract.address);
        }
        Command::Restart => {
            manager.devnet()?.restart().await?;
        }
        Command::Mint {
            address,
            amount,
            strk,
        } => {
            let address = parse_felt(&address)?;
            let devnet = manager.devnet()?;
            if strk {
                devnet.mint_strk(address, amount).await?;
            } else {
                devnet.mint_eth(address, amount).await?;
            }
            tracing::info!(target: "starknet_harness::cli", "Minted {} to {:#x}", amount, address);
        }
        Command::IncreaseTime { seconds } => {
            manager.devnet()?.increase_time(seconds).await?;
        }
        Command::Balance { address, strk } => {
            let address = parse_felt(&address)?;
            let tokens = manager.tokens();
            let balance = if strk {
                tokens.strk_balance(address).await?
            } else {
                tokens.eth_balance(address).await?
            };
            println!("{balance}");
        }
        Command::Timestamp => {
            println!("{}", manager.current_timestamp().await?);
        }
        Command::Cache => unreachable!("handled before connecting"),
    }

    Ok(())
}
