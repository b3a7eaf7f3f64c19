//! Devnet control through its non-standard `devnet_*` JSON-RPC methods.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use serde_json::{json, Value};
use starknet::core::types::Felt;
use starknet::providers::Url;

use crate::config::AccountCredentials;
use crate::error::{HarnessError, Result};

/// A node is treated as a devnet when it runs on the local host.
pub fn is_devnet_url(url: &Url) -> bool {
    matches!(url.host_str(), Some("localhost" | "127.0.0.1"))
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    message: String,
}

/// Prefunded account created by the devnet at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct PredeployedAccount {
    pub address: Felt,
    pub private_key: Felt,
}

impl From<PredeployedAccount> for AccountCredentials {
    fn from(account: PredeployedAccount) -> Self {
        Self {
            address: account.address,
            private_key: account.private_key,
        }
    }
}

/// Client for devnet control operations (minting, time travel, restart, dumps).
pub struct DevnetClient {
    http: reqwest::Client,
    url: Url,
    dump_path: PathBuf,
    next_id: AtomicU64,
}

impl DevnetClient {
    /// Fails with `NotDevnet` when `url` is not a local node.
    pub fn new(url: Url) -> Result<Self> {
        if !is_devnet_url(&url) {
            return Err(HarnessError::NotDevnet("devnet control"));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            url,
            dump_path: PathBuf::from("./dump"),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn with_dump_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dump_path = path.into();
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn dump_path(&self) -> &Path {
        &self.dump_path
    }

    /// Sends a raw JSON-RPC request and returns its `result`.
    pub async fn handle_json_rpc(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        tracing::trace!(target: "starknet_harness::devnet", "{} {}", method, params);

        let response: JsonRpcResponse = self
            .http
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| HarnessError::Devnet(format!("{method}: {e}")))?
            .json()
            .await
            .map_err(|e| HarnessError::Devnet(format!("{method}: invalid response: {e}")))?;

        if let Some(error) = response.error {
            return Err(HarnessError::Devnet(format!("RPC Error: {}", error.message)));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    pub async fn mint_eth(&self, address: Felt, amount: u128) -> Result<()> {
        self.handle_json_rpc(
            "devnet_mint",
            json!({ "address": format!("{address:#x}"), "amount": amount }),
        )
        .await?;
        Ok(())
    }

    pub async fn mint_strk(&self, address: Felt, amount: u128) -> Result<()> {
        self.handle_json_rpc(
            "devnet_mint",
            json!({ "address": format!("{address:#x}"), "amount": amount, "unit": "FRI" }),
        )
        .await?;
        Ok(())
    }

    pub async fn increase_time(&self, seconds: u64) -> Result<()> {
        self.handle_json_rpc("devnet_increaseTime", json!({ "time": seconds }))
            .await?;
        Ok(())
    }

    pub async fn set_time(&self, timestamp: u64) -> Result<()> {
        self.handle_json_rpc(
            "devnet_setTime",
            json!({ "time": timestamp, "generate_block": true }),
        )
        .await?;
        Ok(())
    }

    /// Restarts the devnet. Every class declared so far is gone afterwards.
    pub async fn restart(&self) -> Result<()> {
        self.handle_json_rpc("devnet_restart", json!({})).await?;
        tracing::info!(target: "starknet_harness::devnet", "Devnet restarted");
        Ok(())
    }

    pub async fn dump(&self) -> Result<()> {
        self.handle_json_rpc("devnet_dump", json!({ "path": self.dump_path }))
            .await?;
        Ok(())
    }

    pub async fn load(&self) -> Result<()> {
        self.handle_json_rpc("devnet_load", json!({ "path": self.dump_path }))
            .await?;
        Ok(())
    }

    pub async fn predeployed_accounts(&self) -> Result<Vec<PredeployedAccount>> {
        let result = self
            .handle_json_rpc("devnet_getPredeployedAccounts", json!({}))
            .await?;
        serde_json::from_value(result)
            .map_err(|e| HarnessError::Devnet(format!("invalid predeployed accounts: {e}")))
    }

    /// First predeployed account, skipping `exclude` if given.
    pub async fn predeployed_account(&self, exclude: Option<Felt>) -> Result<PredeployedAccount> {
        self.predeployed_accounts()
            .await?
            .into_iter()
            .find(|account| Some(account.address) != exclude)
            .ok_or_else(|| HarnessError::Devnet("No predeployed devnet account available".to_string()))
    }
}
