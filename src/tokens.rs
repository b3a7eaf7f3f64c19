//! Fee token contracts and balances.
//!
//! ETH was deployed behind a proxy on older networks: when the contract at its address
//! exposes `implementation`, the handle keeps the token address but uses the ABI of the
//! implementation.

use std::sync::Arc;

use starknet::core::types::{Felt, U256};
use starknet::macros::felt;
use tokio::sync::OnceCell;

use crate::deploy::{ContractHandle, Deployer};
use crate::error::{HarnessError, Result};

pub const ETH_ADDRESS: Felt =
    felt!("0x049d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7");

pub const STRK_ADDRESS: Felt =
    felt!("0x04718f5a0fc34cc1af16a1cdee98ffb20c31f5cd61d6ab07201858f4287c938d");

/// Loads the fee tokens once and reads balances through them.
pub struct TokenManager {
    deployer: Arc<Deployer>,
    eth: OnceCell<ContractHandle>,
    strk: OnceCell<ContractHandle>,
}

impl TokenManager {
    pub fn new(deployer: Arc<Deployer>) -> Self {
        Self {
            deployer,
            eth: OnceCell::new(),
            strk: OnceCell::new(),
        }
    }

    pub async fn eth_contract(&self) -> Result<ContractHandle> {
        self.eth.get_or_try_init(|| self.load_eth()).await.cloned()
    }

    pub async fn strk_contract(&self) -> Result<ContractHandle> {
        self.strk
            .get_or_try_init(|| self.deployer.load_contract(STRK_ADDRESS, None))
            .await
            .cloned()
    }

    pub async fn eth_balance(&self, account: Felt) -> Result<U256> {
        balance_of(&self.eth_contract().await?, account).await
    }

    pub async fn strk_balance(&self, account: Felt) -> Result<U256> {
        balance_of(&self.strk_contract().await?, account).await
    }

    async fn load_eth(&self) -> Result<ContractHandle> {
        let proxy = self.deployer.load_contract(ETH_ADDRESS, None).await?;
        if !proxy.has_function("implementation") {
            return Ok(proxy);
        }

        let result = proxy.call("implementation", Vec::new()).await?;
        let implementation = result
            .first()
            .copied()
            .ok_or_else(|| HarnessError::UnexpectedResult {
                function: "implementation",
                address: ETH_ADDRESS,
                result: result.clone(),
            })?;
        tracing::debug!(
            target: "starknet_harness::tokens",
            "ETH proxy points to {:#x}",
            implementation
        );

        let target = self.deployer.load_contract(implementation, None).await?;
        Ok(ContractHandle {
            abi: target.abi,
            ..proxy
        })
    }
}

async fn balance_of(token: &ContractHandle, account: Felt) -> Result<U256> {
    let result = token.call("balance_of", vec![account]).await?;
    Ok(parse_u256(&result))
}

/// Reads a `u256` returned as `[low, high]`. A single felt is a bare low word and an empty
/// result is zero.
fn parse_u256(result: &[Felt]) -> U256 {
    match result {
        [] => U256::from(0u64),
        [low] => U256::from_words(low_word(low), 0),
        [low, high, ..] => U256::from_words(low_word(low), low_word(high)),
    }
}

fn low_word(felt: &Felt) -> u128 {
    let bytes = felt.to_bytes_be();
    let mut low = [0u8; 16];
    low.copy_from_slice(&bytes[16..32]);
    u128::from_be_bytes(low)
}
