//! Retry policy for ledger polling
//!
//! Receipts are polled until the node knows the transaction; transient RPC failures are
//! retried the same way.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Fixed-interval polling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay between two attempts
    pub interval: Duration,

    /// Maximum number of retry attempts (0 = no retries, just try once)
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::remote()
    }
}

impl RetryPolicy {
    pub fn new(interval: Duration, max_retries: u32) -> Self {
        Self {
            interval,
            max_retries,
        }
    }

    /// Fast polling for a local network: 100ms for up to a minute.
    pub fn devnet() -> Self {
        Self::new(Duration::from_millis(100), 600)
    }

    /// Polling for a remote network: 1s for up to five minutes.
    pub fn remote() -> Self {
        Self::new(Duration::from_secs(1), 300)
    }

    /// Creates a policy with no retries (fail immediately).
    pub fn no_retry() -> Self {
        Self::new(Duration::ZERO, 0)
    }

    /// Total number of attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Executes a function with retry logic.
    ///
    /// Returns the first success, or the last error once retries are exhausted.
    ///
    /// # Example
    /// ```rust,ignore
    /// let receipt = RetryPolicy::devnet()
    ///     .execute(|| provider.get_transaction_receipt(hash))
    ///     .await?;
    /// ```
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Debug,
    {
        let mut attempts = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempts > 0 {
                        tracing::debug!(
                            target: "starknet_harness::ledger::retry",
                            "Operation succeeded after {} attempt(s)",
                            attempts + 1
                        );
                    }
                    return Ok(result);
                }
                Err(err) => {
                    attempts += 1;

                    if attempts > self.max_retries {
                        tracing::warn!(
                            target: "starknet_harness::ledger::retry",
                            "Operation failed after {} attempts: {:?}",
                            attempts,
                            err
                        );
                        return Err(err);
                    }

                    tracing::trace!(
                        target: "starknet_harness::ledger::retry",
                        "Operation failed (attempt {}/{}): {:?}. Retrying in {:?}...",
                        attempts,
                        self.max_attempts(),
                        err,
                        self.interval
                    );

                    sleep(self.interval).await;
                }
            }
        }
    }
}
