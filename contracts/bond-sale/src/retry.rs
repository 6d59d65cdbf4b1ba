use std::thread;
use std::time::Duration;

use cosmwasm_schema::cw_serde;

use crate::error::BondError;

/// Bounded retry with exponential backoff for reads racing eventual
/// visibility. Only transient errors are retried.
#[cw_serde]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 10,
            initial_backoff_ms: 250,
            max_backoff_ms: 4_000,
            backoff_multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Policy that tries exactly once.
    pub fn no_retry() -> Self {
        RetryPolicy {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = u64::from(self.backoff_multiplier).saturating_pow(retry);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    pub fn poll<T>(&self, op: impl FnMut() -> Result<T, BondError>) -> Result<T, BondError> {
        self.poll_with(op, thread::sleep)
    }

    /// `poll` with an injectable sleep.
    pub fn poll_with<T>(
        &self,
        mut op: impl FnMut() -> Result<T, BondError>,
        mut sleep: impl FnMut(Duration),
    ) -> Result<T, BondError> {
        let attempts = self.max_attempts.max(1);
        let mut retry = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && retry + 1 < attempts => {
                    sleep(self.backoff(retry));
                    retry += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
