// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Permit pool and retry policy combined for one provider.

use std::future::Future;
use std::time::Duration;

use gulabo_core::GulaboError;
use tokio_util::sync::CancellationToken;

use crate::permit::PermitPool;
use crate::retry::RetryPolicy;

/// Admission and retry wrapper owned by each provider client.
///
/// A permit is taken for each attempt and released as soon as that attempt's
/// call returns, so the backoff sleep never holds one.
#[derive(Debug, Clone)]
pub struct ProviderGate {
    name: String,
    pool: PermitPool,
    retry: RetryPolicy,
}

impl ProviderGate {
    pub fn new(name: impl Into<String>, max_concurrency: usize, retry: RetryPolicy) -> Self {
        Self {
            name: name.into(),
            pool: PermitPool::new(max_concurrency),
            retry,
        }
    }

    /// Build from the `max_concurrency` / `max_attempts` / `base_delay_ms` triple
    /// every provider section carries.
    pub fn from_limits(
        name: impl Into<String>,
        max_concurrency: usize,
        max_attempts: u32,
        base_delay_ms: u64,
    ) -> Self {
        Self::new(
            name,
            max_concurrency,
            RetryPolicy::new(max_attempts, Duration::from_millis(base_delay_ms)),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool(&self) -> &PermitPool {
        &self.pool
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Run `op` under a permit, retrying per the policy.
    ///
    /// Cancellation while waiting for a permit, during the call, or during
    /// backoff returns [`GulaboError::Cancelled`].
    pub async fn call<T, F, Fut>(&self, cancel: &CancellationToken, mut op: F) -> Result<T, GulaboError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GulaboError>>,
    {
        let pool = &self.pool;
        self.retry
            .run(&self.name, cancel, |_attempt| {
                let call = op();
                async move {
                    let _permit = pool.acquire(cancel).await?;
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(GulaboError::Cancelled),
                        result = call => result,
                    }
                }
            })
            .await
    }
}
