// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded-concurrency admission for outbound provider calls.

use std::sync::Arc;

use gulabo_core::GulaboError;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// A fixed-size pool of call permits. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct PermitPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl PermitPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Wait for a permit, or return [`GulaboError::Cancelled`] if `cancel` fires first.
    pub async fn acquire(
        &self,
        cancel: &CancellationToken,
    ) -> Result<OwnedSemaphorePermit, GulaboError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GulaboError::Cancelled),
            permit = self.semaphore.clone().acquire_owned() => permit
                .map_err(|_| GulaboError::Internal("permit pool closed".to_string())),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
