// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credit ledger trait.

use async_trait::async_trait;

use crate::error::GulaboError;
use crate::types::{PaymentCredit, UserId};

/// Per-user nonnegative credit balance.
///
/// Every mutation is one atomic statement at the storage layer, so a debit
/// racing a payment credit for the same user cannot lose either update.
#[async_trait]
pub trait CreditLedger: Send + Sync + 'static {
    /// Current balance, or `None` if the user has no balance row.
    async fn balance(&self, user: UserId) -> Result<Option<i64>, GulaboError>;

    /// Subtracts one credit if the balance is positive.
    ///
    /// Returns the new balance, or `None` when nothing changed.
    async fn decrement_if_positive(&self, user: UserId) -> Result<Option<i64>, GulaboError>;

    /// Adds `amount` (> 0) credits and returns the new balance.
    async fn increment(&self, user: UserId, amount: i64) -> Result<i64, GulaboError>;

    /// Adds `amount` credits for a payment, at most once per `charge_id`.
    async fn credit_payment(
        &self,
        user: UserId,
        charge_id: &str,
        amount: i64,
    ) -> Result<PaymentCredit, GulaboError>;

    /// Sets the balance to zero.
    async fn reset(&self, user: UserId) -> Result<(), GulaboError>;
}
