// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed credit ledger.

use async_trait::async_trait;
use gulabo_core::types::{PaymentCredit, UserId};
use gulabo_core::{CreditLedger, GulaboError};
use gulabo_storage::queries::{credits, payments};
use gulabo_storage::Database;
use tracing::{debug, info};

/// Credit ledger over the shared [`Database`].
///
/// Never reads then writes: every operation is one conditional or
/// unconditional `UPDATE` executed by the single SQLite writer.
#[derive(Clone)]
pub struct SqliteCreditLedger {
    db: Database,
}

impl SqliteCreditLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CreditLedger for SqliteCreditLedger {
    async fn balance(&self, user: UserId) -> Result<Option<i64>, GulaboError> {
        credits::get_balance(&self.db, user).await
    }

    async fn decrement_if_positive(&self, user: UserId) -> Result<Option<i64>, GulaboError> {
        let balance = credits::decrement_if_positive(&self.db, user).await?;
        match balance {
            Some(b) => debug!(user_id = %user, balance = b, "debited one credit"),
            None => debug!(user_id = %user, "debit skipped, balance already zero"),
        }
        Ok(balance)
    }

    async fn increment(&self, user: UserId, amount: i64) -> Result<i64, GulaboError> {
        let balance = credits::increment(&self.db, user, amount).await?;
        debug!(user_id = %user, amount, balance, "credits added");
        Ok(balance)
    }

    async fn credit_payment(
        &self,
        user: UserId,
        charge_id: &str,
        amount: i64,
    ) -> Result<PaymentCredit, GulaboError> {
        let outcome = payments::credit_payment(&self.db, user, charge_id, amount).await?;
        info!(user_id = %user, charge_id, amount, outcome = ?outcome, "payment credited");
        Ok(outcome)
    }

    async fn reset(&self, user: UserId) -> Result<(), GulaboError> {
        credits::reset(&self.db, user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gulabo_core::types::UserProfile;
    use gulabo_storage::queries::users::setup_new_user;
    use proptest::prelude::*;
    use tempfile::tempdir;

    async fn ledger_with_user(start: i64) -> (SqliteCreditLedger, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("ledger.db").to_str().unwrap())
            .await
            .unwrap();
        let profile = UserProfile {
            id: UserId(1),
            first_name: "Test".into(),
            last_name: None,
            username: None,
        };
        setup_new_user(&db, &profile, start).await.unwrap();
        (SqliteCreditLedger::new(db), dir)
    }

    #[tokio::test]
    async fn decrement_at_zero_is_noop() {
        let (ledger, _dir) = ledger_with_user(0).await;
        assert_eq!(ledger.decrement_if_positive(UserId(1)).await.unwrap(), None);
        assert_eq!(ledger.balance(UserId(1)).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn payment_redelivery_is_deduplicated() {
        let (ledger, _dir) = ledger_with_user(3).await;
        let a = ledger.credit_payment(UserId(1), "tg_1", 125).await.unwrap();
        let b = ledger.credit_payment(UserId(1), "tg_1", 125).await.unwrap();
        assert_eq!(a, PaymentCredit::Applied { balance: 128 });
        assert_eq!(b, PaymentCredit::Duplicate { balance: 128 });
    }

    #[derive(Debug, Clone)]
    enum Op {
        Debit,
        Credit(i64),
        Reset,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => Just(Op::Debit),
            1 => (1i64..20).prop_map(Op::Credit),
            1 => Just(Op::Reset),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn balance_matches_model_and_never_goes_negative(
            start in 0i64..5,
            ops in proptest::collection::vec(op(), 1..30),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let (ledger, _dir) = ledger_with_user(start).await;
                let mut expected = start;
                for op in &ops {
                    match op {
                        Op::Debit => {
                            let got = ledger.decrement_if_positive(UserId(1)).await.unwrap();
                            if expected > 0 {
                                expected -= 1;
                                prop_assert_eq!(got, Some(expected));
                            } else {
                                prop_assert_eq!(got, None);
                            }
                        }
                        Op::Credit(n) => {
                            expected += n;
                            prop_assert_eq!(ledger.increment(UserId(1), *n).await.unwrap(), expected);
                        }
                        Op::Reset => {
                            expected = 0;
                            ledger.reset(UserId(1)).await.unwrap();
                        }
                    }
                    let balance = ledger.balance(UserId(1)).await.unwrap().unwrap();
                    prop_assert!(balance >= 0);
                    prop_assert_eq!(balance, expected);
                }
                Ok(())
            })?;
        }
    }
}
