// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment crediting, deduplicated by charge id.

use gulabo_core::types::{PaymentCredit, UserId};
use gulabo_core::GulaboError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::queries::credits;

/// Record `charge_id` and add `amount` credits, unless the charge was seen before.
///
/// Both statements run in one transaction: the balance moves only when the
/// charge id insert took effect. An empty charge id cannot be deduplicated and
/// falls back to a plain increment.
pub async fn credit_payment(
    db: &Database,
    user: UserId,
    charge_id: &str,
    amount: i64,
) -> Result<PaymentCredit, GulaboError> {
    if charge_id.is_empty() {
        let balance = credits::increment(db, user, amount).await?;
        return Ok(PaymentCredit::Applied { balance });
    }
    if amount <= 0 {
        return Err(GulaboError::Internal(format!(
            "payment credit must be positive, got {amount}"
        )));
    }

    let charge_id = charge_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT INTO payments (charge_id, user_id, credits) VALUES (?1, ?2, ?3)
                 ON CONFLICT(charge_id) DO NOTHING",
                params![charge_id, user.0, amount],
            )?;
            let outcome = if inserted == 1 {
                PaymentCredit::Applied {
                    balance: credits::increment_in(&tx, user, amount)?,
                }
            } else {
                PaymentCredit::Duplicate {
                    balance: tx.query_row(
                        "SELECT balance FROM credits WHERE user_id = ?1",
                        params![user.0],
                        |row| row.get(0),
                    )?,
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}
