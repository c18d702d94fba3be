// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credit balance statements.
//!
//! Each mutation is a single `UPDATE ... RETURNING`, so concurrent debits and
//! credits for one user serialize inside SQLite rather than in the caller.

use gulabo_core::types::UserId;
use gulabo_core::GulaboError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};

/// Current balance, or `None` when the user has no balance row.
pub async fn get_balance(db: &Database, user: UserId) -> Result<Option<i64>, GulaboError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT balance FROM credits WHERE user_id = ?1",
                params![user.0],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Subtract one credit if the balance is above zero.
///
/// Returns the new balance, or `None` when the balance was already zero or
/// the row does not exist.
pub async fn decrement_if_positive(
    db: &Database,
    user: UserId,
) -> Result<Option<i64>, GulaboError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "UPDATE credits
                 SET balance = balance - 1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE user_id = ?1 AND balance > 0
                 RETURNING balance",
                params![user.0],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Add `amount` credits and return the new balance.
///
/// A missing balance row is an error.
pub async fn increment(db: &Database, user: UserId, amount: i64) -> Result<i64, GulaboError> {
    if amount <= 0 {
        return Err(GulaboError::Internal(format!(
            "credit increment must be positive, got {amount}"
        )));
    }
    db.connection()
        .call(move |conn| increment_in(conn, user, amount))
        .await
        .map_err(map_tr_err)
}

/// Set the balance to zero.
pub async fn reset(db: &Database, user: UserId) -> Result<(), GulaboError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE credits
                 SET balance = 0, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE user_id = ?1",
                params![user.0],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub(crate) fn increment_in(
    conn: &rusqlite::Connection,
    user: UserId,
    amount: i64,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "UPDATE credits
         SET balance = balance + ?2,
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE user_id = ?1
         RETURNING balance",
        params![user.0, amount],
        |row| row.get(0),
    )
}
