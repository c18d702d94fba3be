// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User lookup and onboarding.

use gulabo_core::types::{User, UserId, UserProfile};
use gulabo_core::GulaboError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};

const SELECT_USER: &str = "SELECT user_id, first_name, last_name, username, onboarded_at
     FROM users WHERE user_id = ?1";

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        username: row.get(3)?,
        onboarded_at: row.get(4)?,
    })
}

/// Get a user by external identity.
pub async fn get_user(db: &Database, id: UserId) -> Result<Option<User>, GulaboError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(SELECT_USER, params![id.0], row_to_user)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Create the user, its credit balance and an empty conversation in one transaction.
///
/// Every insert ignores an existing row, so a second call for the same identity
/// changes nothing and returns the stored user.
pub async fn setup_new_user(
    db: &Database,
    profile: &UserProfile,
    starting_credits: i64,
) -> Result<User, GulaboError> {
    let profile = profile.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO users (user_id, first_name, last_name, username)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO NOTHING",
                params![
                    profile.id.0,
                    profile.first_name,
                    profile.last_name,
                    profile.username,
                ],
            )?;
            tx.execute(
                "INSERT INTO credits (user_id, balance) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO NOTHING",
                params![profile.id.0, starting_credits],
            )?;
            tx.execute(
                "INSERT INTO conversations (user_id) VALUES (?1)
                 ON CONFLICT(user_id) DO NOTHING",
                params![profile.id.0],
            )?;
            let user = tx.query_row(SELECT_USER, params![profile.id.0], row_to_user)?;
            tx.commit()?;
            Ok(user)
        })
        .await
        .map_err(map_tr_err)
}
