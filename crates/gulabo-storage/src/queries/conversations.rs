// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation transcript operations.

use gulabo_core::transcript;
use gulabo_core::types::{Conversation, UserId};
use gulabo_core::GulaboError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};

const SELECT_CONVERSATION: &str =
    "SELECT user_id, messages, updated_at FROM conversations WHERE user_id = ?1";

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        user_id: UserId(row.get(0)?),
        messages: row.get(1)?,
        updated_at: row.get(2)?,
    })
}

/// Get a user's conversation.
pub async fn get_conversation(
    db: &Database,
    user: UserId,
) -> Result<Option<Conversation>, GulaboError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(SELECT_CONVERSATION, params![user.0], row_to_conversation)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Create an empty conversation, or return the one that already exists.
pub async fn create_conversation(
    db: &Database,
    user: UserId,
) -> Result<Conversation, GulaboError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations (user_id) VALUES (?1)
                 ON CONFLICT(user_id) DO NOTHING",
                params![user.0],
            )?;
            conn.query_row(SELECT_CONVERSATION, params![user.0], row_to_conversation)
        })
        .await
        .map_err(map_tr_err)
}

/// Replace the stored transcript in full.
pub async fn replace_messages(
    db: &Database,
    user: UserId,
    messages: &str,
) -> Result<(), GulaboError> {
    let messages = messages.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations (user_id, messages) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET
                     messages = excluded.messages,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![user.0, messages],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Reset the transcript to empty.
pub async fn clear_messages(db: &Database, user: UserId) -> Result<(), GulaboError> {
    replace_messages(db, user, transcript::EMPTY).await
}
