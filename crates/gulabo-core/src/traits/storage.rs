// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for user and conversation persistence.

use async_trait::async_trait;

use crate::error::GulaboError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Conversation, User, UserId, UserProfile};

/// Adapter for the relational store holding users and conversations.
///
/// Every mutation is a single-row atomic statement; callers never hold a
/// lock across steps.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection).
    async fn initialize(&self) -> Result<(), GulaboError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), GulaboError>;

    // --- Users ---

    /// Looks up a user by external identity.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, GulaboError>;

    /// Creates the user, the seeded credit balance, and an empty conversation
    /// as one unit. Idempotent: an existing identity is returned unchanged.
    async fn setup_new_user(
        &self,
        profile: &UserProfile,
        starting_credits: i64,
    ) -> Result<User, GulaboError>;

    // --- Conversations ---

    /// Reads the user's conversation, if any.
    async fn get_conversation(&self, user: UserId) -> Result<Option<Conversation>, GulaboError>;

    /// Creates an empty conversation, or returns the existing one.
    async fn create_conversation(&self, user: UserId) -> Result<Conversation, GulaboError>;

    /// Replaces the stored transcript with `messages` (full-row replace).
    async fn replace_messages(&self, user: UserId, messages: &str) -> Result<(), GulaboError>;

    /// Resets the stored transcript to empty.
    async fn clear_messages(&self, user: UserId) -> Result<(), GulaboError>;
}
