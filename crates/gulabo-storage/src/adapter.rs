// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use gulabo_config::model::StorageConfig;
use gulabo_core::types::{Conversation, User, UserId, UserProfile};
use gulabo_core::{AdapterType, GulaboError, HealthStatus, PluginAdapter, StorageAdapter};

use crate::database::{map_tr_err, Database};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Either built around an already-open [`Database`] (shared with the credit
/// ledger) or opened lazily by [`StorageAdapter::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a store that opens `config.database_path` on `initialize`.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Create a store over an open database.
    pub fn with_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// The underlying database, or an error if not initialized.
    pub fn database(&self) -> Result<&Database, GulaboError> {
        self.db.get().ok_or_else(|| GulaboError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, GulaboError> {
        self.database()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GulaboError> {
        if self.db.get().is_some() {
            self.close().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStore {
    async fn initialize(&self) -> Result<(), GulaboError> {
        if self.db.initialized() {
            return Ok(());
        }
        let db =
            Database::open_with_options(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| GulaboError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), GulaboError> {
        if self.config.wal_mode {
            self.database()?.checkpoint().await?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, GulaboError> {
        queries::users::get_user(self.database()?, id).await
    }

    async fn setup_new_user(
        &self,
        profile: &UserProfile,
        starting_credits: i64,
    ) -> Result<User, GulaboError> {
        queries::users::setup_new_user(self.database()?, profile, starting_credits).await
    }

    async fn get_conversation(&self, user: UserId) -> Result<Option<Conversation>, GulaboError> {
        queries::conversations::get_conversation(self.database()?, user).await
    }

    async fn create_conversation(&self, user: UserId) -> Result<Conversation, GulaboError> {
        queries::conversations::create_conversation(self.database()?, user).await
    }

    async fn replace_messages(&self, user: UserId, messages: &str) -> Result<(), GulaboError> {
        queries::conversations::replace_messages(self.database()?, user, messages).await
    }

    async fn clear_messages(&self, user: UserId) -> Result<(), GulaboError> {
        queries::conversations::clear_messages(self.database()?, user).await
    }
}
