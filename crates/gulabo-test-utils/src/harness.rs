// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles mock transport and providers over a temp SQLite
//! database shared by the real store and the real credit ledger.

use std::sync::Arc;
use std::time::Duration;

use gulabo_config::model::{AgentConfig, GulaboConfig, StorageConfig};
use gulabo_core::types::UserId;
use gulabo_core::{CreditLedger, GulaboError, StorageAdapter};
use gulabo_credits::SqliteCreditLedger;
use gulabo_storage::{Database, SqliteStore};

use crate::mock_providers::{MockGeneration, MockSpeech, MockTranscription};
use crate::mock_transport::MockTransport;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    generation_delay: Option<Duration>,
    starting_credits: i64,
    production: bool,
    serialize_per_user: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            generation_delay: None,
            starting_credits: AgentConfig::default().starting_credits,
            production: false,
            serialize_per_user: true,
        }
    }

    /// Set scripted generation replies.
    pub fn with_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Make every generation call take `delay`.
    pub fn with_generation_delay(mut self, delay: Duration) -> Self {
        self.generation_delay = Some(delay);
        self
    }

    pub fn with_starting_credits(mut self, credits: i64) -> Self {
        self.starting_credits = credits;
        self
    }

    pub fn production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    pub fn serialize_per_user(mut self, on: bool) -> Self {
        self.serialize_per_user = on;
        self
    }

    /// Build the harness, creating the temp database.
    pub async fn build(self) -> Result<TestHarness, GulaboError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| GulaboError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");
        let storage_config = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            ..StorageConfig::default()
        };

        let db = Database::open(&storage_config.database_path).await?;
        let ledger = Arc::new(SqliteCreditLedger::new(db.clone()));
        let storage = Arc::new(SqliteStore::with_database(storage_config.clone(), db));

        let config = GulaboConfig {
            agent: AgentConfig {
                starting_credits: self.starting_credits,
                production: self.production,
                serialize_per_user: self.serialize_per_user,
                shutdown_timeout_secs: 5,
                ..AgentConfig::default()
            },
            storage: storage_config,
            ..GulaboConfig::default()
        };

        let responses = self.responses.into_iter().map(Ok).collect();
        Ok(TestHarness {
            transport: Arc::new(MockTransport::new()),
            generation: Arc::new(MockGeneration::scripted(responses, self.generation_delay)),
            transcription: Arc::new(MockTranscription::new()),
            speech: Arc::new(MockSpeech::new()),
            storage,
            ledger,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    pub transport: Arc<MockTransport>,
    pub generation: Arc<MockGeneration>,
    pub transcription: Arc<MockTranscription>,
    pub speech: Arc<MockSpeech>,
    /// SQLite store (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStore>,
    /// Ledger over the same database as `storage`.
    pub ledger: Arc<SqliteCreditLedger>,
    pub config: GulaboConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Current balance, `None` for an unknown user.
    pub async fn balance(&self, user: i64) -> Option<i64> {
        self.ledger.balance(UserId(user)).await.ok().flatten()
    }

    /// Number of turns in the user's stored transcript.
    pub async fn transcript_len(&self, user: i64) -> usize {
        match self.storage.get_conversation(UserId(user)).await {
            Ok(Some(c)) => gulabo_core::transcript::decode(&c.messages).len(),
            _ => 0,
        }
    }
}
