// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements run on tokio-rusqlite's single background thread. `Database`
//! is cheap to clone; every clone talks to that same thread, so per-row
//! statements never interleave.

use std::path::Path;
use std::time::Duration;

use gulabo_config::model::StorageConfig;
use gulabo_core::GulaboError;
use tracing::{info, warn};

use crate::migrations;

const BUSY_TIMEOUT_MS: u64 = 5_000;

/// Handle to the single SQLite writer.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` and bring its schema up to date.
    pub async fn open(path: &str) -> Result<Self, GulaboError> {
        Self::open_with_options(path, true).await
    }

    /// Like [`Database::open`], with control over WAL journaling.
    pub async fn open_with_options(path: &str, wal_mode: bool) -> Result<Self, GulaboError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| GulaboError::Storage {
                source: Box::new(e),
            })?;
        }

        // Schema setup runs on a plain blocking connection that is dropped
        // before the async writer opens.
        let setup_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), GulaboError> {
            let mut conn = rusqlite::Connection::open(&setup_path).map_err(storage_err)?;
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")
                    .map_err(storage_err)?;
            }
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| GulaboError::Internal(format!("database setup task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| GulaboError::Storage {
                source: Box::new(e),
            })?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        Ok(Self { conn })
    }

    /// Open the configured database, retrying at startup only.
    ///
    /// Makes `connect_attempts` tries, `connect_retry_secs` apart, and returns
    /// the last error once they are exhausted.
    pub async fn open_with_retry(config: &StorageConfig) -> Result<Self, GulaboError> {
        let attempts = config.connect_attempts.max(1);
        let delay = Duration::from_secs(config.connect_retry_secs);
        let mut attempt = 1;
        loop {
            match Self::open_with_options(&config.database_path, config.wal_mode).await {
                Ok(db) => {
                    info!(path = %config.database_path, attempt, "database ready");
                    return Ok(db);
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        error = %e,
                        attempt,
                        attempts,
                        retry_in_secs = delay.as_secs(),
                        "database connection failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// The underlying async connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), GulaboError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Close the connection, waiting for queued statements to finish.
    pub async fn close(self) -> Result<(), GulaboError> {
        self.conn.close().await.map_err(|e| GulaboError::Storage {
            source: Box::new(e),
        })
    }
}

/// Map a tokio-rusqlite call error into the storage variant.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> GulaboError {
    GulaboError::Storage {
        source: Box::new(e),
    }
}

fn storage_err(e: rusqlite::Error) -> GulaboError {
    GulaboError::Storage {
        source: Box::new(e),
    }
}
