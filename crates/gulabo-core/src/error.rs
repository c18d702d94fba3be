// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Gulabo bot backend.

use thiserror::Error;

/// The primary error type used across all Gulabo adapter traits and core operations.
#[derive(Debug, Error)]
pub enum GulaboError {
    /// Configuration errors (invalid TOML, missing keys, bad header values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, constraint violation).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport errors (send failure, file download failure, bad identifiers).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The transport's inbound stream has ended.
    #[error("transport inbound stream closed")]
    TransportClosed,

    /// A single failed call to a hosted provider (HTTP failure, bad status, malformed body).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A provider call failed on every attempt the retry policy allowed.
    #[error("{provider} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        provider: String,
        attempts: u32,
        source: Box<GulaboError>,
    },

    /// The caller's cancellation token fired while waiting.
    #[error("operation cancelled")]
    Cancelled,

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GulaboError {
    /// Whether a retry policy may attempt the failed operation again.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            GulaboError::Cancelled
                | GulaboError::Config(_)
                | GulaboError::RetriesExhausted { .. }
        )
    }

    /// Shorthand for a provider error without an underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        GulaboError::Provider {
            message: message.into(),
            source: None,
        }
    }
}
