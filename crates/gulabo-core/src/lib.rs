// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Gulabo bot backend.
//!
//! This crate provides the error type, the domain types that cross crate
//! boundaries, and the adapter traits implemented by the transport, the
//! hosted providers, the storage layer, and the credit ledger.

pub mod error;
pub mod traits;
pub mod transcript;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::GulaboError;
pub use types::{AdapterType, ChatId, HealthStatus, MessageId, UserId};

// Re-export all adapter traits at crate root.
pub use traits::{
    CreditLedger, GenerationProvider, PluginAdapter, SpeechProvider, StorageAdapter,
    TranscriptionProvider, Transport,
};
