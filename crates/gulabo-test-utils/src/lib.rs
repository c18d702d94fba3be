// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Gulabo integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without Telegram or any hosted model.
//!
//! # Components
//!
//! - [`MockTransport`] - Scripted update stream with captured outbound traffic
//! - [`MockGeneration`], [`MockTranscription`], [`MockSpeech`] - Scripted providers
//! - [`TestHarness`] - All of the above over a temp SQLite database

pub mod events;
pub mod harness;
pub mod mock_providers;
pub mod mock_transport;

pub use harness::TestHarness;
pub use mock_providers::{MockGeneration, MockSpeech, MockTranscription};
pub use mock_transport::{MockTransport, Sent};
