// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hosted inference provider traits: generation, transcription, speech synthesis.
//!
//! Implementations apply their own concurrency cap and retry policy. A
//! returned error is terminal; callers must not retry.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::GulaboError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{SpeechAudio, Transcription, Turn};

/// Language generation over a conversation history.
#[async_trait]
pub trait GenerationProvider: PluginAdapter {
    /// Generates the assistant's reply to `input`, given the prior `history`.
    async fn generate(
        &self,
        history: &[Turn],
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<String, GulaboError>;
}

/// Speech-to-text.
#[async_trait]
pub trait TranscriptionProvider: PluginAdapter {
    /// Transcribes raw audio. An empty transcript is a valid result.
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<Transcription, GulaboError>;
}

/// Text-to-speech.
#[async_trait]
pub trait SpeechProvider: PluginAdapter {
    /// Synthesizes `text` into encoded audio ready to send.
    async fn synthesize(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<SpeechAudio, GulaboError>;
}
