// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport trait for the chat platform integration.

use async_trait::async_trait;

use crate::error::GulaboError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{BotCommandInfo, ChatId, InboundEvent, Invoice, MessageId, OfferButton, VoiceRef};

/// Bidirectional chat transport.
///
/// Delivers an ordered stream of inbound events and performs the outbound
/// operations the pipeline and the recharge flow need.
#[async_trait]
pub trait Transport: PluginAdapter {
    /// Starts receiving updates from the platform.
    async fn connect(&mut self) -> Result<(), GulaboError>;

    /// Publishes the command menu shown by chat clients.
    async fn register_commands(&self, commands: &[BotCommandInfo]) -> Result<(), GulaboError>;

    /// Receives the next inbound event. Returns [`GulaboError::TransportClosed`]
    /// once the stream has ended.
    async fn receive(&self) -> Result<InboundEvent, GulaboError>;

    /// Sends a plain text message.
    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId, GulaboError>;

    /// Sends encoded audio as a voice message.
    async fn send_voice(
        &self,
        chat: ChatId,
        audio: Vec<u8>,
        file_name: &str,
    ) -> Result<MessageId, GulaboError>;

    /// Sends a text message with one button per offer, one button per row.
    async fn send_offer(
        &self,
        chat: ChatId,
        text: &str,
        buttons: &[OfferButton],
    ) -> Result<MessageId, GulaboError>;

    /// Sends an invoice through the platform's payment rails.
    async fn send_invoice(&self, chat: ChatId, invoice: &Invoice) -> Result<MessageId, GulaboError>;

    /// Acknowledges a button press so the client stops its spinner.
    async fn answer_callback(&self, callback_id: &str) -> Result<(), GulaboError>;

    /// Answers a pre-checkout query.
    async fn answer_pre_checkout(&self, query_id: &str, ok: bool) -> Result<(), GulaboError>;

    /// Downloads the audio behind a voice reference.
    ///
    /// Two steps: resolve the file's direct location, then download its bytes.
    async fn fetch_voice(&self, voice: &VoiceRef) -> Result<Vec<u8>, GulaboError>;
}
