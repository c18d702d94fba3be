// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Gulabo backend.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Opaque external identity of an end user (the chat platform's user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the chat a reply is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a message sent through the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Generation,
    Transcription,
    Speech,
    Storage,
}

// --- Users and conversations ---

/// Sender identity attached to every inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: UserId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

/// A persisted user record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    /// ISO 8601 timestamp of the first inbound event from this identity.
    pub onboarded_at: String,
}

/// A persisted conversation: one per user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub user_id: UserId,
    /// Serialized ordered list of [`Turn`]s. Decoded by the pipeline, never by storage.
    pub messages: String,
    pub updated_at: String,
}

/// Who produced a turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One role-tagged unit of conversation text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// --- Inbound events ---

/// One unit of work delivered by the transport.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// A chat message (text, voice, or something unsupported).
    Message(InboundMessage),
    /// A press on one of the bot's inline buttons.
    Callback(CallbackQuery),
    /// The payment provider asks whether checkout may proceed.
    PreCheckout(PreCheckoutQuery),
    /// A completed payment.
    PaymentConfirmed(PaymentEvent),
}

impl InboundEvent {
    /// The user the event originates from.
    pub fn sender(&self) -> &UserProfile {
        match self {
            InboundEvent::Message(m) => &m.sender,
            InboundEvent::Callback(c) => &c.sender,
            InboundEvent::PreCheckout(p) => &p.sender,
            InboundEvent::PaymentConfirmed(p) => &p.sender,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Message(_) => "message",
            InboundEvent::Callback(_) => "callback",
            InboundEvent::PreCheckout(_) => "pre_checkout",
            InboundEvent::PaymentConfirmed(_) => "payment",
        }
    }
}

/// An inbound chat message.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    pub chat_id: ChatId,
    pub sender: UserProfile,
    pub content: MessageContent,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

/// Content of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    Text(String),
    Voice(VoiceRef),
    /// Stickers, photos, locations and anything else the bot does not handle.
    Unsupported,
}

/// Reference to a voice note that must be fetched from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceRef {
    pub file_id: String,
    pub duration_secs: u32,
}

/// A press on an inline button.
#[derive(Debug, Clone)]
pub struct CallbackQuery {
    /// Transport-scoped id used to acknowledge the press.
    pub id: String,
    pub chat_id: ChatId,
    pub sender: UserProfile,
    pub data: Option<String>,
}

/// A pre-checkout confirmation request.
#[derive(Debug, Clone)]
pub struct PreCheckoutQuery {
    pub id: String,
    pub sender: UserProfile,
    pub payload: String,
    pub total_amount: u32,
    pub currency: String,
}

/// A completed payment and where to confirm it.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub chat_id: ChatId,
    pub sender: UserProfile,
    pub payment: PaymentConfirmation,
}

/// Details of a successful payment as reported by the payment rails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    /// Tier token set on the invoice. The only trusted correlator.
    pub payload: String,
    /// Amount the user paid. Informational only, never used for crediting.
    pub total_amount: u32,
    pub currency: String,
    /// Transaction id assigned by the payment rails.
    pub charge_id: String,
}

// --- Outbound payloads ---

/// An invoice to present to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub title: String,
    pub description: String,
    pub payload: String,
    pub currency: String,
    pub amount: u32,
}

/// One button of a recharge offer. Pressing it sends `payload` back as callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferButton {
    pub label: String,
    pub payload: String,
}

/// A command advertised in the chat client's command menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotCommandInfo {
    pub command: String,
    pub description: String,
}

// --- Provider results ---

/// Result of a transcription call. `text` may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transcription {
    pub text: String,
}

/// Encoded audio returned by a speech-synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechAudio {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

// --- Ledger results ---

/// Outcome of crediting a confirmed payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentCredit {
    /// Credits were added; `balance` is the new balance.
    Applied { balance: i64 },
    /// The charge id was already processed; nothing changed.
    Duplicate { balance: i64 },
}

impl PaymentCredit {
    pub fn balance(&self) -> i64 {
        match self {
            PaymentCredit::Applied { balance } | PaymentCredit::Duplicate { balance } => *balance,
        }
    }
}
