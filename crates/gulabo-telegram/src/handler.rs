// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of Telegram updates into platform-neutral [`InboundEvent`]s.
//!
//! Updates without a sender are dropped here. A message carrying a successful
//! payment becomes [`InboundEvent::PaymentConfirmed`] regardless of any text.

use gulabo_core::types::{
    CallbackQuery, ChatId, InboundEvent, InboundMessage, MessageContent, PaymentConfirmation,
    PaymentEvent, PreCheckoutQuery, UserId, UserProfile, VoiceRef,
};
use serde::Serialize;
use teloxide::types::{Message, User};
use tracing::debug;

/// Renders an identifier the way the Bot API transmits it.
///
/// Telegram identifiers are JSON strings; newtype wrappers serialize
/// transparently, so this yields the raw id for both plain and wrapped fields.
pub fn wire_string<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        Ok(other) => other.to_string(),
        Err(_) => String::new(),
    }
}

/// Maps a Telegram user to the sender profile attached to events.
pub fn sender_profile(user: &User) -> UserProfile {
    UserProfile {
        id: UserId(user.id.0 as i64),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
    }
}

/// Converts a chat message. Returns `None` when the message has no sender.
pub fn message_to_event(msg: &Message) -> Option<InboundEvent> {
    let Some(user) = msg.from.as_ref() else {
        debug!(msg_id = msg.id.0, "ignoring message without sender");
        return None;
    };
    let sender = sender_profile(user);
    let chat_id = ChatId(msg.chat.id.0);

    if let Some(payment) = msg.successful_payment() {
        return Some(InboundEvent::PaymentConfirmed(PaymentEvent {
            chat_id,
            sender,
            payment: PaymentConfirmation {
                payload: payment.invoice_payload.clone(),
                total_amount: payment.total_amount,
                currency: payment.currency.clone(),
                charge_id: wire_string(&payment.telegram_payment_charge_id),
            },
        }));
    }

    let content = if let Some(text) = msg.text() {
        MessageContent::Text(text.to_string())
    } else if let Some(voice) = msg.voice() {
        MessageContent::Voice(VoiceRef {
            file_id: wire_string(&voice.file.id),
            duration_secs: voice.duration.seconds(),
        })
    } else {
        MessageContent::Unsupported
    };

    Some(InboundEvent::Message(InboundMessage {
        id: msg.id.0.to_string(),
        chat_id,
        sender,
        content,
        timestamp: msg.date.to_rfc3339(),
    }))
}

/// Converts an inline-button press.
///
/// Offers are only sent in private chats, where the chat id equals the user id.
pub fn callback_to_event(query: &teloxide::types::CallbackQuery) -> InboundEvent {
    InboundEvent::Callback(CallbackQuery {
        id: wire_string(&query.id),
        chat_id: ChatId(query.from.id.0 as i64),
        sender: sender_profile(&query.from),
        data: query.data.clone(),
    })
}

/// Converts a pre-checkout query.
pub fn pre_checkout_to_event(query: &teloxide::types::PreCheckoutQuery) -> InboundEvent {
    InboundEvent::PreCheckout(PreCheckoutQuery {
        id: wire_string(&query.id),
        sender: sender_profile(&query.from),
        payload: query.invoice_payload.clone(),
        total_amount: query.total_amount,
        currency: query.currency.clone(),
    })
}
