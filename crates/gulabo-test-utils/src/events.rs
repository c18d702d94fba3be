// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for inbound events. Chats are private, so the chat id equals the user id.

use gulabo_core::types::{
    CallbackQuery, ChatId, InboundEvent, InboundMessage, MessageContent, PaymentConfirmation,
    PaymentEvent, PreCheckoutQuery, UserId, UserProfile, VoiceRef,
};

pub fn profile(user: i64) -> UserProfile {
    UserProfile {
        id: UserId(user),
        first_name: format!("User{user}"),
        last_name: None,
        username: Some(format!("user{user}")),
    }
}

pub fn message(user: i64, content: MessageContent) -> InboundEvent {
    InboundEvent::Message(InboundMessage {
        id: uuid::Uuid::new_v4().to_string(),
        chat_id: ChatId(user),
        sender: profile(user),
        content,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub fn text(user: i64, text: &str) -> InboundEvent {
    message(user, MessageContent::Text(text.to_string()))
}

pub fn voice(user: i64, file_id: &str) -> InboundEvent {
    message(
        user,
        MessageContent::Voice(VoiceRef {
            file_id: file_id.to_string(),
            duration_secs: 3,
        }),
    )
}

pub fn callback(user: i64, data: &str) -> InboundEvent {
    InboundEvent::Callback(CallbackQuery {
        id: format!("cb-{}", uuid::Uuid::new_v4()),
        chat_id: ChatId(user),
        sender: profile(user),
        data: Some(data.to_string()),
    })
}

pub fn pre_checkout(user: i64, payload: &str) -> InboundEvent {
    InboundEvent::PreCheckout(PreCheckoutQuery {
        id: format!("pcq-{}", uuid::Uuid::new_v4()),
        sender: profile(user),
        payload: payload.to_string(),
        total_amount: 1,
        currency: "XTR".to_string(),
    })
}

pub fn payment(user: i64, payload: &str, charge_id: &str) -> InboundEvent {
    InboundEvent::PaymentConfirmed(PaymentEvent {
        chat_id: ChatId(user),
        sender: profile(user),
        payment: PaymentConfirmation {
            payload: payload.to_string(),
            total_amount: 1,
            currency: "XTR".to_string(),
            charge_id: charge_id.to_string(),
        },
    })
}
