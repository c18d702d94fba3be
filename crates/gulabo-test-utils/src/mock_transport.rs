// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic testing.
//!
//! `MockTransport` implements `Transport` with injectable inbound events and
//! captured outbound traffic for assertion in tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use gulabo_core::types::{
    AdapterType, BotCommandInfo, ChatId, HealthStatus, InboundEvent, Invoice, MessageId,
    OfferButton, VoiceRef,
};
use gulabo_core::{GulaboError, PluginAdapter, Transport};

/// One outbound call captured by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        chat: ChatId,
        text: String,
    },
    Voice {
        chat: ChatId,
        audio: Vec<u8>,
        file_name: String,
    },
    Offer {
        chat: ChatId,
        text: String,
        buttons: Vec<OfferButton>,
    },
    Invoice {
        chat: ChatId,
        invoice: Invoice,
    },
    CallbackAnswer {
        id: String,
    },
    PreCheckoutAnswer {
        id: String,
        ok: bool,
    },
    Commands(Vec<BotCommandInfo>),
}

/// A mock chat transport.
///
/// - **inbound**: events injected via `inject()` are returned by `receive()`;
///   after `close()` an empty queue yields `TransportClosed`
/// - **sent**: every outbound call is captured and retrievable via `sent()`
/// - **voice files**: audio served by `fetch_voice()`, keyed by file id
pub struct MockTransport {
    inbound: Arc<Mutex<VecDeque<InboundEvent>>>,
    sent: Arc<Mutex<Vec<Sent>>>,
    voice_files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    notify: Arc<Notify>,
    closed: AtomicBool,
    fail_voice: AtomicBool,
    fail_text: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            voice_files: Arc::new(Mutex::new(HashMap::new())),
            notify: Arc::new(Notify::new()),
            closed: AtomicBool::new(false),
            fail_voice: AtomicBool::new(false),
            fail_text: AtomicBool::new(false),
        }
    }

    /// Queue an event for `receive()`.
    pub async fn inject(&self, event: InboundEvent) {
        self.inbound.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// Mark the update stream finished. Queued events are still delivered.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Make `file_id` downloadable.
    pub async fn add_voice_file(&self, file_id: &str, audio: Vec<u8>) {
        self.voice_files
            .lock()
            .await
            .insert(file_id.to_string(), audio);
    }

    /// Make every `send_voice` fail.
    pub fn fail_voice_sends(&self, fail: bool) {
        self.fail_voice.store(fail, Ordering::SeqCst);
    }

    /// Make every `send_text` fail.
    pub fn fail_text_sends(&self, fail: bool) {
        self.fail_text.store(fail, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<Sent> {
        self.sent.lock().await.clone()
    }

    /// Texts sent through `send_text`, in order.
    pub async fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn voice_count(&self) -> usize {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|s| matches!(s, Sent::Voice { .. }))
            .count()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    async fn record(&self, sent: Sent) -> MessageId {
        self.sent.lock().await.push(sent);
        MessageId(format!("mock-msg-{}", uuid::Uuid::new_v4()))
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, GulaboError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GulaboError> {
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<(), GulaboError> {
        Ok(())
    }

    async fn register_commands(&self, commands: &[BotCommandInfo]) -> Result<(), GulaboError> {
        self.record(Sent::Commands(commands.to_vec())).await;
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, GulaboError> {
        loop {
            let notified = self.notify.notified();
            {
                let mut queue = self.inbound.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
                if self.closed.load(Ordering::SeqCst) {
                    return Err(GulaboError::TransportClosed);
                }
            }
            notified.await;
        }
    }

    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId, GulaboError> {
        if self.fail_text.load(Ordering::SeqCst) {
            return Err(GulaboError::Transport {
                message: "mock text send failure".into(),
                source: None,
            });
        }
        Ok(self
            .record(Sent::Text {
                chat,
                text: text.to_string(),
            })
            .await)
    }

    async fn send_voice(
        &self,
        chat: ChatId,
        audio: Vec<u8>,
        file_name: &str,
    ) -> Result<MessageId, GulaboError> {
        if self.fail_voice.load(Ordering::SeqCst) {
            return Err(GulaboError::Transport {
                message: "mock voice send failure".into(),
                source: None,
            });
        }
        Ok(self
            .record(Sent::Voice {
                chat,
                audio,
                file_name: file_name.to_string(),
            })
            .await)
    }

    async fn send_offer(
        &self,
        chat: ChatId,
        text: &str,
        buttons: &[OfferButton],
    ) -> Result<MessageId, GulaboError> {
        Ok(self
            .record(Sent::Offer {
                chat,
                text: text.to_string(),
                buttons: buttons.to_vec(),
            })
            .await)
    }

    async fn send_invoice(&self, chat: ChatId, invoice: &Invoice) -> Result<MessageId, GulaboError> {
        Ok(self
            .record(Sent::Invoice {
                chat,
                invoice: invoice.clone(),
            })
            .await)
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), GulaboError> {
        self.record(Sent::CallbackAnswer {
            id: callback_id.to_string(),
        })
        .await;
        Ok(())
    }

    async fn answer_pre_checkout(&self, query_id: &str, ok: bool) -> Result<(), GulaboError> {
        self.record(Sent::PreCheckoutAnswer {
            id: query_id.to_string(),
            ok,
        })
        .await;
        Ok(())
    }

    async fn fetch_voice(&self, voice: &VoiceRef) -> Result<Vec<u8>, GulaboError> {
        self.voice_files
            .lock()
            .await
            .get(&voice.file_id)
            .cloned()
            .ok_or_else(|| GulaboError::Transport {
                message: format!("unknown voice file {}", voice.file_id),
                source: None,
            })
    }
}
