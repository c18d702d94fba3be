// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport for the Gulabo bot backend.
//!
//! Implements [`Transport`] for the Telegram Bot API via teloxide. Updates
//! are received by long polling on a background task and handed to the
//! bot loop through a bounded channel.

pub mod handler;
pub mod markup;
pub mod media;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use gulabo_config::model::TelegramConfig;
use gulabo_core::GulaboError;
use gulabo_core::traits::{PluginAdapter, Transport};
use gulabo_core::types::{
    AdapterType, BotCommandInfo, ChatId, HealthStatus, InboundEvent, Invoice, MessageId,
    OfferButton, VoiceRef,
};
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::types::{InputFile, Recipient};
use teloxide::update_listeners::Polling;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Capacity of the channel between the polling task and the bot loop.
const INBOUND_CAPACITY: usize = 100;

/// Queries received but not yet answered, keyed by their Bot API id.
#[derive(Default)]
struct PendingQueries {
    callbacks: DashMap<String, teloxide::types::CallbackQuery>,
    checkouts: DashMap<String, teloxide::types::PreCheckoutQuery>,
}

/// Telegram transport implementing [`Transport`].
pub struct TelegramTransport {
    bot: Bot,
    config: TelegramConfig,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundEvent>>,
    /// Moved into the polling task on connect; the stream closes when it exits.
    inbound_tx: Option<mpsc::Sender<InboundEvent>>,
    pending: Arc<PendingQueries>,
    stop: CancellationToken,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramTransport {
    /// Creates a new Telegram transport.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: TelegramConfig) -> Result<Self, GulaboError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            GulaboError::Config(
                "telegram.bot_token is required. Set it in config or TELEGRAM_BOT_TOKEN.".into(),
            )
        })?;

        if token.trim().is_empty() {
            return Err(GulaboError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);

        Ok(Self {
            bot,
            config,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx: Some(inbound_tx),
            pending: Arc::new(PendingQueries::default()),
            stop: CancellationToken::new(),
            polling_handle: None,
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

fn send_err(action: &str, e: teloxide::RequestError) -> GulaboError {
    GulaboError::Transport {
        message: format!("failed to {action}: {e}"),
        source: Some(Box::new(e)),
    }
}

async fn forward(tx: &mpsc::Sender<InboundEvent>, event: InboundEvent) {
    if tx.send(event).await.is_err() {
        warn!("inbound channel closed, dropping update");
    }
}

#[async_trait]
impl PluginAdapter for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, GulaboError> {
        if let Some(handle) = &self.polling_handle
            && handle.is_finished()
        {
            return Ok(HealthStatus::Degraded("long polling has stopped".into()));
        }
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), GulaboError> {
        debug!("Telegram transport shutting down");
        self.stop.cancel();
        Ok(())
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn connect(&mut self) -> Result<(), GulaboError> {
        let Some(inbound_tx) = self.inbound_tx.take() else {
            return Ok(());
        };

        let bot = self.bot.clone();
        let stop = self.stop.clone();
        let verbose = self.config.debug;
        let poll_timeout = Duration::from_secs(u64::from(self.config.poll_timeout_secs));

        let msg_tx = inbound_tx.clone();
        let cb_tx = inbound_tx.clone();
        let pq_tx = inbound_tx;
        let cb_pending = self.pending.clone();
        let pq_pending = self.pending.clone();

        info!(timeout_secs = poll_timeout.as_secs(), "starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let handler = dptree::entry()
                .branch(Update::filter_message().endpoint(move |msg: Message| {
                    let tx = msg_tx.clone();
                    async move {
                        if verbose {
                            debug!(msg_id = msg.id.0, chat_id = msg.chat.id.0, "message update");
                        }
                        if let Some(event) = handler::message_to_event(&msg) {
                            forward(&tx, event).await;
                        }
                        respond(())
                    }
                }))
                .branch(Update::filter_callback_query().endpoint(
                    move |query: teloxide::types::CallbackQuery| {
                        let tx = cb_tx.clone();
                        let pending = cb_pending.clone();
                        async move {
                            let event = handler::callback_to_event(&query);
                            if let InboundEvent::Callback(c) = &event {
                                pending.callbacks.insert(c.id.clone(), query);
                            }
                            forward(&tx, event).await;
                            respond(())
                        }
                    },
                ))
                .branch(Update::filter_pre_checkout_query().endpoint(
                    move |query: teloxide::types::PreCheckoutQuery| {
                        let tx = pq_tx.clone();
                        let pending = pq_pending.clone();
                        async move {
                            let event = handler::pre_checkout_to_event(&query);
                            if let InboundEvent::PreCheckout(p) = &event {
                                pending.checkouts.insert(p.id.clone(), query);
                            }
                            forward(&tx, event).await;
                            respond(())
                        }
                    },
                ));

            let listener = Polling::builder(bot.clone()).timeout(poll_timeout).build();
            let mut dispatcher = Dispatcher::builder(bot, handler)
                .default_handler(|_| async {})
                .build();

            tokio::select! {
                _ = dispatcher.dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("error from Telegram update listener"),
                ) => {}
                _ = stop.cancelled() => {
                    debug!("Telegram polling stopped");
                }
            }
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn register_commands(&self, commands: &[BotCommandInfo]) -> Result<(), GulaboError> {
        self.bot
            .set_my_commands(markup::bot_commands(commands))
            .await
            .map_err(|e| send_err("register commands", e))?;
        info!(count = commands.len(), "registered bot commands");
        Ok(())
    }

    async fn receive(&self) -> Result<InboundEvent, GulaboError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or(GulaboError::TransportClosed)
    }

    async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId, GulaboError> {
        let sent = self
            .bot
            .send_message(Recipient::Id(teloxide::types::ChatId(chat.0)), text)
            .await
            .map_err(|e| send_err("send message", e))?;
        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn send_voice(
        &self,
        chat: ChatId,
        audio: Vec<u8>,
        file_name: &str,
    ) -> Result<MessageId, GulaboError> {
        let file = InputFile::memory(audio).file_name(file_name.to_string());
        let sent = self
            .bot
            .send_voice(Recipient::Id(teloxide::types::ChatId(chat.0)), file)
            .await
            .map_err(|e| send_err("send voice", e))?;
        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn send_offer(
        &self,
        chat: ChatId,
        text: &str,
        buttons: &[OfferButton],
    ) -> Result<MessageId, GulaboError> {
        let sent = self
            .bot
            .send_message(Recipient::Id(teloxide::types::ChatId(chat.0)), text)
            .reply_markup(markup::offer_keyboard(buttons))
            .await
            .map_err(|e| send_err("send offer", e))?;
        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn send_invoice(&self, chat: ChatId, invoice: &Invoice) -> Result<MessageId, GulaboError> {
        let sent = self
            .bot
            .send_invoice(
                Recipient::Id(teloxide::types::ChatId(chat.0)),
                invoice.title.clone(),
                invoice.description.clone(),
                invoice.payload.clone(),
                invoice.currency.clone(),
                markup::invoice_prices(invoice),
            )
            .await
            .map_err(|e| send_err("send invoice", e))?;
        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), GulaboError> {
        let (_, query) = self.pending.callbacks.remove(callback_id).ok_or_else(|| {
            GulaboError::Transport {
                message: format!("unknown callback query: {callback_id}"),
                source: None,
            }
        })?;
        self.bot
            .answer_callback_query(query.id)
            .await
            .map_err(|e| send_err("answer callback query", e))?;
        Ok(())
    }

    async fn answer_pre_checkout(&self, query_id: &str, ok: bool) -> Result<(), GulaboError> {
        let (_, query) = self.pending.checkouts.remove(query_id).ok_or_else(|| {
            GulaboError::Transport {
                message: format!("unknown pre-checkout query: {query_id}"),
                source: None,
            }
        })?;
        let request = self.bot.answer_pre_checkout_query(query.id, ok);
        let request = if ok {
            request
        } else {
            request.error_message("This recharge option is no longer available.")
        };
        request
            .await
            .map_err(|e| send_err("answer pre-checkout query", e))?;
        Ok(())
    }

    async fn fetch_voice(&self, voice: &VoiceRef) -> Result<Vec<u8>, GulaboError> {
        media::download_file(&self.bot, &voice.file_id).await
    }
}
