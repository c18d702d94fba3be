// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The message pipeline.
//!
//! One run per inbound event. A message moves through identify, load
//! conversation, command short-circuit, credit gate, modality dispatch,
//! generation, transcript persistence, synthesis/delivery and debit, in that
//! order. Provider failures abort the run silently; only the credit gate and
//! unknown commands answer with an explicit reply.

use std::sync::Arc;

use gulabo_core::transcript;
use gulabo_core::types::{
    ChatId, Conversation, InboundEvent, InboundMessage, MessageContent, Turn, UserId, UserProfile,
};
use gulabo_core::{
    CreditLedger, GenerationProvider, GulaboError, SpeechProvider, StorageAdapter,
    TranscriptionProvider, Transport,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::commands::{Command, DEV_TOP_UP};
use crate::recharge::{RechargeFlow, RechargeOutcome};
use crate::replies;

/// Characters stripped from both ends of a generated reply.
const REPLY_TRIM: &[char] = &['\\', ' ', '\'', '"', '“', '”'];

/// Where a run stopped without replying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Identify,
    LoadConversation,
    CreditGate,
    FetchAudio,
    Transcription,
    EmptyTranscript,
    Generation,
    Delivery,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do (unsupported content).
    Ignored,
    CommandHandled(Command),
    /// Balance was zero; the recharge offer was sent.
    OutOfCredits,
    Aborted(Stage),
    /// A reply was delivered. `debited` is false when the post-delivery
    /// debit failed or found the balance already at zero.
    Delivered { voice: bool, debited: bool },
    Recharge(RechargeOutcome),
}

/// Behavior switches taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub starting_credits: i64,
    pub production: bool,
}

/// Collaborators a pipeline run needs.
pub struct PipelineDeps {
    pub transport: Arc<dyn Transport>,
    pub storage: Arc<dyn StorageAdapter>,
    pub ledger: Arc<dyn CreditLedger>,
    pub generation: Arc<dyn GenerationProvider>,
    pub transcription: Arc<dyn TranscriptionProvider>,
    pub speech: Arc<dyn SpeechProvider>,
}

pub struct MessagePipeline {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn StorageAdapter>,
    ledger: Arc<dyn CreditLedger>,
    generation: Arc<dyn GenerationProvider>,
    transcription: Arc<dyn TranscriptionProvider>,
    speech: Arc<dyn SpeechProvider>,
    recharge: RechargeFlow,
    settings: PipelineSettings,
}

impl MessagePipeline {
    pub fn new(deps: PipelineDeps, settings: PipelineSettings) -> Self {
        let recharge = RechargeFlow::new(
            deps.transport.clone(),
            deps.ledger.clone(),
            settings.production,
        );
        Self {
            transport: deps.transport,
            storage: deps.storage,
            ledger: deps.ledger,
            generation: deps.generation,
            transcription: deps.transcription,
            speech: deps.speech,
            recharge,
            settings,
        }
    }

    pub fn recharge(&self) -> &RechargeFlow {
        &self.recharge
    }

    /// Handles one inbound event to completion.
    ///
    /// Payment events are settled before any user lookup.
    pub async fn handle_event(&self, event: InboundEvent, cancel: &CancellationToken) -> Outcome {
        match event {
            InboundEvent::PaymentConfirmed(payment) => {
                Outcome::Recharge(self.recharge.handle_payment(&payment).await)
            }
            InboundEvent::PreCheckout(query) => {
                Outcome::Recharge(self.recharge.handle_pre_checkout(&query).await)
            }
            InboundEvent::Callback(query) => {
                Outcome::Recharge(self.recharge.handle_callback(&query).await)
            }
            InboundEvent::Message(message) => self.handle_message(message, cancel).await,
        }
    }

    async fn handle_message(&self, message: InboundMessage, cancel: &CancellationToken) -> Outcome {
        let user = message.sender.id;
        let chat = message.chat_id;

        if let Err(e) = self.identify(&message.sender).await {
            error!(user_id = %user, error = %e, "failed to resolve user");
            return Outcome::Aborted(Stage::Identify);
        }

        let conversation = match self.load_conversation(user).await {
            Ok(c) => c,
            Err(e) => {
                error!(user_id = %user, error = %e, "failed to load conversation");
                return Outcome::Aborted(Stage::LoadConversation);
            }
        };

        if let MessageContent::Text(text) = &message.content
            && let Some(command) = Command::parse(text, self.settings.production)
        {
            self.handle_command(command, user, chat).await;
            return Outcome::CommandHandled(command);
        }

        match self.ledger.balance(user).await {
            Ok(Some(balance)) if balance > 0 => {}
            Ok(_) => {
                info!(user_id = %user, "out of credits, offering recharge");
                if let Err(e) = self.recharge.send_offer(chat, replies::OUT_OF_CREDITS).await {
                    error!(error = %e, "failed to send recharge options");
                }
                return Outcome::OutOfCredits;
            }
            Err(e) => {
                error!(user_id = %user, error = %e, "failed to check user credits");
                return Outcome::Aborted(Stage::CreditGate);
            }
        }

        let input = match &message.content {
            MessageContent::Text(text) => {
                info!(user_id = %user, chars = text.len(), "received text message");
                text.clone()
            }
            MessageContent::Voice(voice) => {
                info!(user_id = %user, duration = voice.duration_secs, "received voice message");
                let audio = match self.transport.fetch_voice(voice).await {
                    Ok(audio) => audio,
                    Err(e) => {
                        error!(user_id = %user, error = %e, "failed to download voice file");
                        return Outcome::Aborted(Stage::FetchAudio);
                    }
                };
                match self.transcription.transcribe(audio, cancel).await {
                    Ok(t) if t.text.trim().is_empty() => {
                        warn!(user_id = %user, "empty transcription");
                        return Outcome::Aborted(Stage::EmptyTranscript);
                    }
                    Ok(t) => {
                        debug!(user_id = %user, chars = t.text.len(), "transcribed voice message");
                        t.text
                    }
                    Err(e) => {
                        error!(user_id = %user, error = %e, "failed to transcribe voice");
                        return Outcome::Aborted(Stage::Transcription);
                    }
                }
            }
            MessageContent::Unsupported => {
                debug!(user_id = %user, "ignoring unsupported message type");
                return Outcome::Ignored;
            }
        };

        self.respond(user, chat, &conversation, input, cancel).await
    }

    /// Steps 6 to 9: generate, persist, deliver, debit.
    async fn respond(
        &self,
        user: UserId,
        chat: ChatId,
        conversation: &Conversation,
        input: String,
        cancel: &CancellationToken,
    ) -> Outcome {
        let mut history = transcript::decode(&conversation.messages);

        let reply = match self.generation.generate(&history, &input, cancel).await {
            Ok(text) => text.trim_matches(REPLY_TRIM).to_string(),
            Err(e) => {
                error!(user_id = %user, error = %e, "failed to generate response");
                return Outcome::Aborted(Stage::Generation);
            }
        };
        if reply.is_empty() {
            warn!(user_id = %user, "generated reply was empty after trimming");
            return Outcome::Aborted(Stage::Generation);
        }

        history.push(Turn::user(input));
        history.push(Turn::assistant(reply.clone()));
        match transcript::encode(&history) {
            Ok(encoded) => {
                if let Err(e) = self.storage.replace_messages(user, &encoded).await {
                    error!(user_id = %user, error = %e, "failed to update conversation messages");
                }
            }
            Err(e) => error!(user_id = %user, error = %e, "failed to encode conversation"),
        }

        let voice = match self.speech.synthesize(&reply, cancel).await {
            Ok(audio) => {
                let size = audio.bytes.len();
                if let Err(e) = self
                    .transport
                    .send_voice(chat, audio.bytes, &audio.file_name)
                    .await
                {
                    error!(user_id = %user, error = %e, "failed to send voice message");
                    return Outcome::Aborted(Stage::Delivery);
                }
                info!(user_id = %user, audio_size = size, "sent voice message");
                true
            }
            Err(e) => {
                error!(user_id = %user, error = %e, "failed to generate speech, sending text");
                if let Err(e) = self.transport.send_text(chat, &reply).await {
                    error!(user_id = %user, error = %e, "failed to send text response");
                    return Outcome::Aborted(Stage::Delivery);
                }
                false
            }
        };
        metrics::counter!("gulabo_replies_delivered_total").increment(1);

        let debited = match self.ledger.decrement_if_positive(user).await {
            Ok(Some(balance)) => {
                metrics::counter!("gulabo_credits_debited_total").increment(1);
                info!(user_id = %user, balance, "credit deducted after response");
                true
            }
            Ok(None) => {
                warn!(user_id = %user, "reply delivered but balance was already zero");
                false
            }
            Err(e) => {
                error!(user_id = %user, error = %e, "failed to decrement credits after sending");
                false
            }
        };

        Outcome::Delivered { voice, debited }
    }

    /// Resolves the sender, creating user, balance and conversation on first contact.
    async fn identify(&self, profile: &UserProfile) -> Result<(), GulaboError> {
        if self.storage.get_user(profile.id).await?.is_none() {
            let user = self
                .storage
                .setup_new_user(profile, self.settings.starting_credits)
                .await?;
            info!(
                user_id = %user.id,
                starting_credits = self.settings.starting_credits,
                "onboarded new user"
            );
        }
        Ok(())
    }

    async fn load_conversation(&self, user: UserId) -> Result<Conversation, GulaboError> {
        match self.storage.get_conversation(user).await? {
            Some(conversation) => Ok(conversation),
            None => {
                warn!(user_id = %user, "conversation missing, creating");
                self.storage.create_conversation(user).await
            }
        }
    }

    async fn handle_command(&self, command: Command, user: UserId, chat: ChatId) {
        debug!(user_id = %user, ?command, "handling command");
        let text = match command {
            Command::Help => replies::help(self.settings.starting_credits),
            Command::Recharge => {
                if let Err(e) = self.recharge.send_offer(chat, replies::RECHARGE_INTRO).await {
                    error!(error = %e, "failed to send recharge options");
                }
                return;
            }
            Command::DevNoCredits => {
                info!(user_id = %user, "DEV MODE: simulating user out of credits");
                if let Err(e) = self.recharge.send_offer(chat, replies::OUT_OF_CREDITS).await {
                    error!(error = %e, "failed to send recharge options");
                }
                return;
            }
            Command::Credits => match self.ledger.balance(user).await {
                Ok(balance) => replies::balance(balance.unwrap_or(0)),
                Err(e) => {
                    error!(user_id = %user, error = %e, "failed to get user credits");
                    replies::BALANCE_UNAVAILABLE.to_string()
                }
            },
            Command::Clear => match self.storage.clear_messages(user).await {
                Ok(()) => replies::HISTORY_CLEARED.to_string(),
                Err(e) => {
                    error!(user_id = %user, error = %e, "failed to clear conversation");
                    replies::CLEAR_FAILED.to_string()
                }
            },
            Command::DevSetZeroCredits => match self.ledger.reset(user).await {
                Ok(()) => replies::DEV_ZEROED.to_string(),
                Err(e) => {
                    error!(user_id = %user, error = %e, "failed to reset credits");
                    replies::DEV_ZERO_FAILED.to_string()
                }
            },
            Command::DevAddCredits => match self.ledger.increment(user, DEV_TOP_UP).await {
                Ok(balance) => replies::dev_added(DEV_TOP_UP, balance),
                Err(e) => {
                    error!(user_id = %user, error = %e, "failed to add credits");
                    replies::DEV_ADD_FAILED.to_string()
                }
            },
            Command::Unknown => replies::UNKNOWN_COMMAND.to_string(),
        };

        if let Err(e) = self.transport.send_text(chat, &text).await {
            error!(error = %e, ?command, "failed to send command reply");
        }
    }
}
