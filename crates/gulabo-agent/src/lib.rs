// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Update loop, message pipeline and recharge flow for the Gulabo bot.
//!
//! The [`BotLoop`] is the central coordinator that:
//! - Receives events from the transport, one at a time
//! - Bounds concurrent runs by `max_in_flight`
//! - Runs each through the [`MessagePipeline`] on a tracked task
//! - Serializes runs for the same user when configured to
//! - Drains in-flight runs on shutdown

pub mod commands;
pub mod pipeline;
pub mod recharge;
pub mod replies;
pub mod shutdown;
pub mod user_lock;

use std::sync::Arc;
use std::time::Duration;

use gulabo_config::model::GulaboConfig;
use gulabo_core::error::GulaboError;
use gulabo_core::types::InboundEvent;
use gulabo_core::{StorageAdapter, Transport};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

pub use crate::pipeline::{MessagePipeline, Outcome, PipelineDeps, PipelineSettings, Stage};
use crate::user_lock::UserLocks;

/// Consumes the transport's update stream and dispatches pipeline runs.
pub struct BotLoop {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn StorageAdapter>,
    pipeline: Arc<MessagePipeline>,
    locks: UserLocks,
    in_flight: Arc<Semaphore>,
    tracker: TaskTracker,
    serialize_per_user: bool,
    production: bool,
    shutdown_timeout: Duration,
}

impl BotLoop {
    /// Creates the loop. The transport must already be connected.
    pub fn new(deps: PipelineDeps, config: &GulaboConfig) -> Self {
        let transport = deps.transport.clone();
        let storage = deps.storage.clone();
        let settings = PipelineSettings {
            starting_credits: config.agent.starting_credits,
            production: config.agent.production,
        };
        info!(
            agent_name = config.agent.name.as_str(),
            production = settings.production,
            max_in_flight = config.agent.max_in_flight,
            "bot loop initialized"
        );

        Self {
            transport,
            storage,
            pipeline: Arc::new(MessagePipeline::new(deps, settings)),
            locks: UserLocks::new(),
            in_flight: Arc::new(Semaphore::new(config.agent.max_in_flight.max(1))),
            tracker: TaskTracker::new(),
            serialize_per_user: config.agent.serialize_per_user,
            production: config.agent.production,
            shutdown_timeout: Duration::from_secs(config.agent.shutdown_timeout_secs),
        }
    }

    /// Publishes the command menu. Development commands are listed only
    /// outside production.
    pub async fn register_commands(&self) -> Result<(), GulaboError> {
        let menu = commands::command_menu(self.production);
        self.transport.register_commands(&menu).await?;
        info!(count = menu.len(), "bot commands registered");
        Ok(())
    }

    pub fn pipeline(&self) -> &Arc<MessagePipeline> {
        &self.pipeline
    }

    /// Runs until `cancel` fires or the transport closes, then drains
    /// in-flight runs and shuts the adapters down.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), GulaboError> {
        info!("bot loop running");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping bot loop");
                    break;
                }
                event = self.transport.receive() => {
                    match event {
                        Ok(event) => self.dispatch(event, &cancel),
                        Err(GulaboError::TransportClosed) => {
                            info!("transport closed, stopping bot loop");
                            break;
                        }
                        Err(e) => error!(error = %e, "transport receive error"),
                    }
                }
            }
        }

        shutdown::drain_in_flight(&self.tracker, self.shutdown_timeout).await;

        if let Err(e) = self.transport.shutdown().await {
            warn!(error = %e, "transport shutdown failed");
        }
        if let Err(e) = self.storage.close().await {
            warn!(error = %e, "storage close failed");
        }
        info!("bot loop stopped");
        Ok(())
    }

    /// Spawns one pipeline run.
    ///
    /// The run waits for its user's turn before taking an in-flight slot, so
    /// a backlog from one user never occupies slots other users need.
    fn dispatch(&self, event: InboundEvent, cancel: &CancellationToken) {
        let user = event.sender().id;
        let lock_user = self.serialize_per_user && matches!(event, InboundEvent::Message(_));
        let pipeline = self.pipeline.clone();
        let locks = self.locks.clone();
        let in_flight = self.in_flight.clone();
        let cancel = cancel.clone();

        self.tracker.spawn(async move {
            let kind = event.kind();
            let _guard = if lock_user {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(user_id = %user, kind, "dropping event queued during shutdown");
                        return;
                    }
                    guard = locks.lock(user) => Some(guard),
                }
            } else {
                None
            };
            let _permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(user_id = %user, kind, "dropping event queued during shutdown");
                    return;
                }
                permit = in_flight.acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => return,
                },
            };
            let outcome = pipeline.handle_event(event, &cancel).await;
            debug!(user_id = %user, kind, ?outcome, "event handled");
        });
    }
}
