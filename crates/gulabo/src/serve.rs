// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `gulabo serve` implementation.
//!
//! Opens the database, builds every adapter from the config, connects the
//! transport and runs the update loop until a shutdown signal arrives.

use std::sync::Arc;

use gulabo_agent::shutdown;
use gulabo_agent::{BotLoop, PipelineDeps};
use gulabo_config::model::GulaboConfig;
use gulabo_core::{GulaboError, PluginAdapter, Transport};
use gulabo_credits::SqliteCreditLedger;
use gulabo_deepgram::DeepgramProvider;
use gulabo_gemini::GeminiProvider;
use gulabo_groq::GroqProvider;
use gulabo_storage::{Database, SqliteStore};
use gulabo_telegram::TelegramTransport;
use tracing::{error, info, warn};

/// Runs the bot until shutdown.
pub async fn run_serve(config: GulaboConfig) -> Result<(), GulaboError> {
    init_tracing(&config);

    info!(
        agent_name = config.agent.name.as_str(),
        production = config.agent.production,
        "starting gulabo"
    );

    let db = Database::open_with_retry(&config.storage)
        .await
        .inspect_err(|e| error!(error = %e, "could not open database, giving up"))?;
    let storage = Arc::new(SqliteStore::with_database(
        config.storage.clone(),
        db.clone(),
    ));
    let ledger = Arc::new(SqliteCreditLedger::new(db.clone()));

    let generation = Arc::new(GroqProvider::new(&config).await?);
    let transcription = Arc::new(DeepgramProvider::new(&config)?);
    let speech = Arc::new(GeminiProvider::new(&config)?);
    info!("providers initialized");

    let cancel = shutdown::install_signal_handler();

    let mut telegram = TelegramTransport::new(config.telegram.clone())?;
    telegram.connect().await?;
    let transport: Arc<dyn Transport> = Arc::new(telegram);

    let bot = BotLoop::new(
        PipelineDeps {
            transport,
            storage,
            ledger,
            generation: generation.clone(),
            transcription: transcription.clone(),
            speech: speech.clone(),
        },
        &config,
    );
    if let Err(e) = bot.register_commands().await {
        warn!(error = %e, "failed to register bot commands");
    }

    bot.run(cancel).await?;

    let adapters: [&dyn PluginAdapter; 3] = [generation.as_ref(), transcription.as_ref(), speech.as_ref()];
    for adapter in adapters {
        if let Err(e) = adapter.shutdown().await {
            warn!(adapter = adapter.name(), error = %e, "adapter shutdown failed");
        }
    }
    db.close().await?;
    info!("gulabo stopped");
    Ok(())
}

/// Installs the global subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(config: &GulaboConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(default_directives(
            &config.agent.log_level,
            config.telegram.debug,
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

fn default_directives(log_level: &str, telegram_debug: bool) -> String {
    let mut directives = format!("gulabo={log_level},warn");
    if telegram_debug {
        directives.push_str(",gulabo_telegram=debug,teloxide=debug");
    }
    directives
}
