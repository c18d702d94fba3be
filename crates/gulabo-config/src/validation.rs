// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths and nonzero pool sizes.

use crate::diagnostic::ConfigError;
use crate::model::GulaboConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &GulaboConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(invalid("storage.database_path must not be empty"));
    }

    if config.storage.connect_attempts == 0 {
        errors.push(invalid("storage.connect_attempts must be at least 1"));
    }

    if config.agent.starting_credits < 0 {
        errors.push(invalid(format!(
            "agent.starting_credits must be non-negative, got {}",
            config.agent.starting_credits
        )));
    }

    if config.agent.max_in_flight == 0 {
        errors.push(invalid("agent.max_in_flight must be at least 1"));
    }

    let providers = [
        (
            "groq",
            config.groq.model.as_str(),
            config.groq.max_concurrency,
            config.groq.max_attempts,
        ),
        (
            "deepgram",
            config.deepgram.model.as_str(),
            config.deepgram.max_concurrency,
            config.deepgram.max_attempts,
        ),
        (
            "gemini",
            config.gemini.model.as_str(),
            config.gemini.max_concurrency,
            config.gemini.max_attempts,
        ),
    ];

    for (section, model, concurrency, attempts) in providers {
        if model.trim().is_empty() {
            errors.push(invalid(format!("{section}.model must not be empty")));
        }
        if concurrency == 0 {
            errors.push(invalid(format!("{section}.max_concurrency must be at least 1")));
        }
        if attempts == 0 {
            errors.push(invalid(format!("{section}.max_attempts must be at least 1")));
        }
    }

    if config.groq.max_tokens == 0 {
        errors.push(invalid("groq.max_tokens must be at least 1"));
    }

    if config.gemini.voice.trim().is_empty() {
        errors.push(invalid("gemini.voice must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}
