// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./gulabo.toml` > `~/.config/gulabo/gulabo.toml` > `/etc/gulabo/gulabo.toml`
//! with environment variable overrides via the `GULABO_` prefix, followed by the
//! unprefixed keys older deployments set.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::GulaboConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG: &str = "/etc/gulabo/gulabo.toml";

/// Configuration file looked up in the working directory.
pub const LOCAL_CONFIG: &str = "gulabo.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "GULABO_";

/// Config sections addressable through `GULABO_<SECTION>_<KEY>`.
const SECTIONS: &[&str] = &[
    "agent", "telegram", "storage", "groq", "deepgram", "gemini",
];

/// Unprefixed environment keys and the config key each one sets.
pub const LEGACY_ENV: &[(&str, &str)] = &[
    ("TELEGRAM_BOT_TOKEN", "telegram.bot_token"),
    ("TELEGRAM_DEBUG", "telegram.debug"),
    ("GROQ_SECRET_KEY", "groq.api_key"),
    ("DEEPGRAM_API_KEY", "deepgram.api_key"),
    ("GEMINI_SECRET_KEY", "gemini.api_key"),
    ("PRODUCTION", "agent.production"),
    ("DEBUG_AUDIO", "gemini.debug_audio"),
    ("DATABASE_PATH", "storage.database_path"),
];

/// `~/.config/gulabo/gulabo.toml`, if a config directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gulabo/gulabo.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/gulabo/gulabo.toml` (system-wide)
/// 3. `~/.config/gulabo/gulabo.toml` (user XDG config)
/// 4. `./gulabo.toml` (local directory)
/// 5. `GULABO_*` environment variables
/// 6. Legacy unprefixed environment variables ([`LEGACY_ENV`])
pub fn load_config() -> Result<GulaboConfig, figment::Error> {
    build_figment(Path::new(LOCAL_CONFIG)).extract()
}

/// Same hierarchy as [`load_config`], with `path` in place of `./gulabo.toml`.
pub fn load_config_from_path(path: &Path) -> Result<GulaboConfig, figment::Error> {
    build_figment(path).extract()
}

/// Load configuration from a TOML string only (no files, no environment).
///
/// Used for testing.
pub fn load_config_from_str(toml_content: &str) -> Result<GulaboConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(GulaboConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment(local: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(GulaboConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(local))
        .merge(env_provider())
        .merge(legacy_env_provider())
}

/// Map a prefix-stripped, lowercased env key to its dotted config key.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `telegram_bot_token` maps to `telegram.bot_token`, never `telegram.bot.token`.
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

/// Map a legacy env var name to its config key, if it is one of [`LEGACY_ENV`].
pub fn map_legacy_key(name: &str) -> Option<&'static str> {
    LEGACY_ENV
        .iter()
        .find(|(env, _)| env.eq_ignore_ascii_case(name))
        .map(|(_, key)| *key)
}

fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| map_env_key(key.as_str()).into())
}

fn legacy_env_provider() -> Env {
    Env::raw()
        .filter(|key| map_legacy_key(key.as_str()).is_some())
        .map(|key| {
            map_legacy_key(key.as_str())
                .unwrap_or_default()
                .to_string()
                .into()
        })
}
