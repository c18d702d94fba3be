// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Gulabo bot backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Deserializer, Serialize};

/// Top-level Gulabo configuration.
///
/// Built once at startup and handed to each component's constructor.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GulaboConfig {
    /// Bot identity and pipeline behavior.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Telegram transport settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Generation provider (Groq) settings.
    #[serde(default)]
    pub groq: GroqConfig,

    /// Transcription provider (Deepgram) settings.
    #[serde(default)]
    pub deepgram: DeepgramConfig,

    /// Speech-synthesis provider (Gemini) settings.
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// Bot identity and pipeline behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the bot, used in the default system prompt.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Production mode: real invoice prices, development commands disabled.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub production: bool,

    /// Inline system prompt string. Overridden by `system_prompt_file` if both set.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Path to a file containing the system prompt.
    #[serde(default)]
    pub system_prompt_file: Option<String>,

    /// Credits granted to a newly seen user.
    #[serde(default = "default_starting_credits")]
    pub starting_credits: i64,

    /// Serialize pipeline runs for the same user.
    #[serde(default = "default_true")]
    pub serialize_per_user: bool,

    /// Maximum number of inbound events handled concurrently.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// How long shutdown waits for in-flight events before giving up.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            production: false,
            system_prompt: None,
            system_prompt_file: None,
            starting_credits: default_starting_credits(),
            serialize_per_user: true,
            max_in_flight: default_max_in_flight(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

fn default_agent_name() -> String {
    "gulabo".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_starting_credits() -> i64 {
    10
}

fn default_max_in_flight() -> usize {
    64
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Telegram transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required to start the bot.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Verbose transport logging.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub debug: bool,

    /// Long-polling timeout in seconds.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u32,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            debug: false,
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

fn default_poll_timeout_secs() -> u32 {
    60
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// Attempts at opening the database during startup.
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    /// Seconds between startup connection attempts.
    #[serde(default = "default_connect_retry_secs")]
    pub connect_retry_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
            connect_attempts: default_connect_attempts(),
            connect_retry_secs: default_connect_retry_secs(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("gulabo").join("gulabo.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("gulabo.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_connect_attempts() -> u32 {
    5
}

fn default_connect_retry_secs() -> u64 {
    5
}

/// Generation provider configuration (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GroqConfig {
    /// API key. Required to start the bot.
    #[serde(default)]
    pub api_key: Option<String>,

    /// API root, without a trailing slash.
    #[serde(default = "default_groq_base_url")]
    pub base_url: String,

    /// Model identifier.
    #[serde(default = "default_groq_model")]
    pub model: String,

    /// Upper bound on generated tokens per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Size of the provider's permit pool.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Total attempts per call, first one included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the first retry; doubles each retry.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Per-request HTTP timeout.
    #[serde(default = "default_long_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_groq_base_url(),
            model: default_groq_model(),
            max_tokens: default_max_tokens(),
            max_concurrency: default_max_concurrency(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            request_timeout_secs: default_long_timeout_secs(),
        }
    }
}

fn default_groq_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_groq_model() -> String {
    "moonshotai/kimi-k2-instruct".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_max_concurrency() -> usize {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_long_timeout_secs() -> u64 {
    120
}

/// Transcription provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeepgramConfig {
    /// API key. Required to start the bot.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_deepgram_base_url")]
    pub base_url: String,

    #[serde(default = "default_deepgram_model")]
    pub model: String,

    /// Spoken language hint; `multi` enables language detection.
    #[serde(default = "default_deepgram_language")]
    pub language: String,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_deepgram_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for DeepgramConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_deepgram_base_url(),
            model: default_deepgram_model(),
            language: default_deepgram_language(),
            max_concurrency: default_max_concurrency(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            request_timeout_secs: default_deepgram_timeout_secs(),
        }
    }
}

fn default_deepgram_base_url() -> String {
    "https://api.deepgram.com/v1".to_string()
}

fn default_deepgram_model() -> String {
    "nova-3".to_string()
}

fn default_deepgram_language() -> String {
    "multi".to_string()
}

fn default_deepgram_timeout_secs() -> u64 {
    60
}

/// Speech-synthesis provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// API key. Required to start the bot.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Prebuilt voice name.
    #[serde(default = "default_gemini_voice")]
    pub voice: String,

    /// Delivery instruction prepended to the text before synthesis.
    #[serde(default)]
    pub speech_instruction: Option<String>,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_gemini_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_long_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Write every synthesized WAV to `debug_audio_dir`.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub debug_audio: bool,

    #[serde(default = "default_debug_audio_dir")]
    pub debug_audio_dir: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            voice: default_gemini_voice(),
            speech_instruction: None,
            max_concurrency: default_max_concurrency(),
            max_attempts: default_gemini_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            request_timeout_secs: default_long_timeout_secs(),
            debug_audio: false,
            debug_audio_dir: default_debug_audio_dir(),
        }
    }
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-pro-preview-tts".to_string()
}

fn default_gemini_voice() -> String {
    "Aoede".to_string()
}

fn default_gemini_max_attempts() -> u32 {
    5
}

fn default_debug_audio_dir() -> String {
    "debug_audio".to_string()
}

/// Accepts a boolean written as `true`/`false`, `1`/`0`, or a string.
///
/// Strings are true when non-empty, except `"false"` and `"0"`.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Str(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
        Flag::Str(s) => {
            let s = s.trim();
            !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "deserialize_flag")]
        flag: bool,
    }

    fn flag(json: &str) -> bool {
        serde_json::from_str::<Probe>(&format!(r#"{{"flag":{json}}}"#))
            .unwrap()
            .flag
    }

    #[test]
    fn flag_accepts_bools_numbers_and_strings() {
        assert!(flag("true"));
        assert!(!flag("false"));
        assert!(flag("1"));
        assert!(!flag("0"));
        assert!(flag(r#""yes""#));
        assert!(!flag(r#""""#));
        assert!(!flag(r#""false""#));
    }

    #[test]
    fn provider_defaults_match_service_limits() {
        let config = GulaboConfig::default();
        assert_eq!(config.groq.max_attempts, 3);
        assert_eq!(config.gemini.max_attempts, 5);
        assert_eq!(config.deepgram.model, "nova-3");
        assert_eq!(config.gemini.voice, "Aoede");
        assert_eq!(config.agent.starting_credits, 10);
    }
}
