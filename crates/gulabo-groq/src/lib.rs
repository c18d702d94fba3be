// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Groq generation provider for the Gulabo bot backend.
//!
//! Implements [`GenerationProvider`] against Groq's OpenAI-compatible chat
//! completions API. Every call runs through a [`ProviderGate`], so admission
//! and retry are shared by all conversations.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use gulabo_config::model::GulaboConfig;
use gulabo_core::traits::{GenerationProvider, PluginAdapter};
use gulabo_core::types::{AdapterType, HealthStatus, Role, Turn};
use gulabo_core::GulaboError;
use gulabo_resilience::ProviderGate;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::GroqClient;
use crate::types::{ChatMessage, ChatRequest};

/// Groq-backed reply generation.
pub struct GroqProvider {
    client: GroqClient,
    gate: ProviderGate,
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl GroqProvider {
    /// Creates a provider from configuration.
    ///
    /// Fails with [`GulaboError::Config`] when no API key is configured.
    pub async fn new(config: &GulaboConfig) -> Result<Self, GulaboError> {
        let api_key = resolve_api_key(&config.groq.api_key)?;
        let client = GroqClient::new(
            &api_key,
            &config.groq.base_url,
            Duration::from_secs(config.groq.request_timeout_secs),
        )?;

        let system_prompt = load_system_prompt(
            &config.agent.name,
            &config.agent.system_prompt,
            &config.agent.system_prompt_file,
        )
        .await;

        info!(model = config.groq.model.as_str(), "groq provider initialized");

        Ok(Self {
            client,
            gate: ProviderGate::from_limits(
                "groq",
                config.groq.max_concurrency,
                config.groq.max_attempts,
                config.groq.base_delay_ms,
            ),
            model: config.groq.model.clone(),
            max_tokens: config.groq.max_tokens,
            system_prompt,
        })
    }

    /// The system prompt sent with every request.
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn build_request(&self, history: &[Turn], input: &str) -> ChatRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::new("system", self.system_prompt.as_str()));
        for turn in history {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            messages.push(ChatMessage::new(role, turn.content.as_str()));
        }
        messages.push(ChatMessage::new("user", input));

        ChatRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages,
        }
    }
}

#[async_trait]
impl PluginAdapter for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generation
    }

    async fn health_check(&self) -> Result<HealthStatus, GulaboError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GulaboError> {
        debug!("groq provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl GenerationProvider for GroqProvider {
    async fn generate(
        &self,
        history: &[Turn],
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<String, GulaboError> {
        let request = self.build_request(history, input);
        debug!(turns = history.len(), "requesting completion");
        self.gate
            .call(cancel, || self.client.complete(&request))
            .await
    }
}

fn resolve_api_key(config_key: &Option<String>) -> Result<SecretString, GulaboError> {
    match config_key {
        Some(key) if !key.trim().is_empty() => Ok(SecretString::from(key.clone())),
        _ => Err(GulaboError::Config(
            "Groq API key not found. Set groq.api_key or GROQ_SECRET_KEY.".into(),
        )),
    }
}

/// Loads the system prompt following priority: file > inline > default.
async fn load_system_prompt(
    agent_name: &str,
    inline_prompt: &Option<String>,
    prompt_file: &Option<String>,
) -> String {
    if let Some(file_path) = prompt_file {
        match tokio::fs::read_to_string(file_path).await {
            Ok(content) => {
                let trimmed = content.trim().to_string();
                if !trimmed.is_empty() {
                    info!(path = file_path.as_str(), "loaded system prompt from file");
                    return trimmed;
                }
            }
            Err(e) => {
                warn!(
                    path = file_path.as_str(),
                    error = %e,
                    "failed to read system prompt file, falling back"
                );
            }
        }
    }

    if let Some(prompt) = inline_prompt
        && !prompt.trim().is_empty()
    {
        return prompt.clone();
    }

    format!(
        "You are {agent_name}, a warm and playful companion who talks by voice. \
         Keep replies short and conversational."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(base_url: &str) -> GulaboConfig {
        let mut config = GulaboConfig::default();
        config.groq.api_key = Some("gsk-test".into());
        config.groq.base_url = base_url.to_string();
        config.groq.base_delay_ms = 1;
        config.agent.system_prompt = Some("Be kind.".into());
        config
    }

    fn completion(text: &str) -> serde_json::Value {
        serde_json::json!({"choices": [{"message": {"role": "assistant", "content": text}}]})
    }

    #[test]
    fn missing_api_key_is_config_error() {
        let err = resolve_api_key(&None).unwrap_err();
        assert!(matches!(err, GulaboError::Config(_)));
        let err = resolve_api_key(&Some("  ".into())).unwrap_err();
        assert!(err.to_string().contains("API key not found"), "got: {err}");
    }

    #[tokio::test]
    async fn new_without_key_fails() {
        let config = GulaboConfig::default();
        let result = GroqProvider::new(&config).await;
        assert!(matches!(result, Err(GulaboError::Config(_))));
    }

    #[tokio::test]
    async fn system_prompt_default_names_agent() {
        let prompt = load_system_prompt("gulabo", &None, &None).await;
        assert!(prompt.starts_with("You are gulabo,"));
    }

    #[tokio::test]
    async fn system_prompt_inline_overrides_default() {
        let prompt = load_system_prompt("gulabo", &Some("Custom prompt.".into()), &None).await;
        assert_eq!(prompt, "Custom prompt.");
    }

    #[tokio::test]
    async fn system_prompt_file_overrides_inline() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prompt.md");
        tokio::fs::write(&file, "  From file.\n").await.unwrap();
        let prompt = load_system_prompt(
            "gulabo",
            &Some("Inline.".into()),
            &Some(file.to_string_lossy().into_owned()),
        )
        .await;
        assert_eq!(prompt, "From file.");
    }

    #[tokio::test]
    async fn unreadable_prompt_file_falls_back_to_inline() {
        let prompt = load_system_prompt(
            "gulabo",
            &Some("Inline.".into()),
            &Some("/nonexistent/prompt.md".into()),
        )
        .await;
        assert_eq!(prompt, "Inline.");
    }

    #[tokio::test]
    async fn request_orders_system_history_then_input() {
        let provider = GroqProvider::new(&config_for("http://localhost:1")).await.unwrap();
        let history = vec![Turn::user("hi"), Turn::assistant("hello")];
        let req = provider.build_request(&history, "how are you");
        let roles: Vec<_> = req.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert_eq!(req.messages[0].content, "Be kind.");
        assert_eq!(req.messages[3].content, "how are you");
        assert_eq!(req.max_tokens, 2048);
    }

    #[tokio::test]
    async fn generate_retries_after_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "messages": [{"role": "system", "content": "Be kind."}, {"role": "user", "content": "hey"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("hi there")))
            .mount(&server)
            .await;

        let provider = GroqProvider::new(&config_for(&server.uri())).await.unwrap();
        let reply = provider
            .generate(&[], "hey", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reply, "hi there");
    }

    #[tokio::test]
    async fn empty_completion_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("second")))
            .mount(&server)
            .await;

        let provider = GroqProvider::new(&config_for(&server.uri())).await.unwrap();
        let reply = provider
            .generate(&[], "hey", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reply, "second");
    }

    #[tokio::test]
    async fn persistent_failure_exhausts_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let provider = GroqProvider::new(&config_for(&server.uri())).await.unwrap();
        let err = provider
            .generate(&[], "hey", &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            GulaboError::RetriesExhausted { provider, attempts, .. } => {
                assert_eq!(provider, "groq");
                assert_eq!(attempts, 3);
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("x")))
            .expect(0)
            .mount(&server)
            .await;

        let provider = GroqProvider::new(&config_for(&server.uri())).await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = provider.generate(&[], "hey", &cancel).await.unwrap_err();
        assert!(matches!(err, GulaboError::Cancelled));
    }
}
