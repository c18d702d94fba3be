// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deepgram transcription provider for the Gulabo bot backend.

use std::time::Duration;

use async_trait::async_trait;
use gulabo_config::model::{DeepgramConfig, GulaboConfig};
use gulabo_core::traits::{PluginAdapter, TranscriptionProvider};
use gulabo_core::types::{AdapterType, HealthStatus, Transcription};
use gulabo_core::GulaboError;
use gulabo_resilience::ProviderGate;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Voice notes arrive as Opus in an OGG container.
const AUDIO_CONTENT_TYPE: &str = "audio/ogg";

#[derive(Debug, Default, Deserialize)]
struct ListenResponse {
    #[serde(default)]
    results: Option<ListenResults>,
}

#[derive(Debug, Default, Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<Channel>,
}

#[derive(Debug, Default, Deserialize)]
struct Channel {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Default, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

impl ListenResponse {
    fn into_transcript(self) -> String {
        self.results
            .and_then(|r| r.channels.into_iter().next())
            .and_then(|c| c.alternatives.into_iter().next())
            .map(|a| a.transcript)
            .unwrap_or_default()
    }
}

/// Deepgram pre-recorded transcription.
pub struct DeepgramProvider {
    client: reqwest::Client,
    listen_url: String,
    gate: ProviderGate,
}

impl DeepgramProvider {
    /// Creates a provider from configuration.
    ///
    /// Fails with [`GulaboError::Config`] when no API key is configured.
    pub fn new(config: &GulaboConfig) -> Result<Self, GulaboError> {
        let dg = &config.deepgram;
        let api_key = match &dg.api_key {
            Some(key) if !key.trim().is_empty() => SecretString::from(key.clone()),
            _ => {
                return Err(GulaboError::Config(
                    "Deepgram API key not found. Set deepgram.api_key or DEEPGRAM_API_KEY.".into(),
                ));
            }
        };

        let mut auth = HeaderValue::from_str(&format!("Token {}", api_key.expose_secret()))
            .map_err(|e| GulaboError::Config(format!("invalid API key header value: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(AUDIO_CONTENT_TYPE));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(dg.request_timeout_secs))
            .build()
            .map_err(|e| GulaboError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        info!(model = dg.model.as_str(), language = dg.language.as_str(), "deepgram provider initialized");

        Ok(Self {
            client,
            listen_url: listen_url(dg),
            gate: ProviderGate::from_limits(
                "deepgram",
                dg.max_concurrency,
                dg.max_attempts,
                dg.base_delay_ms,
            ),
        })
    }

    async fn listen(&self, audio: Vec<u8>) -> Result<Transcription, GulaboError> {
        let response = self
            .client
            .post(&self.listen_url)
            .body(audio)
            .send()
            .await
            .map_err(|e| GulaboError::Provider {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "transcription response received");

        let body = response.text().await.map_err(|e| GulaboError::Provider {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            return Err(GulaboError::provider(format!("API returned {status}: {body}")));
        }

        let parsed: ListenResponse =
            serde_json::from_str(&body).map_err(|e| GulaboError::Provider {
                message: format!("failed to parse API response: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Transcription {
            text: parsed.into_transcript(),
        })
    }
}

fn listen_url(config: &DeepgramConfig) -> String {
    format!(
        "{}/listen?model={}&language={}&punctuate=true",
        config.base_url.trim_end_matches('/'),
        config.model,
        config.language
    )
}

#[async_trait]
impl PluginAdapter for DeepgramProvider {
    fn name(&self) -> &str {
        "deepgram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transcription
    }

    async fn health_check(&self) -> Result<HealthStatus, GulaboError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GulaboError> {
        debug!("deepgram provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl TranscriptionProvider for DeepgramProvider {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<Transcription, GulaboError> {
        debug!(bytes = audio.len(), "transcribing voice note");
        self.gate.call(cancel, || self.listen(audio.clone())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_bytes, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(base_url: &str) -> GulaboConfig {
        let mut config = GulaboConfig::default();
        config.deepgram.api_key = Some("dg-test".into());
        config.deepgram.base_url = base_url.to_string();
        config.deepgram.base_delay_ms = 1;
        config
    }

    fn transcript_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "results": {"channels": [{"alternatives": [{"transcript": text, "confidence": 0.98}]}]}
        })
    }

    #[test]
    fn missing_key_is_config_error() {
        let result = DeepgramProvider::new(&GulaboConfig::default());
        assert!(matches!(result, Err(GulaboError::Config(_))));
    }

    #[test]
    fn listen_url_carries_model_and_language() {
        let config = config_for("https://dg.example/v1/");
        assert_eq!(
            listen_url(&config.deepgram),
            "https://dg.example/v1/listen?model=nova-3&language=multi&punctuate=true"
        );
    }

    #[test]
    fn absent_transcript_reads_empty() {
        let parsed: ListenResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.into_transcript(), "");
        let parsed: ListenResponse =
            serde_json::from_str(r#"{"results":{"channels":[{"alternatives":[]}]}}"#).unwrap();
        assert_eq!(parsed.into_transcript(), "");
    }

    #[tokio::test]
    async fn posts_audio_with_token_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/listen"))
            .and(query_param("model", "nova-3"))
            .and(query_param("language", "multi"))
            .and(query_param("punctuate", "true"))
            .and(header("authorization", "Token dg-test"))
            .and(header("content-type", "audio/ogg"))
            .and(body_bytes(b"OggS-fake".to_vec()))
            .respond_with(ResponseTemplate::new(200).set_body_json(transcript_body("hello there")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = DeepgramProvider::new(&config_for(&server.uri())).unwrap();
        let result = provider
            .transcribe(b"OggS-fake".to_vec(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.text, "hello there");
    }

    #[tokio::test]
    async fn silence_yields_empty_transcript() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(transcript_body("")))
            .expect(1)
            .mount(&server)
            .await;

        let provider = DeepgramProvider::new(&config_for(&server.uri())).unwrap();
        let result = provider
            .transcribe(vec![0u8; 16], &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.text.is_empty());
    }

    #[tokio::test]
    async fn retries_resend_the_same_audio() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_bytes(vec![1u8, 2, 3]))
            .respond_with(ResponseTemplate::new(200).set_body_json(transcript_body("ok")))
            .mount(&server)
            .await;

        let provider = DeepgramProvider::new(&config_for(&server.uri())).unwrap();
        let result = provider
            .transcribe(vec![1, 2, 3], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.text, "ok");
    }
}
