// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gemini speech-synthesis provider for the Gulabo bot backend.
//!
//! Gemini returns raw PCM; [`wav::pcm_to_wav`] wraps it so chat clients can
//! play it as a voice reply.

pub mod types;
pub mod wav;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use gulabo_config::model::GulaboConfig;
use gulabo_core::traits::{PluginAdapter, SpeechProvider};
use gulabo_core::types::{AdapterType, HealthStatus, SpeechAudio};
use gulabo_core::GulaboError;
use gulabo_resilience::ProviderGate;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::types::{GenerateRequest, GenerateResponse};

/// File name attached to every synthesized reply.
pub const REPLY_FILE_NAME: &str = "response.wav";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini TTS provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    endpoint: String,
    voice: String,
    speech_instruction: Option<String>,
    debug_audio_dir: Option<PathBuf>,
    gate: ProviderGate,
}

impl GeminiProvider {
    /// Creates a provider from configuration.
    ///
    /// Fails with [`GulaboError::Config`] when no API key is configured.
    pub fn new(config: &GulaboConfig) -> Result<Self, GulaboError> {
        let gm = &config.gemini;
        let api_key = match &gm.api_key {
            Some(key) if !key.trim().is_empty() => SecretString::from(key.clone()),
            _ => {
                return Err(GulaboError::Config(
                    "Gemini API key not found. Set gemini.api_key or GEMINI_SECRET_KEY.".into(),
                ));
            }
        };

        let mut key_header = HeaderValue::from_str(api_key.expose_secret())
            .map_err(|e| GulaboError::Config(format!("invalid API key header value: {e}")))?;
        key_header.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key_header);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(gm.request_timeout_secs))
            .build()
            .map_err(|e| GulaboError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let debug_audio_dir = gm.debug_audio.then(|| PathBuf::from(&gm.debug_audio_dir));
        info!(
            model = gm.model.as_str(),
            voice = gm.voice.as_str(),
            debug_audio = gm.debug_audio,
            "gemini provider initialized"
        );

        Ok(Self {
            client,
            endpoint: format!(
                "{}/models/{}:generateContent",
                gm.base_url.trim_end_matches('/'),
                gm.model
            ),
            voice: gm.voice.clone(),
            speech_instruction: gm
                .speech_instruction
                .clone()
                .filter(|s| !s.trim().is_empty()),
            debug_audio_dir,
            gate: ProviderGate::from_limits(
                "gemini",
                gm.max_concurrency,
                gm.max_attempts,
                gm.base_delay_ms,
            ),
        })
    }

    fn prompt_for(&self, text: &str) -> String {
        match &self.speech_instruction {
            Some(instruction) => format!(
                "<SystemInstruction>\n{instruction}\n</SystemInstruction>\n\n<Speech>\n{text}\n</Speech>"
            ),
            None => text.to_string(),
        }
    }

    /// One synthesis call. Returns raw PCM.
    async fn generate_pcm(&self, request: &GenerateRequest) -> Result<Vec<u8>, GulaboError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| GulaboError::Provider {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "speech response received");

        let body = response.text().await.map_err(|e| GulaboError::Provider {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            return Err(GulaboError::provider(format!("API returned {status}: {body}")));
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| GulaboError::Provider {
                message: format!("failed to parse API response: {e}"),
                source: Some(Box::new(e)),
            })?;

        let inline = parsed
            .first_inline_data()
            .ok_or_else(|| GulaboError::provider("response contained no audio"))?;

        let pcm = STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| GulaboError::Provider {
                message: format!("audio payload is not valid base64: {e}"),
                source: Some(Box::new(e)),
            })?;

        if pcm.is_empty() {
            return Err(GulaboError::provider("response audio was empty"));
        }
        Ok(pcm)
    }
}

/// Writes a copy of `wav` into `dir`. Failures are logged and otherwise ignored.
async fn write_debug_audio(dir: &Path, wav: &[u8]) {
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        warn!(dir = %dir.display(), error = %e, "failed to create debug audio directory");
        return;
    }
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S_%3f");
    let path = dir.join(format!("gemini_tts_{stamp}.wav"));
    match tokio::fs::write(&path, wav).await {
        Ok(()) => info!(path = %path.display(), bytes = wav.len(), "wrote debug audio"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to write debug audio"),
    }
}

#[async_trait]
impl PluginAdapter for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Speech
    }

    async fn health_check(&self) -> Result<HealthStatus, GulaboError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), GulaboError> {
        debug!("gemini provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl SpeechProvider for GeminiProvider {
    async fn synthesize(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<SpeechAudio, GulaboError> {
        let request = GenerateRequest::speech(self.prompt_for(text), &self.voice);
        debug!(chars = text.len(), "synthesizing reply");

        let pcm = self
            .gate
            .call(cancel, || self.generate_pcm(&request))
            .await?;
        let wav = wav::pcm_to_wav(&pcm);

        if let Some(dir) = &self.debug_audio_dir {
            write_debug_audio(dir, &wav).await;
        }

        Ok(SpeechAudio {
            bytes: wav,
            file_name: REPLY_FILE_NAME.to_string(),
            mime_type: "audio/wav".to_string(),
        })
    }
}
