// SPDX-FileCopyrightText: 2026 Gulabo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock provider adapters for deterministic testing.
//!
//! Each mock pops scripted results from a FIFO queue and records its inputs.
//! An empty queue falls back to a fixed default. An optional delay plus a
//! high-water mark of concurrent calls lets tests observe scheduling.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use gulabo_core::types::{AdapterType, HealthStatus, SpeechAudio, Transcription, Turn};
use gulabo_core::{
    GenerationProvider, GulaboError, PluginAdapter, SpeechProvider, TranscriptionProvider,
};

/// Default reply when no response is scripted.
pub const DEFAULT_REPLY: &str = "mock reply";

/// A scripted step: a value, or a terminal provider failure.
type Step<T> = Result<T, String>;

struct Script<T> {
    steps: Mutex<VecDeque<Step<T>>>,
    delay: Option<Duration>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl<T> Script<T> {
    fn new(steps: Vec<Step<T>>, delay: Option<Duration>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            delay,
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    async fn next(&self, fallback: impl FnOnce() -> T, cancel: &CancellationToken) -> Result<T, GulaboError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let result = self.step(fallback, cancel).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn step(&self, fallback: impl FnOnce() -> T, cancel: &CancellationToken) -> Result<T, GulaboError> {
        if let Some(delay) = self.delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(GulaboError::Cancelled),
            }
        }
        match self.steps.lock().await.pop_front() {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(GulaboError::RetriesExhausted {
                provider: "mock".into(),
                attempts: 1,
                source: Box::new(GulaboError::provider(message)),
            }),
            None => Ok(fallback()),
        }
    }

    async fn push(&self, step: Step<T>) {
        self.steps.lock().await.push_back(step);
    }
}

macro_rules! plugin_adapter {
    ($ty:ty, $name:literal, $kind:expr) => {
        #[async_trait]
        impl PluginAdapter for $ty {
            fn name(&self) -> &str {
                $name
            }

            fn version(&self) -> semver::Version {
                semver::Version::new(0, 1, 0)
            }

            fn adapter_type(&self) -> AdapterType {
                $kind
            }

            async fn health_check(&self) -> Result<HealthStatus, GulaboError> {
                Ok(HealthStatus::Healthy)
            }

            async fn shutdown(&self) -> Result<(), GulaboError> {
                Ok(())
            }
        }
    };
}

// --- Generation ---

/// One recorded `generate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateCall {
    pub history: Vec<Turn>,
    pub input: String,
}

pub struct MockGeneration {
    script: Script<String>,
    calls: Arc<Mutex<Vec<GenerateCall>>>,
}

impl MockGeneration {
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    pub fn with_responses(responses: Vec<String>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect(), None)
    }

    /// Full control: `Err(msg)` entries fail that call.
    pub fn scripted(steps: Vec<Result<String, String>>, delay: Option<Duration>) -> Self {
        Self {
            script: Script::new(steps, delay),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn add_response(&self, text: &str) {
        self.script.push(Ok(text.to_string())).await;
    }

    pub async fn fail_next(&self) {
        self.script.push(Err("mock generation failure".into())).await;
    }

    pub async fn calls(&self) -> Vec<GenerateCall> {
        self.calls.lock().await.clone()
    }

    /// Highest number of `generate` calls observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.script.peak.load(Ordering::SeqCst)
    }
}

impl Default for MockGeneration {
    fn default() -> Self {
        Self::new()
    }
}

plugin_adapter!(MockGeneration, "mock-generation", AdapterType::Generation);

#[async_trait]
impl GenerationProvider for MockGeneration {
    async fn generate(
        &self,
        history: &[Turn],
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<String, GulaboError> {
        self.calls.lock().await.push(GenerateCall {
            history: history.to_vec(),
            input: input.to_string(),
        });
        self.script.next(|| DEFAULT_REPLY.to_string(), cancel).await
    }
}

// --- Transcription ---

pub struct MockTranscription {
    script: Script<String>,
    calls: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockTranscription {
    /// Every call returns an empty transcript unless something is scripted.
    pub fn new() -> Self {
        Self::with_transcripts(Vec::new())
    }

    pub fn with_transcripts(transcripts: Vec<String>) -> Self {
        Self {
            script: Script::new(transcripts.into_iter().map(Ok).collect(), None),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn add_transcript(&self, text: &str) {
        self.script.push(Ok(text.to_string())).await;
    }

    pub async fn fail_next(&self) {
        self.script.push(Err("mock transcription failure".into())).await;
    }

    /// Audio received by each call.
    pub async fn calls(&self) -> Vec<Vec<u8>> {
        self.calls.lock().await.clone()
    }
}

impl Default for MockTranscription {
    fn default() -> Self {
        Self::new()
    }
}

plugin_adapter!(MockTranscription, "mock-transcription", AdapterType::Transcription);

#[async_trait]
impl TranscriptionProvider for MockTranscription {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<Transcription, GulaboError> {
        self.calls.lock().await.push(audio);
        let text = self.script.next(String::new, cancel).await?;
        Ok(Transcription { text })
    }
}

// --- Speech ---

pub struct MockSpeech {
    script: Script<Vec<u8>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockSpeech {
    pub fn new() -> Self {
        Self {
            script: Script::new(Vec::new(), None),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn fail_next(&self) {
        self.script.push(Err("mock speech failure".into())).await;
    }

    /// Texts passed to `synthesize`.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

impl Default for MockSpeech {
    fn default() -> Self {
        Self::new()
    }
}

plugin_adapter!(MockSpeech, "mock-speech", AdapterType::Speech);

#[async_trait]
impl SpeechProvider for MockSpeech {
    async fn synthesize(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<SpeechAudio, GulaboError> {
        self.calls.lock().await.push(text.to_string());
        let bytes = self
            .script
            .next(|| format!("RIFF:{text}").into_bytes(), cancel)
            .await?;
        Ok(SpeechAudio {
            bytes,
            file_name: "response.wav".to_string(),
            mime_type: "audio/wav".to_string(),
        })
    }
}
