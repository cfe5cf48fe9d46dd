//! Vision Describer: one image plus one prompt in, one description out.
//!
//! Each page is a single-turn chat request whose only user message carries
//! the prompt as text and the page as an inline base64 JPEG. There is no
//! retry: a failed call surfaces as [`InferenceError`] and the orchestrator
//! stops the run.
//!
//! The API key is passed in explicitly when the describer is built
//! ([`DescriberFactory::describer`]), so two concurrent requests with
//! different keys never observe each other's credentials.

use crate::config::AnalyzerConfig;
use crate::credentials::ApiKey;
use crate::error::InferenceError;
use crate::output::PageImage;
use crate::pipeline::encode;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, LlmError, OpenAIProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Describes one page image against a prompt.
#[async_trait]
pub trait Describer: Send + Sync {
    async fn describe(&self, image: &PageImage, prompt: &str) -> Result<String, InferenceError>;
}

/// Builds a [`Describer`] bound to one caller's credential.
pub trait DescriberFactory: Send + Sync {
    fn describer(&self, key: &ApiKey) -> Result<Arc<dyn Describer>, InferenceError>;
}

/// [`Describer`] over any edgequake-llm vision provider.
pub struct VisionDescriber {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    timeout: Duration,
}

impl VisionDescriber {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AnalyzerConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }
}

#[async_trait]
impl Describer for VisionDescriber {
    async fn describe(&self, image: &PageImage, prompt: &str) -> Result<String, InferenceError> {
        let page = image.page_num;
        let start = Instant::now();

        let messages = vec![ChatMessage::user_with_images(
            prompt,
            vec![encode::to_image_data(&image.jpeg)],
        )];

        let response = tokio::time::timeout(
            self.timeout,
            self.provider.chat(&messages, Some(&self.options)),
        )
        .await
        .map_err(|_| InferenceError::Timeout {
            page,
            secs: self.timeout.as_secs(),
        })?
        .map_err(|e| {
            let err = classify_provider_error(page, self.timeout.as_secs(), e);
            warn!("Page {}: provider call failed — {}", page, err);
            err
        })?;

        debug!(
            "Page {}: {} input tokens, {} output tokens, {:?}",
            page,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        let description = response.content.trim();
        if description.is_empty() {
            return Err(InferenceError::EmptyCompletion { page });
        }
        Ok(description.to_string())
    }
}

/// Factory producing OpenAI-backed describers, one per request key.
#[derive(Debug, Clone)]
pub struct OpenAiDescriberFactory {
    config: AnalyzerConfig,
}

impl OpenAiDescriberFactory {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl DescriberFactory for OpenAiDescriberFactory {
    fn describer(&self, key: &ApiKey) -> Result<Arc<dyn Describer>, InferenceError> {
        let provider = OpenAIProvider::new(key.expose()).with_model(self.config.model.as_str());
        Ok(Arc::new(VisionDescriber::new(Arc::new(provider), &self.config)))
    }
}

/// Build `CompletionOptions` from the config: fixed output bound, optional temperature.
fn build_options(config: &AnalyzerConfig) -> CompletionOptions {
    CompletionOptions {
        max_tokens: Some(config.max_tokens),
        temperature: config.temperature,
        ..Default::default()
    }
}

/// Map a provider error onto the inference taxonomy.
fn classify_provider_error(page: usize, timeout_secs: u64, err: LlmError) -> InferenceError {
    match err {
        LlmError::AuthError(detail) => InferenceError::Auth { detail },
        LlmError::NetworkError(detail) => InferenceError::Network { page, detail },
        LlmError::Timeout => InferenceError::Timeout {
            page,
            secs: timeout_secs,
        },
        other => InferenceError::Api {
            page,
            message: other.to_string(),
        },
    }
}
