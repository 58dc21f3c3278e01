//! VLM interaction: the backend seam and the edgequake-llm adapter.
//!
//! [`VisionBackend`] is the one place network I/O happens. The extractor
//! holds an `Arc<dyn VisionBackend>` and calls [`VisionBackend::complete`]
//! exactly once per extraction: no retry, no backoff, no timeout beyond the
//! transport's own default.
//!
//! Two implementations ship with the crate:
//!
//! * [`crate::pipeline::openai::OpenAiBackend`]: talks to an OpenAI-style
//!   `/chat/completions` endpoint directly, sending the instructions as
//!   separate text parts. This is the default.
//! * [`ProviderBackend`]: wraps any edgequake-llm [`LLMProvider`] for
//!   Anthropic, Gemini, Mistral, Ollama and friends.
//!
//! Tests substitute their own backend to simulate endpoint success and failure.

use crate::error::ExtractionError;
use crate::pipeline::request::ExtractionRequest;
use crate::prompts::IMAGE_MIME;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use tracing::{debug, warn};

/// Sends one [`ExtractionRequest`] and returns the first choice's text verbatim.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Short provider label for logs and error messages.
    fn name(&self) -> &str;

    /// Model the request will be addressed to.
    fn model(&self) -> &str;

    /// Perform the single completion call.
    ///
    /// Must not post-process the returned text: no trimming, no delimiter
    /// stripping. An empty completion is `Ok(String::new())`.
    async fn complete(&self, request: &ExtractionRequest) -> Result<String, ExtractionError>;
}

/// [`VisionBackend`] over an edgequake-llm provider.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    name: String,
    model: String,
}

impl ProviderBackend {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        name: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            name: name.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl VisionBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    /// The provider's message type takes one text block next to the image
    /// attachments, so the instructions are newline-joined here.
    async fn complete(&self, request: &ExtractionRequest) -> Result<String, ExtractionError> {
        let image = ImageData::new(request.image().base64().to_string(), IMAGE_MIME);
        let text = request.instruction_text();
        let messages = vec![ChatMessage::user_with_images(&text, vec![image])];
        let options = build_options(request);

        match self.provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "{}: {} input tokens, {} output tokens",
                    self.name, response.prompt_tokens, response.completion_tokens
                );
                Ok(response.content)
            }
            Err(e) => {
                warn!("{}: completion failed: {}", self.name, e);
                Err(ExtractionError::Provider {
                    provider: self.name.clone(),
                    detail: e.to_string(),
                })
            }
        }
    }
}

/// Only the token cap is forwarded; sampling stays at provider defaults.
fn build_options(request: &ExtractionRequest) -> CompletionOptions {
    CompletionOptions {
        max_tokens: request.max_tokens(),
        ..Default::default()
    }
}
