//! Configuration types for image-to-LaTeX extraction.
//!
//! Everything the extractor needs is in [`ExtractorConfig`], built via its
//! [`ExtractorConfigBuilder`]. What is deliberately *not* here: the model
//! (fixed per provider, see [`crate::prompts`]), the instruction text, retry
//! counts and request timeouts.

use crate::error::Img2LatexError;
use crate::pipeline::encode::DEFAULT_JPEG_QUALITY;
use crate::pipeline::llm::VisionBackend;
use crate::pipeline::openai::DEFAULT_API_BASE;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Configuration for an [`crate::extract::Extractor`].
///
/// # Example
/// ```rust
/// use edgequake_img2latex::ExtractorConfig;
///
/// let config = ExtractorConfig::builder()
///     .api_key("sk-test")
///     .jpeg_quality(90)
///     .strict_output(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.jpeg_quality, 90);
/// ```
#[derive(Clone)]
pub struct ExtractorConfig {
    /// Credential for the OpenAI endpoint. If None, `OPENAI_API_KEY` is read
    /// when the extractor is built.
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API. Default: `https://api.openai.com/v1`.
    pub api_base: String,

    /// Non-OpenAI provider routed through edgequake-llm (e.g. "anthropic").
    /// If None, the direct OpenAI backend is used.
    pub provider_name: Option<String>,

    /// Pre-constructed backend. Takes precedence over everything above.
    pub backend: Option<Arc<dyn VisionBackend>>,

    /// JPEG quality for the re-encoded upload, 1–100. Default: 75.
    pub jpeg_quality: u8,

    /// Optional cap on completion tokens. Default: None (provider default).
    pub max_tokens: Option<usize>,

    /// Reject output that is not bare LaTeX instead of passing it through
    /// with warnings. Default: false.
    pub strict_output: bool,

    /// Optional busy/progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            provider_name: None,
            backend: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_tokens: None,
            strict_output: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("provider_name", &self.provider_name)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("jpeg_quality", &self.jpeg_quality)
            .field("max_tokens", &self.max_tokens)
            .field("strict_output", &self.strict_output)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractorConfig {
    /// Create a new builder for `ExtractorConfig`.
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractorConfig`].
#[derive(Debug)]
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl ExtractorConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn backend(mut self, backend: Arc<dyn VisionBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn strict_output(mut self, v: bool) -> Self {
        self.config.strict_output = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractorConfig, Img2LatexError> {
        let c = &self.config;
        if !(c.api_base.starts_with("http://") || c.api_base.starts_with("https://")) {
            return Err(Img2LatexError::InvalidConfig(format!(
                "API base must be an http(s) URL, got '{}'",
                c.api_base
            )));
        }
        if c.max_tokens == Some(0) {
            return Err(Img2LatexError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if let Some(ref key) = c.api_key {
            if key.trim().is_empty() {
                return Err(Img2LatexError::InvalidConfig("API key is empty".into()));
            }
        }
        Ok(self.config)
    }
}
