//! Extraction entry points.
//!
//! [`Extractor`] is built once (this is where a missing credential is
//! reported) and then asked for one extraction per user action. Its
//! [`Extractor::extract`] never panics and never returns a fatal error: every
//! failure is an [`ExtractionError`], which callers treat as "no result".
//!
//! The free functions at the bottom are one-shot conveniences that build an
//! extractor, run it once, and fold both error tiers into [`Img2LatexError`].

use crate::config::ExtractorConfig;
use crate::error::{ExtractionError, Img2LatexError};
use crate::output::{ExtractionOutput, ImageMetadata};
use crate::pipeline::encode::{inspect_image, normalize_with_metadata};
use crate::pipeline::input::{load_image, UploadedImage};
use crate::pipeline::llm::{ProviderBackend, VisionBackend};
use crate::pipeline::openai::OpenAiBackend;
use crate::pipeline::postprocess::lint_latex;
use crate::pipeline::request::ExtractionRequest;
use crate::prompts::{vision_model_for, DEFAULT_MODEL, PROMPT_VERSION};
use edgequake_llm::ProviderFactory;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs extractions against one configured backend.
pub struct Extractor {
    backend: Arc<dyn VisionBackend>,
    config: ExtractorConfig,
}

impl Extractor {
    /// Build an extractor, resolving the backend from `config`.
    ///
    /// # Errors
    /// [`Img2LatexError::ProviderNotConfigured`] when no credential is
    /// available or the named provider cannot be created.
    pub fn new(config: ExtractorConfig) -> Result<Self, Img2LatexError> {
        let backend = resolve_backend(&config)?;
        info!(
            "Using provider '{}' with model '{}'",
            backend.name(),
            backend.model()
        );
        Ok(Self { backend, config })
    }

    /// Build an extractor around an explicit backend, ignoring any backend
    /// settings in `config`.
    pub fn with_backend(backend: Arc<dyn VisionBackend>, config: ExtractorConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &Arc<dyn VisionBackend> {
        &self.backend
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Normalise `image`, send one request, and return the model's text.
    ///
    /// `Err` is the "no result" signal. `Ok` with an empty `latex` is a real
    /// (if useless) result.
    pub async fn extract(&self, image: &UploadedImage) -> Result<ExtractionOutput, ExtractionError> {
        let cb = self.config.progress_callback.as_ref();
        if let Some(cb) = cb {
            cb.on_extraction_start(image.name());
        }

        let result = self.run(image).await;

        match (&result, cb) {
            (Ok(output), Some(cb)) => cb.on_extraction_complete(image.name(), output.latex.len()),
            (Err(e), Some(cb)) => cb.on_extraction_error(image.name(), &e.to_string()),
            _ => {}
        }
        if let Err(ref e) = result {
            warn!("{}: extraction failed: {}", image.name(), e);
        }
        result
    }

    async fn run(&self, image: &UploadedImage) -> Result<ExtractionOutput, ExtractionError> {
        info!("Extracting LaTeX from {}", image.name());

        // ── Step 1: Normalise ────────────────────────────────────────────────
        let (payload, metadata) = normalize_with_metadata(image, self.config.jpeg_quality)?;

        // ── Step 2: Build the request ────────────────────────────────────────
        let request = ExtractionRequest::for_model(self.backend.model(), payload)
            .with_max_tokens(self.config.max_tokens);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_request_sent(image.name(), request.image().base64().len());
        }

        // ── Step 3: One completion call ──────────────────────────────────────
        let start = Instant::now();
        let latex = self.backend.complete(&request).await?;
        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(
            "{}: {} chars of LaTeX in {}ms",
            image.name(),
            latex.len(),
            duration_ms
        );

        // ── Step 4: Lint, never rewrite ──────────────────────────────────────
        let warnings = lint_latex(&latex);
        if !warnings.is_empty() {
            let labels: Vec<String> = warnings.iter().map(|w| w.describe().to_string()).collect();
            if self.config.strict_output {
                return Err(ExtractionError::UnexpectedOutput { warnings: labels });
            }
            warn!("{}: model output has {}", image.name(), labels.join(", "));
        }

        info!("{}: extraction complete", image.name());

        Ok(ExtractionOutput {
            latex,
            provider: self.backend.name().to_string(),
            model: request.model().to_string(),
            prompt_version: PROMPT_VERSION,
            image: metadata,
            duration_ms,
            warnings,
        })
    }
}

// ── One-shot helpers ─────────────────────────────────────────────────────

/// Extract LaTeX from an image file.
pub async fn extract_file(
    path: impl AsRef<Path>,
    config: &ExtractorConfig,
) -> Result<ExtractionOutput, Img2LatexError> {
    let image = load_image(path.as_ref()).await?;
    let extractor = Extractor::new(config.clone())?;
    Ok(extractor.extract(&image).await?)
}

/// Extract LaTeX from image bytes held in memory.
pub async fn extract_bytes(
    bytes: &[u8],
    config: &ExtractorConfig,
) -> Result<ExtractionOutput, Img2LatexError> {
    let image = UploadedImage::from_bytes(bytes)?;
    let extractor = Extractor::new(config.clone())?;
    Ok(extractor.extract(&image).await?)
}

/// Synchronous wrapper around [`extract_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    path: impl AsRef<Path>,
    config: &ExtractorConfig,
) -> Result<ExtractionOutput, Img2LatexError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Img2LatexError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_file(path, config))
}

/// Read image metadata without extracting anything.
///
/// Does not require an LLM provider or API key.
pub async fn inspect(path: impl AsRef<Path>) -> Result<ImageMetadata, Img2LatexError> {
    let image = load_image(path.as_ref()).await?;
    Ok(inspect_image(&image)?)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the backend, from most-specific to least-specific:
///
/// 1. **Pre-built backend** (`config.backend`), used as-is.
/// 2. **Named provider** (`config.provider_name`) other than `openai`:
///    created through edgequake-llm's [`ProviderFactory`] with the fixed
///    vision model for that provider.
/// 3. **OpenAI** with `config.api_key`, else `OPENAI_API_KEY`.
fn resolve_backend(config: &ExtractorConfig) -> Result<Arc<dyn VisionBackend>, Img2LatexError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    if let Some(ref name) = config.provider_name {
        let name = name.to_ascii_lowercase();
        if name != "openai" {
            return create_provider_backend(&name);
        }
    }

    let api_key = config
        .api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| Img2LatexError::ProviderNotConfigured {
            provider: "openai".to_string(),
            hint: "Set OPENAI_API_KEY or pass --api-key.".to_string(),
        })?;

    Ok(Arc::new(OpenAiBackend::new(
        config.api_base.clone(),
        api_key,
        DEFAULT_MODEL,
    )))
}

fn create_provider_backend(name: &str) -> Result<Arc<dyn VisionBackend>, Img2LatexError> {
    let model = vision_model_for(name).ok_or_else(|| Img2LatexError::ProviderNotConfigured {
        provider: name.to_string(),
        hint: "No vision model is known for this provider.\n\
               Supported: openai, azure, anthropic, gemini, mistral, ollama, lmstudio, openrouter."
            .to_string(),
    })?;

    let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        Img2LatexError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })?;

    Ok(Arc::new(ProviderBackend::new(provider, name, model)))
}
