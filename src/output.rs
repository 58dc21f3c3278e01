//! Result types returned by the extraction pipeline.

use crate::pipeline::input::SourceFormat;
use crate::pipeline::postprocess::OutputWarning;
use serde::{Deserialize, Serialize};

/// A successful extraction.
///
/// `latex` is the model's text exactly as returned. It is untrusted: despite
/// the instructions it may contain delimiters or explanations, which is what
/// `warnings` records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Raw first-choice text.
    pub latex: String,
    /// Provider label, e.g. `"openai"`.
    pub provider: String,
    /// Model the request was addressed to.
    pub model: String,
    /// [`crate::prompts::PROMPT_VERSION`] at the time of the request.
    pub prompt_version: u32,
    /// The uploaded image, before normalisation.
    pub image: ImageMetadata,
    /// Wall-clock time of the completion call.
    pub duration_ms: u64,
    /// Deviations from bare LaTeX detected in `latex`.
    pub warnings: Vec<OutputWarning>,
}

/// Facts about an uploaded image, available without an API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Display name (file name for disk inputs).
    pub name: String,
    pub format: SourceFormat,
    pub width: u32,
    pub height: u32,
    /// Colour type as reported by the decoder, e.g. `"Rgba8"`.
    pub color: String,
    pub has_alpha: bool,
    /// Size of the uploaded blob in bytes.
    pub byte_len: usize,
}
