//! The instruction template sent with every extraction.
//!
//! The instructions are a versioned constant rather than something assembled
//! per call: any wording change must bump [`PROMPT_VERSION`], and the version
//! is recorded in every [`crate::output::ExtractionOutput`] so two results can
//! be traced back to the exact prompt that produced them.
//!
//! The list is not user-editable. The model is fixed too: [`DEFAULT_MODEL`]
//! for the default OpenAI endpoint, [`vision_model_for`] for the other
//! providers reachable through edgequake-llm.

/// Revision of [`INSTRUCTIONS`]. Bump on every wording change.
pub const PROMPT_VERSION: u32 = 1;

/// Vision model used against the OpenAI chat-completions endpoint.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// MIME type of every image payload (the normalizer always emits JPEG).
pub const IMAGE_MIME: &str = "image/jpeg";

/// Ordered instruction strings. Sent as separate text parts, in this order,
/// before the image part.
pub const INSTRUCTIONS: &[&str] = &[
    "Extract the mathematical equation in the provided image as LaTeX code.",
    "Follow these strict guidelines:",
    "- Output only the LaTeX code without additional text.",
    "- Do not simplify equations.",
    "- Do not add documentclass, packages, or begindocument.",
    "- Do not include dollar signs ($) around the LaTeX code.",
    "- Do not explain symbols in the equation.",
];

/// The instructions as one newline-joined block.
///
/// Used for providers whose message type carries a single text field next to
/// the image attachments.
pub fn instruction_text() -> String {
    INSTRUCTIONS.join("\n")
}

/// Fixed vision model for a provider name, or `None` if the provider has no
/// known vision model.
pub fn vision_model_for(provider: &str) -> Option<&'static str> {
    match provider.to_ascii_lowercase().as_str() {
        "openai" => Some(DEFAULT_MODEL),
        "azure" => Some(DEFAULT_MODEL),
        "anthropic" => Some("claude-sonnet-4-20250514"),
        "gemini" => Some("gemini-2.0-flash"),
        "mistral" => Some("pixtral-12b-2409"),
        "ollama" | "lmstudio" => Some("llava"),
        "openrouter" => Some("openai/gpt-4o"),
        _ => None,
    }
}
