//! Error types for the edgequake-img2latex library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Img2LatexError`]: **Fatal**: the tool cannot run at all (image file
//!   missing, provider not configured, report cannot be written). Returned as
//!   `Err(Img2LatexError)` from construction and file helpers.
//!
//! * [`ExtractionError`]: **Non-fatal**: one extraction failed (corrupt
//!   image, network blip, bad credential, unparseable response). The session
//!   keeps its previous result and shows the error as a notice, so the user
//!   can simply try again with another image.
//!
//! `ExtractionError` is `Clone + Serialize` because it is stored in the
//! session notice and emitted in JSON output.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-img2latex library.
#[derive(Debug, Error)]
pub enum Img2LatexError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Provider errors ───────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// A one-shot helper ran the extraction and it failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file (LaTeX, HTML report).
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a single extraction produced no result.
///
/// Every variant means "no result": the caller must not overwrite a
/// previously stored result when it receives one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionError {
    /// The upload is not a decodable PNG or JPEG.
    #[error("Could not decode image: {detail}")]
    Decode { detail: String },

    /// JPEG re-encoding of a decoded image failed.
    #[error("Could not re-encode image as JPEG: {detail}")]
    Encode { detail: String },

    /// The request never produced an HTTP response (DNS, TLS, connection reset, …).
    #[error("Request to the vision endpoint failed: {detail}")]
    Transport { detail: String },

    /// The endpoint rejected the credential (HTTP 401/403).
    #[error("Authentication rejected by the vision endpoint (HTTP {status}): {detail}")]
    Auth { status: u16, detail: String },

    /// The endpoint answered with any other non-success status.
    #[error("Vision endpoint returned HTTP {status}: {detail}")]
    Endpoint { status: u16, detail: String },

    /// The endpoint answered 2xx but the body had no usable first choice.
    #[error("Malformed response from the vision endpoint: {detail}")]
    MalformedResponse { detail: String },

    /// A non-OpenAI provider (via edgequake-llm) returned an error.
    #[error("Provider '{provider}' failed: {detail}")]
    Provider { provider: String, detail: String },

    /// Strict mode: the model ignored the output rules.
    #[error("Model output is not bare LaTeX: {}", warnings.join(", "))]
    UnexpectedOutput { warnings: Vec<String> },
}

impl ExtractionError {
    /// Short machine-friendly label for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionError::Decode { .. } => "decode",
            ExtractionError::Encode { .. } => "encode",
            ExtractionError::Transport { .. } => "transport",
            ExtractionError::Auth { .. } => "auth",
            ExtractionError::Endpoint { .. } => "endpoint",
            ExtractionError::MalformedResponse { .. } => "malformed_response",
            ExtractionError::Provider { .. } => "provider",
            ExtractionError::UnexpectedOutput { .. } => "unexpected_output",
        }
    }
}

impl From<image::ImageError> for ExtractionError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::Encoding(_) => ExtractionError::Encode {
                detail: e.to_string(),
            },
            other => ExtractionError::Decode {
                detail: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_display() {
        let e = ExtractionError::Auth {
            status: 401,
            detail: "invalid key".into(),
        };
        assert!(e.to_string().contains("401"));
        assert!(e.to_string().contains("invalid key"));
        assert_eq!(e.kind(), "auth");
    }

    #[test]
    fn unexpected_output_lists_warnings() {
        let e = ExtractionError::UnexpectedOutput {
            warnings: vec!["dollar delimiters".into(), "prose text".into()],
        };
        assert_eq!(
            e.to_string(),
            "Model output is not bare LaTeX: dollar delimiters, prose text"
        );
    }

    #[test]
    fn extraction_error_serialises_with_kind_tag() {
        let e = ExtractionError::Transport {
            detail: "connection refused".into(),
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["kind"], "transport");
        assert_eq!(json["detail"], "connection refused");
    }

    #[test]
    fn extraction_error_converts_into_fatal() {
        let e: Img2LatexError = ExtractionError::Decode {
            detail: "bad magic".into(),
        }
        .into();
        assert_eq!(e.to_string(), "Could not decode image: bad magic");
    }

    #[test]
    fn provider_not_configured_display() {
        let e = Img2LatexError::ProviderNotConfigured {
            provider: "openai".into(),
            hint: "Set OPENAI_API_KEY".into(),
        };
        assert!(e.to_string().contains("openai"));
        assert!(e.to_string().contains("OPENAI_API_KEY"));
    }
}
