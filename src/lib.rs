//! # edgequake-img2latex
//!
//! Extract LaTeX from an image of an equation using a Vision Language Model.
//!
//! Recognition is delegated entirely to the model. This crate prepares
//! the image, sends one request with a fixed set of output rules, and hands
//! back the text. Nothing in here parses or typesets LaTeX.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image (PNG/JPEG)
//!  │
//!  ├─ 1. Input    read bytes, sniff PNG/JPEG from magic bytes
//!  ├─ 2. Encode   decode → RGB (alpha dropped) → JPEG → base64 data URI
//!  ├─ 3. Request  versioned instruction list + image, fixed model
//!  ├─ 4. VLM      one completion call; first choice returned verbatim
//!  ├─ 5. Lint     flag delimiters / prose / scaffolding (never rewrites)
//!  └─ 6. Session  success replaces the stored result; failure keeps it
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_img2latex::{extract_file, ExtractorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credential read from OPENAI_API_KEY
//!     let config = ExtractorConfig::default();
//!     let output = extract_file("equation.png", &config).await?;
//!     println!("{}", output.latex);
//!     Ok(())
//! }
//! ```
//!
//! ## Sessions
//!
//! Interactive callers keep a [`Session`] and feed it every outcome:
//!
//! ```rust,no_run
//! use edgequake_img2latex::{display, Extractor, ExtractorConfig, Session, UploadedImage};
//!
//! # async fn run(bytes: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = Extractor::new(ExtractorConfig::default())?;
//! let mut session = Session::new();
//!
//! let upload = UploadedImage::from_bytes(bytes)?;
//! if let Some(err) = session.apply(extractor.extract(&upload).await) {
//!     eprintln!("Error processing image: {err}");
//! }
//! if let Some(view) = display::view(&session) {
//!     println!("{}", display::code_block(&view.code));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `img2latex` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod display;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractorConfig, ExtractorConfigBuilder};
pub use error::{ExtractionError, Img2LatexError};
pub use extract::{extract_bytes, extract_file, extract_sync, inspect, Extractor};
pub use output::{ExtractionOutput, ImageMetadata};
pub use pipeline::encode::EncodedImagePayload;
pub use pipeline::input::{SourceFormat, UploadedImage};
pub use pipeline::llm::{ProviderBackend, VisionBackend};
pub use pipeline::openai::OpenAiBackend;
pub use pipeline::postprocess::{render_ready, OutputWarning};
pub use pipeline::request::ExtractionRequest;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::Session;
