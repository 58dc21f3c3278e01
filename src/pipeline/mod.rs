//! Pipeline stages for image-to-LaTeX extraction.
//!
//! Each submodule implements exactly one step, so each is testable without
//! the others and without a network.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ request ──▶ llm / openai ──▶ postprocess
//! (bytes)   (RGB JPEG)  (prompt)    (one VLM call)   (lint, render strip)
//! ```
//!
//! 1. [`input`]: read the upload and sniff PNG/JPEG from magic bytes
//! 2. [`encode`]: decode, drop alpha, JPEG-encode and base64-wrap
//! 3. [`request`]: pair the versioned instruction list with the image
//! 4. [`llm`]: the [`llm::VisionBackend`] seam and the edgequake-llm
//!    adapter; [`openai`] is the default direct backend
//! 5. [`postprocess`]: lint the returned text and strip display delimiters
//!    for rendering

pub mod encode;
pub mod input;
pub mod llm;
pub mod openai;
pub mod postprocess;
pub mod request;
