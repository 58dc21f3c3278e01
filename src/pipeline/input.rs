//! Input loading: read a user-supplied image into an [`UploadedImage`].
//!
//! The format is sniffed from the magic bytes rather than trusted from the
//! file extension, so a PNG saved as `equation.jpg` still decodes. Only PNG
//! and JPEG are accepted. The check happens here so a GIF or a PDF fails
//! with a clear decode error before any bytes are sent to the endpoint.

use crate::error::{ExtractionError, Img2LatexError};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Png,
    Jpeg,
}

impl SourceFormat {
    pub(crate) fn image_format(self) -> ImageFormat {
        match self {
            SourceFormat::Png => ImageFormat::Png,
            SourceFormat::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// An uploaded image blob. Lives only for the duration of one extraction.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    bytes: Vec<u8>,
    format: SourceFormat,
    name: Option<String>,
}

impl UploadedImage {
    /// Wrap raw bytes, sniffing the format.
    ///
    /// Returns [`ExtractionError::Decode`] for anything that is not PNG or JPEG.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, ExtractionError> {
        let bytes = bytes.into();
        let format = sniff_format(&bytes)?;
        Ok(Self {
            bytes,
            format,
            name: None,
        })
    }

    /// Attach a display name (usually the file name).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    /// Display name, or `"upload"` when none was given.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("upload")
    }
}

/// Detect PNG or JPEG from the leading bytes.
pub fn sniff_format(bytes: &[u8]) -> Result<SourceFormat, ExtractionError> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => Ok(SourceFormat::Png),
        Ok(ImageFormat::Jpeg) => Ok(SourceFormat::Jpeg),
        Ok(other) => Err(ExtractionError::Decode {
            detail: format!("unsupported image format {other:?}; expected PNG or JPEG"),
        }),
        Err(_) => Err(ExtractionError::Decode {
            detail: "unrecognised image data; expected PNG or JPEG".to_string(),
        }),
    }
}

/// Read an image file from disk.
///
/// Missing or unreadable files are fatal ([`Img2LatexError`]); a readable
/// file in the wrong format is an extraction failure wrapped in
/// [`Img2LatexError::Extraction`].
pub async fn load_image(path: &Path) -> Result<UploadedImage, Img2LatexError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Img2LatexError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => Img2LatexError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Img2LatexError::Internal(format!("reading {}: {e}", path.display())),
    })?;

    debug!("Read {} bytes from {}", bytes.len(), path.display());

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(UploadedImage::from_bytes(bytes)?.with_name(name))
}
