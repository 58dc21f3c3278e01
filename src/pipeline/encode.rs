//! Image normalisation: uploaded PNG/JPEG → RGB JPEG → base64 payload.
//!
//! Every upload is decoded and converted to 8-bit RGB before re-encoding,
//! whatever its source colour type. JPEG cannot carry alpha, so RGBA and
//! grey-alpha inputs lose their transparency here; the channel is dropped,
//! not composited onto a background.
//!
//! No size limit is enforced. A very large upload is decoded in full.

use crate::error::ExtractionError;
use crate::output::ImageMetadata;
use crate::pipeline::input::UploadedImage;
use crate::prompts::IMAGE_MIME;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default JPEG quality, matching the usual encoder default.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// A base64 JPEG ready to embed in a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImagePayload {
    base64: String,
    width: u32,
    height: u32,
}

impl EncodedImagePayload {
    /// Standard-alphabet base64 with padding and no line breaks.
    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `data:image/jpeg;base64,...`
    pub fn data_uri(&self) -> String {
        format!("data:{IMAGE_MIME};base64,{}", self.base64)
    }
}

/// Decode `upload`, flatten it to RGB and re-encode it as base64 JPEG.
///
/// `quality` is clamped to 1–100.
pub fn normalize_image(
    upload: &UploadedImage,
    quality: u8,
) -> Result<EncodedImagePayload, ExtractionError> {
    normalize_with_metadata(upload, quality).map(|(payload, _)| payload)
}

/// [`normalize_image`], also returning metadata about the source image.
pub fn normalize_with_metadata(
    upload: &UploadedImage,
    quality: u8,
) -> Result<(EncodedImagePayload, ImageMetadata), ExtractionError> {
    let img = decode(upload)?;
    let metadata = describe(upload, &img);

    if metadata.has_alpha {
        debug!("{}: dropping alpha channel ({})", upload.name(), metadata.color);
    }
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(&rgb)?;

    let base64 = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} image → {} bytes JPEG, {} bytes base64",
        width,
        height,
        buf.len(),
        base64.len()
    );

    let payload = EncodedImagePayload {
        base64,
        width,
        height,
    };
    Ok((payload, metadata))
}

/// Decode `upload` and report its format, size and colour type.
pub fn inspect_image(upload: &UploadedImage) -> Result<ImageMetadata, ExtractionError> {
    let img = decode(upload)?;
    Ok(describe(upload, &img))
}

fn decode(upload: &UploadedImage) -> Result<DynamicImage, ExtractionError> {
    Ok(image::load_from_memory_with_format(
        upload.bytes(),
        upload.format().image_format(),
    )?)
}

fn describe(upload: &UploadedImage, img: &DynamicImage) -> ImageMetadata {
    ImageMetadata {
        name: upload.name().to_string(),
        format: upload.format(),
        width: img.width(),
        height: img.height(),
        color: format!("{:?}", img.color()),
        has_alpha: img.color().has_alpha(),
        byte_len: upload.bytes().len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::SourceFormat;
    use image::{ColorType, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("png encode");
        buf
    }

    fn decode_payload(payload: &EncodedImagePayload) -> DynamicImage {
        let jpeg = STANDARD.decode(payload.base64()).expect("valid base64");
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
        image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg).expect("valid jpeg")
    }

    #[test]
    fn rgba_input_loses_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(12, 7, Rgba([10, 200, 30, 0])));
        let upload = UploadedImage::from_bytes(png_bytes(img)).unwrap();

        let payload = normalize_image(&upload, DEFAULT_JPEG_QUALITY).unwrap();
        let decoded = decode_payload(&payload);

        assert_eq!(decoded.color(), ColorType::Rgb8);
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn rgb_input_keeps_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 20, Rgb([255, 255, 255])));
        let upload = UploadedImage::from_bytes(png_bytes(img)).unwrap();

        let payload = normalize_image(&upload, DEFAULT_JPEG_QUALITY).unwrap();
        let decoded = decode_payload(&payload);

        assert_eq!((payload.width(), payload.height()), (64, 20));
        assert_eq!((decoded.width(), decoded.height()), (64, 20));
    }

    #[test]
    fn jpeg_input_is_reencoded() {
        let mut jpeg = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(9, 9, Rgb([0, 0, 0])))
            .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();
        let upload = UploadedImage::from_bytes(jpeg).unwrap();

        let payload = normalize_image(&upload, 90).unwrap();
        assert_eq!(decode_payload(&payload).width(), 9);
    }

    #[test]
    fn payload_is_single_line_data_uri() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 300, Rgb([1, 2, 3])));
        let upload = UploadedImage::from_bytes(png_bytes(img)).unwrap();
        let payload = normalize_image(&upload, DEFAULT_JPEG_QUALITY).unwrap();

        assert!(!payload.base64().contains('\n'));
        assert!(!payload.base64().contains('\r'));
        assert!(payload.data_uri().starts_with("data:image/jpeg;base64,/9j/"));
    }

    #[test]
    fn truncated_png_is_a_decode_error() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([9, 9, 9])));
        let mut bytes = png_bytes(img);
        bytes.truncate(40);
        let upload = UploadedImage::from_bytes(bytes).unwrap();

        let err = normalize_image(&upload, DEFAULT_JPEG_QUALITY).unwrap_err();
        assert_eq!(err.kind(), "decode");
    }

    #[test]
    fn inspect_reports_alpha_and_dimensions() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(5, 3, Rgba([0, 0, 0, 128])));
        let bytes = png_bytes(img);
        let len = bytes.len();
        let upload = UploadedImage::from_bytes(bytes).unwrap().with_name("eq.png");

        let meta = inspect_image(&upload).unwrap();
        assert_eq!(meta.name, "eq.png");
        assert_eq!(meta.format, SourceFormat::Png);
        assert_eq!((meta.width, meta.height), (5, 3));
        assert_eq!(meta.color, "Rgba8");
        assert!(meta.has_alpha);
        assert_eq!(meta.byte_len, len);
    }
}
