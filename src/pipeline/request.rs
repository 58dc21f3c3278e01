//! Request construction: instructions + image → one chat message.
//!
//! [`ExtractionRequest`] is built once per extraction and never mutated. The
//! wire body it produces has exactly one user-role message whose content is
//! the instruction strings as separate `text` parts, in order, followed by a
//! single `image_url` part holding the data URI.

use crate::pipeline::encode::EncodedImagePayload;
use crate::prompts::{instruction_text, DEFAULT_MODEL, INSTRUCTIONS, PROMPT_VERSION};
use serde::Serialize;

/// A fully-specified extraction request.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    model: String,
    image: EncodedImagePayload,
    max_tokens: Option<usize>,
}

impl ExtractionRequest {
    /// Address `image` to [`DEFAULT_MODEL`].
    pub fn new(image: EncodedImagePayload) -> Self {
        Self::for_model(DEFAULT_MODEL, image)
    }

    pub(crate) fn for_model(model: impl Into<String>, image: EncodedImagePayload) -> Self {
        Self {
            model: model.into(),
            image,
            max_tokens: None,
        }
    }

    pub(crate) fn with_max_tokens(mut self, max_tokens: Option<usize>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn image(&self) -> &EncodedImagePayload {
        &self.image
    }

    pub fn instructions(&self) -> &'static [&'static str] {
        INSTRUCTIONS
    }

    pub fn prompt_version(&self) -> u32 {
        PROMPT_VERSION
    }

    pub fn max_tokens(&self) -> Option<usize> {
        self.max_tokens
    }

    /// Instructions joined into one block, for single-text-field providers.
    pub fn instruction_text(&self) -> String {
        instruction_text()
    }

    /// Body for `POST /chat/completions`.
    pub fn to_chat_body(&self) -> ChatCompletionBody<'_> {
        let mut content: Vec<ContentPart<'_>> = INSTRUCTIONS
            .iter()
            .map(|text| ContentPart::Text { text: *text })
            .collect();
        content.push(ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: self.image.data_uri(),
            },
        });

        ChatCompletionBody {
            model: &self.model,
            messages: vec![ChatMessageBody {
                role: "user",
                content,
            }],
            max_tokens: self.max_tokens,
        }
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ChatCompletionBody<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessageBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessageBody<'a> {
    pub role: &'static str,
    pub content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::normalize_image;
    use crate::pipeline::input::UploadedImage;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn payload() -> EncodedImagePayload {
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])))
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        normalize_image(&UploadedImage::from_bytes(png).unwrap(), 75).unwrap()
    }

    #[test]
    fn body_has_one_user_message_with_text_parts_then_image() {
        let request = ExtractionRequest::new(payload());
        let body = serde_json::to_value(request.to_chat_body()).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");

        let content = messages[0]["content"].as_array().unwrap();
        assert_eq!(content.len(), INSTRUCTIONS.len() + 1);
        for (part, expected) in content.iter().zip(INSTRUCTIONS) {
            assert_eq!(part["type"], "text");
            assert_eq!(part["text"], *expected);
        }

        let image = content.last().unwrap();
        assert_eq!(image["type"], "image_url");
        assert!(image["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn max_tokens_omitted_unless_set() {
        let request = ExtractionRequest::new(payload());
        let body = serde_json::to_value(request.to_chat_body()).unwrap();
        assert!(body.get("max_tokens").is_none());

        let capped = ExtractionRequest::new(payload()).with_max_tokens(Some(512));
        let body = serde_json::to_value(capped.to_chat_body()).unwrap();
        assert_eq!(body["max_tokens"], 512);
    }

    #[test]
    fn request_records_prompt_version() {
        let request = ExtractionRequest::new(payload());
        assert_eq!(request.prompt_version(), PROMPT_VERSION);
        assert_eq!(request.instructions().len(), 7);
    }
}
