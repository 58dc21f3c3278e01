//! Direct OpenAI chat-completions backend.
//!
//! Failures are classified from the transport outcome and HTTP status, never
//! from message text:
//!
//! | Outcome | Error |
//! |---------|-------|
//! | no HTTP response | [`ExtractionError::Transport`] |
//! | 401 / 403 | [`ExtractionError::Auth`] |
//! | other non-2xx | [`ExtractionError::Endpoint`] |
//! | 2xx, unusable body | [`ExtractionError::MalformedResponse`] |

use crate::error::ExtractionError;
use crate::pipeline::llm::VisionBackend;
use crate::pipeline::request::ExtractionRequest;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

/// Default OpenAI API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Error bodies longer than this are cut before being stored in an error.
const MAX_ERROR_BODY: usize = 300;

/// [`VisionBackend`] that POSTs to `{api_base}/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl VisionBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ExtractionRequest) -> Result<String, ExtractionError> {
        let url = self.endpoint();
        debug!("POST {} (model {})", url, request.model());

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request.to_chat_body())
            .send()
            .await
            .map_err(|e| {
                warn!("openai: request failed: {}", e);
                ExtractionError::Transport {
                    detail: e.to_string(),
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ExtractionError::Transport {
            detail: format!("reading response body: {e}"),
        })?;

        if !status.is_success() {
            let err = classify_status(status, &body);
            warn!("openai: {}", err);
            return Err(err);
        }

        debug!("openai: {} byte response", body.len());
        parse_completion(&body)
    }
}

/// Map a non-success status to an extraction error.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> ExtractionError {
    let detail = error_detail(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ExtractionError::Auth {
            status: status.as_u16(),
            detail,
        },
        _ => ExtractionError::Endpoint {
            status: status.as_u16(),
            detail,
        },
    }
}

/// Extract `choices[0].message.content` from a chat-completions body.
pub(crate) fn parse_completion(body: &str) -> Result<String, ExtractionError> {
    let completion: ChatCompletion =
        serde_json::from_str(body).map_err(|e| ExtractionError::MalformedResponse {
            detail: format!("invalid JSON: {e}"),
        })?;

    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ExtractionError::MalformedResponse {
            detail: "response has no choices".to_string(),
        })?;

    choice
        .message
        .content
        .ok_or_else(|| ExtractionError::MalformedResponse {
            detail: "first choice has no text content".to_string(),
        })
}

/// Prefer the API's own `error.message`; fall back to the raw (truncated) body.
fn error_detail(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }
    let trimmed = body.trim();
    if trimmed.chars().count() > MAX_ERROR_BODY {
        let cut: String = trimmed.chars().take(MAX_ERROR_BODY).collect();
        format!("{cut}\u{2026}")
    } else {
        trimmed.to_string()
    }
}

// ── Response wire types ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::normalize_image;
    use crate::pipeline::input::UploadedImage;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn request() -> ExtractionRequest {
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])))
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        let upload = UploadedImage::from_bytes(png).unwrap();
        ExtractionRequest::new(normalize_image(&upload, 75).unwrap())
    }

    /// Answer one connection with `status` and `body`; yields the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/v1", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let raw = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            raw
        });
        (base, handle)
    }

    /// Read headers plus `content-length` bytes of body.
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[tokio::test]
    async fn complete_returns_served_content_verbatim() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"\\frac{a}{b}"}}]}"#,
        )
        .await;
        let backend = OpenAiBackend::new(base, "sk-test", "gpt-4o");

        let latex = backend.complete(&request()).await.unwrap();
        assert_eq!(latex, r"\frac{a}{b}");

        let raw = server.await.unwrap();
        let lower = raw.to_ascii_lowercase();
        assert!(lower.starts_with("post /v1/chat/completions "), "{lower}");
        assert!(lower.contains("authorization: bearer sk-test"));
        assert!(raw.contains(r#""model":"gpt-4o""#));
        assert!(raw.contains("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn complete_maps_unauthorized_to_auth() {
        let (base, server) = serve_once(
            "401 Unauthorized",
            r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#,
        )
        .await;
        let backend = OpenAiBackend::new(base, "sk-wrong", "gpt-4o");

        let err = backend.complete(&request()).await.unwrap_err();
        assert_eq!(
            err,
            ExtractionError::Auth {
                status: 401,
                detail: "Incorrect API key provided".into()
            }
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn complete_maps_server_error_to_endpoint() {
        let (base, server) = serve_once("503 Service Unavailable", "upstream overloaded").await;
        let backend = OpenAiBackend::new(base, "sk-test", "gpt-4o");

        let err = backend.complete(&request()).await.unwrap_err();
        assert_eq!(
            err,
            ExtractionError::Endpoint {
                status: 503,
                detail: "upstream overloaded".into()
            }
        );
        server.await.unwrap();
    }

    #[test]
    fn first_choice_returned_verbatim() {
        let body = r#"{"choices":[
            {"index":0,"message":{"role":"assistant","content":"x^2+y^2=z^2"}},
            {"index":1,"message":{"role":"assistant","content":"ignored"}}
        ]}"#;
        assert_eq!(parse_completion(body).unwrap(), "x^2+y^2=z^2");
    }

    #[test]
    fn delimiters_are_not_stripped_here() {
        let body = r#"{"choices":[{"message":{"content":"\\[ x = 1 \\]\n"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "\\[ x = 1 \\]\n");
    }

    #[test]
    fn empty_content_is_a_result_not_an_error() {
        let body = r#"{"choices":[{"message":{"content":""}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "");
    }

    #[test]
    fn missing_choices_is_malformed() {
        let err = parse_completion(r#"{"choices":[]}"#).unwrap_err();
        assert_eq!(err.kind(), "malformed_response");
        let err = parse_completion(r#"{"id":"x"}"#).unwrap_err();
        assert_eq!(err.kind(), "malformed_response");
    }

    #[test]
    fn null_content_is_malformed() {
        let body = r#"{"choices":[{"message":{"content":null,"refusal":"no"}}]}"#;
        assert_eq!(parse_completion(body).unwrap_err().kind(), "malformed_response");
    }

    #[test]
    fn non_json_is_malformed() {
        let err = parse_completion("<html>gateway</html>").unwrap_err();
        assert!(err.to_string().contains("invalid JSON"), "got: {err}");
    }

    #[test]
    fn unauthorized_and_forbidden_are_auth_errors() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        let err = classify_status(StatusCode::UNAUTHORIZED, body);
        assert_eq!(
            err,
            ExtractionError::Auth {
                status: 401,
                detail: "Incorrect API key provided".into()
            }
        );
        assert_eq!(classify_status(StatusCode::FORBIDDEN, "").kind(), "auth");
    }

    #[test]
    fn other_statuses_are_endpoint_errors() {
        let err = classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert_eq!(
            err,
            ExtractionError::Endpoint {
                status: 429,
                detail: "slow down".into()
            }
        );
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "e".repeat(1000);
        match classify_status(StatusCode::BAD_GATEWAY, &body) {
            ExtractionError::Endpoint { detail, .. } => {
                assert_eq!(detail.chars().count(), MAX_ERROR_BODY + 1);
                assert!(detail.ends_with('\u{2026}'));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn endpoint_url_tolerates_trailing_slash() {
        let backend = OpenAiBackend::new("http://localhost:8080/v1/", "k", "gpt-4o");
        assert_eq!(backend.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}
