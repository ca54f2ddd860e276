//! HTTP client for the assistant endpoint.
//!
//! The endpoint accepts a JSON [`ChatRequest`] and replies either with a
//! complete JSON body or, on the streaming route, with an incremental
//! `text/plain` byte stream that this module adapts into text increments.

use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::ingest::text_chunks;
use crate::observability::{CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{ChatRequest, ChatResponse};

const DEFAULT_BASE_URL: &str = "http://localhost:8000/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// A boxed stream of decoded text increments from a streaming response.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// The transport seam the chat controller drives.
///
/// One call issues one streaming request; the returned stream yields text
/// increments in arrival order and is not restartable.
#[async_trait::async_trait]
pub trait Responder: Send + Sync {
    /// Issues a streaming chat request.
    async fn stream_chat(&self, request: ChatRequest) -> Result<TextStream>;
}

/// Client for the assistant chat API.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
}

impl ChatClient {
    /// Create a new client against the default local endpoint.
    pub fn new() -> Result<Self> {
        Self::with_options(None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(format!("Failed to build HTTP client: {e}"), Some(Box::new(e)))
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Returns the base URL this client targets.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }

    /// Process a non-success response and convert it to our Error type.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };
        map_error(status_code, &body)
    }

    /// Probe the health endpoint.
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}api/v1/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }
        Ok(())
    }

    /// Send a chat request and get the complete response in one piece.
    pub async fn send(&self, mut request: ChatRequest) -> Result<ChatResponse> {
        request.stream = false;
        let url = format!("{}api/v1/chat", self.base_url);

        CLIENT_REQUESTS.click();
        let response = self
            .client
            .post(&url)
            .headers(self.default_headers())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                self.map_send_error(e)
            })?;

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        response.json::<ChatResponse>().await.map_err(|e| {
            Error::serialization(format!("Failed to parse response: {e}"), Some(Box::new(e)))
        })
    }

    /// Send a chat request and get a streaming response.
    ///
    /// Returns a stream of text increments that can be rendered as they
    /// arrive.
    pub async fn stream(&self, mut request: ChatRequest) -> Result<TextStream> {
        request.stream = true;
        let url = format!("{}api/v1/chat/stream", self.base_url);

        let mut headers = self.default_headers();
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/plain"));

        CLIENT_REQUESTS.click();
        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                self.map_send_error(e)
            })?;

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        // Convert transport errors before handing the bytes to the decoder.
        let byte_stream = Box::pin(response.bytes_stream().map(|result| {
            result
                .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
        }));

        Ok(Box::pin(text_chunks(byte_stream)))
    }
}

#[async_trait::async_trait]
impl Responder for ChatClient {
    async fn stream_chat(&self, request: ChatRequest) -> Result<TextStream> {
        self.stream(request).await
    }
}

/// Map an HTTP status code and error body to our Error type.
///
/// The server reports failures as `{"detail": "..."}`; when the body does
/// not parse, it is used verbatim as the message.
fn map_error(status_code: u16, body: &str) -> Error {
    #[derive(Deserialize)]
    struct ErrorResponse {
        detail: Option<serde_json::Value>,
    }

    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.detail)
        .map(|detail| match detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_else(|| body.to_string());

    match status_code {
        400 => Error::bad_request(message, None),
        404 => Error::not_found(message),
        408 => Error::timeout(message, None),
        500 => Error::internal_server(message),
        502..=504 => Error::service_unavailable(message),
        _ => Error::api(status_code, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = ChatClient::new().unwrap();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);

        let client = ChatClient::with_options(
            Some("https://assistant.example.com/".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.base_url, "https://assistant.example.com/");
        assert_eq!(client.timeout, Duration::from_secs(30));
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = ChatClient::with_options(Some("http://host:8000".to_string()), None).unwrap();
        assert_eq!(client.base_url(), "http://host:8000/");
    }

    #[test]
    fn map_error_extracts_detail() {
        let err = map_error(500, r#"{"detail": "model not loaded"}"#);
        assert!(err.is_server_error());
        assert!(err.to_string().contains("model not loaded"));
    }

    #[test]
    fn map_error_status_families() {
        assert!(map_error(400, "{}").is_bad_request());
        assert!(map_error(404, "{}").is_not_found());
        assert!(map_error(408, "{}").is_timeout());
        assert!(map_error(503, "{}").is_server_error());
        assert_eq!(map_error(418, "{}").status_code(), Some(418));
    }

    #[test]
    fn map_error_uses_raw_body_when_not_json() {
        let err = map_error(502, "Bad Gateway");
        assert!(err.to_string().contains("Bad Gateway"));
    }
}
