//! Ollama provider implementation for VisionChat
//!
//! This module implements the Provider trait for Ollama, connecting to a local
//! or remote Ollama server's `/api/chat` endpoint in both streaming
//! (newline-delimited JSON) and non-streaming mode.
//!
//! Images travel over the wire as base64 strings. The encoding is applied
//! here, at the transport boundary, and is exactly reversible via
//! [`decode_image`].

use crate::config::OllamaConfig;
use crate::error::{Result, VisionChatError};
use crate::providers::{ChatChunk, ChatRequest, ChatResponse, ChunkStream, Provider};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::time::Duration;

/// Ollama API provider
///
/// # Examples
///
/// ```no_run
/// use visionchat::config::OllamaConfig;
/// use visionchat::providers::{ChatMessage, ChatRequest, OllamaProvider, Provider};
///
/// # async fn example() -> visionchat::error::Result<()> {
/// let provider = OllamaProvider::new(OllamaConfig::default())?;
/// let request = ChatRequest {
///     model: "llava".to_string(),
///     messages: vec![ChatMessage::user_with_image("Describe this", std::fs::read("cat.png")?)],
/// };
/// let response = provider.chat(&request).await?;
/// println!("{}", response.content().into_text());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    config: OllamaConfig,
}

/// Request structure for Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

/// Message structure for Ollama API
#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

/// One line of a streaming `/api/chat` response
#[derive(Debug, Deserialize)]
struct OllamaChunk {
    #[serde(default)]
    message: Option<OllamaChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaChunkMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Encode raw image bytes for the wire
///
/// # Examples
///
/// ```
/// use visionchat::providers::ollama::{decode_image, encode_image};
///
/// let bytes = vec![0u8, 255, 16, 42];
/// assert_eq!(decode_image(&encode_image(&bytes)).unwrap(), bytes);
/// ```
pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a wire-encoded image back to raw bytes
///
/// # Errors
///
/// Returns a backend error if `encoded` is not valid base64
pub fn decode_image(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| VisionChatError::Backend(format!("Invalid image encoding: {}", e)).into())
}

impl OllamaProvider {
    /// Create a new Ollama provider instance
    ///
    /// The configured timeout caps a whole non-streaming exchange. For a
    /// streamed response it caps the wait for headers and each silent gap
    /// between reads, so a stream that keeps producing lines is never cut
    /// off.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    ///
    /// # Examples
    ///
    /// ```
    /// use visionchat::config::OllamaConfig;
    /// use visionchat::providers::OllamaProvider;
    ///
    /// let provider = OllamaProvider::new(OllamaConfig::default());
    /// assert!(provider.is_ok());
    /// ```
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("visionchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VisionChatError::Config(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized Ollama provider: host={}, model={}",
            config.host,
            config.model
        );

        Ok(Self { client, config })
    }

    /// Get the configured Ollama host
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Get the configured default model name
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.host.trim_end_matches('/'))
    }

    fn build_request<'a>(&self, request: &'a ChatRequest, stream: bool) -> OllamaRequest<'a> {
        OllamaRequest {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                    images: m.images.iter().map(|img| encode_image(img)).collect(),
                })
                .collect(),
            stream,
        }
    }

    async fn send(&self, request: &ChatRequest, stream: bool) -> Result<reqwest::Response> {
        let body = self.build_request(request, stream);

        tracing::debug!(
            "Sending Ollama request: model={}, messages={}, stream={}",
            body.model,
            body.messages.len(),
            stream
        );

        let mut builder = self.client.post(self.chat_url()).json(&body);
        if !stream {
            builder = builder.timeout(self.timeout());
        }

        // Streaming responses only bound the wait for headers here
        let response = tokio::time::timeout(self.timeout(), builder.send())
            .await
            .map_err(|_| {
                tracing::error!("Ollama request timed out after {:?}", self.timeout());
                VisionChatError::Backend(format!(
                    "Ollama request timed out after {}s",
                    self.config.timeout_seconds
                ))
            })?
            .map_err(|e| {
                tracing::error!("Ollama request failed: {}", e);
                VisionChatError::Backend(format!("Ollama request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Ollama returned error {}: {}", status, error_text);
            return Err(VisionChatError::Backend(format!(
                "Ollama returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        Ok(response)
    }
}

/// Parse one NDJSON line into a chunk
fn parse_chunk_line(line: &[u8]) -> Result<ChatChunk> {
    let chunk: OllamaChunk = serde_json::from_slice(line).map_err(|e| {
        tracing::warn!("Failed to parse Ollama chunk: {}", e);
        VisionChatError::Backend(format!("Failed to parse Ollama chunk: {}", e))
    })?;

    if let Some(error) = chunk.error {
        return Err(VisionChatError::Backend(error).into());
    }

    Ok(ChatChunk {
        content: chunk.message.and_then(|m| m.content),
        done: chunk.done,
    })
}

struct NdjsonState {
    bytes: Pin<Box<dyn Stream<Item = std::result::Result<Bytes, String>> + Send>>,
    buffer: Vec<u8>,
    pending: VecDeque<Result<ChatChunk>>,
    exhausted: bool,
    idle_timeout: Option<Duration>,
}

impl NdjsonState {
    /// Move every complete line from the buffer into `pending`
    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if !self.push_line(&line[..line.len() - 1]) {
                return;
            }
        }
    }

    async fn next_bytes(&mut self) -> Option<std::result::Result<Bytes, String>> {
        match self.idle_timeout {
            None => self.bytes.next().await,
            Some(limit) => match tokio::time::timeout(limit, self.bytes.next()).await {
                Ok(item) => item,
                Err(_) => Some(Err(format!(
                    "Ollama stream stalled: no data for {}s",
                    limit.as_secs_f64()
                ))),
            },
        }
    }

    /// Returns false once a failure has been queued
    fn push_line(&mut self, line: &[u8]) -> bool {
        if line.iter().all(|b| b.is_ascii_whitespace()) {
            return true;
        }
        let parsed = parse_chunk_line(line);
        let failed = parsed.is_err();
        self.pending.push_back(parsed);
        if failed {
            self.exhausted = true;
            self.buffer.clear();
        }
        !failed
    }
}

/// Decode a newline-delimited JSON byte stream into chat chunks
///
/// Chunks are yielded in arrival order. A transport failure, an unparsable
/// line, or a gap longer than `idle_timeout` between two reads ends the
/// stream with a single error item.
pub fn decode_ndjson<S, E>(bytes: S, idle_timeout: Option<Duration>) -> ChunkStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display,
{
    let state = NdjsonState {
        bytes: Box::pin(bytes.map(|item| item.map_err(|e| e.to_string()))),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        exhausted: false,
        idle_timeout,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.exhausted {
                return None;
            }
            match state.next_bytes().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(&chunk);
                    state.drain_lines();
                }
                Some(Err(e)) => {
                    tracing::error!("Ollama stream interrupted: {}", e);
                    state
                        .pending
                        .push_back(Err(VisionChatError::Backend(e).into()));
                    state.exhausted = true;
                }
                None => {
                    state.exhausted = true;
                    let rest = std::mem::take(&mut state.buffer);
                    state.push_line(&rest);
                }
            }
        }
    }))
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let response = self.send(request, false).await?;

        let body = response.text().await.map_err(|e| {
            tracing::error!("Failed to read Ollama response body: {}", e);
            VisionChatError::Backend(format!("Failed to read Ollama response: {}", e))
        })?;

        let raw: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse Ollama response: {}", e);
            VisionChatError::Backend(format!("Failed to parse Ollama response: {}", e))
        })?;

        if let Some(error) = raw.get("error").and_then(|e| e.as_str()) {
            return Err(VisionChatError::Backend(error.to_string()).into());
        }

        tracing::debug!(
            "Ollama response: done={}",
            raw.get("done").and_then(|d| d.as_bool()).unwrap_or(false)
        );

        Ok(ChatResponse::from_value(raw))
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChunkStream> {
        let response = self.send(request, true).await?;
        Ok(decode_ndjson(response.bytes_stream(), Some(self.timeout())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ChatMessage;

    fn provider() -> OllamaProvider {
        OllamaProvider::new(OllamaConfig::default()).unwrap()
    }

    fn byte_stream(
        parts: Vec<&'static str>,
    ) -> impl Stream<Item = std::result::Result<Bytes, String>> {
        futures::stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))))
    }

    #[test]
    fn test_ollama_provider_accessors() {
        let provider = provider();
        assert_eq!(provider.host(), "http://localhost:11434");
        assert_eq!(provider.model(), "llava");
    }

    #[test]
    fn test_chat_url_trims_trailing_slash() {
        let provider = OllamaProvider::new(OllamaConfig {
            host: "http://localhost:11434/".to_string(),
            ..OllamaConfig::default()
        })
        .unwrap();
        assert_eq!(provider.chat_url(), "http://localhost:11434/api/chat");
    }

    #[test]
    fn test_build_request_encodes_images() {
        let provider = provider();
        let request = ChatRequest {
            model: "llava".to_string(),
            messages: vec![ChatMessage::user_with_image("describe", vec![1, 2, 3, 250])],
        };

        let body = provider.build_request(&request, true);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["model"], "llava");
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "describe");
        let encoded = json["messages"][0]["images"][0].as_str().unwrap();
        assert_eq!(decode_image(encoded).unwrap(), vec![1, 2, 3, 250]);
    }

    #[test]
    fn test_image_encoding_is_byte_identical() {
        let bytes: Vec<u8> = (0..=255).collect();
        assert_eq!(decode_image(&encode_image(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn test_decode_image_rejects_garbage() {
        assert!(decode_image("not*base64").is_err());
    }

    #[test]
    fn test_parse_chunk_line_with_content() {
        let chunk =
            parse_chunk_line(br#"{"message":{"role":"assistant","content":"Hi"},"done":false}"#)
                .unwrap();
        assert_eq!(chunk.content.as_deref(), Some("Hi"));
        assert!(!chunk.done);
    }

    #[test]
    fn test_parse_chunk_line_without_message() {
        let chunk = parse_chunk_line(br#"{"done":true,"eval_count":12}"#).unwrap();
        assert!(chunk.content.is_none());
        assert!(chunk.done);
    }

    #[test]
    fn test_parse_chunk_line_error_field() {
        let err = parse_chunk_line(br#"{"error":"model 'x' not found"}"#).unwrap_err();
        assert_eq!(err.to_string(), "model 'x' not found");
    }

    #[tokio::test]
    async fn test_decode_ndjson_splits_across_byte_boundaries() {
        let stream = decode_ndjson(
            byte_stream(vec![
                "{\"message\":{\"content\":\"A\"},\"done\":false}\n{\"mess",
                "age\":{\"content\":\"B\"},\"done\":false}\n",
                "{\"done\":true}",
            ]),
            None,
        );

        let chunks: Vec<ChatChunk> = stream.map(|c| c.unwrap()).collect().await;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content.as_deref(), Some("A"));
        assert_eq!(chunks[1].content.as_deref(), Some("B"));
        assert!(chunks[2].done);
    }

    #[tokio::test]
    async fn test_decode_ndjson_transport_error_ends_stream() {
        let parts: Vec<std::result::Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(b"{\"message\":{\"content\":\"A\"}}\n")),
            Err("connection reset".to_string()),
            Ok(Bytes::from_static(b"{\"message\":{\"content\":\"B\"}}\n")),
        ];
        let items: Vec<Result<ChatChunk>> = decode_ndjson(futures::stream::iter(parts), None)
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().content.as_deref(), Some("A"));
        assert_eq!(items[1].as_ref().unwrap_err().to_string(), "connection reset");
    }

    #[tokio::test]
    async fn test_decode_ndjson_malformed_line_ends_stream() {
        let items: Vec<Result<ChatChunk>> = decode_ndjson(
            byte_stream(vec![
                "{\"message\":{\"content\":\"A\"}}\nnot json\n{\"message\":{\"content\":\"B\"}}\n",
            ]),
            None,
        )
        .collect()
        .await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn test_decode_ndjson_skips_blank_lines() {
        let items: Vec<Result<ChatChunk>> =
            decode_ndjson(byte_stream(vec!["\n\n{\"message\":{\"content\":\"A\"}}\n\n"]), None)
                .collect()
                .await;
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_decode_ndjson_stalled_stream_ends_with_error() {
        let stream = byte_stream(vec!["{\"message\":{\"content\":\"A\"}}\n"])
            .chain(futures::stream::pending());
        let items: Vec<Result<ChatChunk>> =
            decode_ndjson(stream, Some(Duration::from_millis(50)))
                .collect()
                .await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().content.as_deref(), Some("A"));
        assert!(items[1].as_ref().unwrap_err().to_string().contains("stalled"));
    }

    #[tokio::test]
    async fn test_decode_ndjson_idle_timeout_resets_per_read() {
        let slow = futures::stream::iter(["A", "B", "C"]).then(|part| async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            Ok::<_, String>(Bytes::from(format!("{{\"message\":{{\"content\":\"{}\"}}}}\n", part)))
        });
        let items: Vec<Result<ChatChunk>> = decode_ndjson(slow, Some(Duration::from_millis(100)))
            .collect()
            .await;

        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|item| item.is_ok()));
    }
}
