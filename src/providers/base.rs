//! Base provider trait and common types for VisionChat
//!
//! This module defines the Provider trait that model backends implement,
//! along with the chat request/response shapes exchanged across the backend
//! boundary.

use crate::error::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A single chat message sent to the backend
///
/// Images are carried as raw bytes. Any text-safe encoding the wire format
/// needs is applied by the provider when the request is serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Role of the message sender (always "user" for analysis requests)
    pub role: String,
    /// Free-text content of the message
    pub content: String,
    /// Attached images, raw bytes
    pub images: Vec<Vec<u8>>,
}

impl ChatMessage {
    /// Creates a user message with one attached image
    ///
    /// # Examples
    ///
    /// ```
    /// use visionchat::providers::ChatMessage;
    ///
    /// let msg = ChatMessage::user_with_image("What is this?", vec![0x89, 0x50]);
    /// assert_eq!(msg.role, "user");
    /// assert_eq!(msg.images.len(), 1);
    /// ```
    pub fn user_with_image(content: impl Into<String>, image: Vec<u8>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            images: vec![image],
        }
    }
}

/// A chat-completion request: model identifier plus ordered messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// Model identifier (e.g. "llava")
    pub model: String,
    /// Ordered message list
    pub messages: Vec<ChatMessage>,
}

/// One increment of a streaming response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChunk {
    /// Text carried by this increment, if any
    pub content: Option<String>,
    /// Whether the backend marked this as the final increment
    pub done: bool,
}

impl ChatChunk {
    /// A chunk carrying text
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            done: false,
        }
    }

    /// A metadata-only chunk with no text
    pub fn metadata() -> Self {
        Self::default()
    }

    /// The terminal chunk
    pub fn done() -> Self {
        Self {
            content: None,
            done: true,
        }
    }
}

/// Boxed stream of backend increments
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk>> + Send>>;

/// Text extracted from a complete backend response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseContent {
    /// The expected `message.content` field was present
    Structured(String),
    /// The field was missing; this is a textual rendering of the whole response
    Fallback(String),
}

impl ResponseContent {
    /// The text regardless of how it was obtained
    pub fn into_text(self) -> String {
        match self {
            Self::Structured(text) | Self::Fallback(text) => text,
        }
    }
}

/// A complete non-streaming response
///
/// The body is kept loosely typed so that backend version drift degrades to
/// [`ResponseContent::Fallback`] instead of a parse failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    raw: serde_json::Value,
}

impl ChatResponse {
    /// Wrap a raw JSON response body
    pub fn from_value(raw: serde_json::Value) -> Self {
        Self { raw }
    }

    /// Build a well-formed response carrying `content`
    pub fn text(content: impl Into<String>) -> Self {
        Self::from_value(serde_json::json!({
            "message": { "role": "assistant", "content": content.into() },
            "done": true,
        }))
    }

    /// Extract the textual content of the response
    ///
    /// # Examples
    ///
    /// ```
    /// use visionchat::providers::{ChatResponse, ResponseContent};
    ///
    /// let ok = ChatResponse::text("A cat on a sofa");
    /// assert_eq!(ok.content(), ResponseContent::Structured("A cat on a sofa".to_string()));
    ///
    /// let odd = ChatResponse::from_value(serde_json::json!({"done": true}));
    /// assert!(matches!(odd.content(), ResponseContent::Fallback(_)));
    /// ```
    pub fn content(&self) -> ResponseContent {
        match self
            .raw
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
        {
            Some(text) => ResponseContent::Structured(text.to_string()),
            None => ResponseContent::Fallback(self.raw.to_string()),
        }
    }
}

/// Provider trait for model backends
///
/// Failures are signaled through the returned `Result`; callers in the
/// delivery layer convert them to response text.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Run a non-streaming chat completion and return the complete response
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Open a streaming chat completion
    ///
    /// The returned stream yields increments in backend emission order and
    /// may yield an error item if the exchange fails part way through.
    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChunkStream>;
}
