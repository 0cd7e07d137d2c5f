//! Test utilities for VisionChat
//!
//! This module provides scripted in-process backends and temporary file
//! helpers shared by the unit tests.

use crate::error::{Result, VisionChatError};
use crate::providers::{ChatChunk, ChatRequest, ChatResponse, ChunkStream, Provider};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::Poll;
use tempfile::TempDir;
use tokio::sync::Notify;

/// One scripted streaming increment
#[derive(Debug, Clone)]
enum Step {
    Chunk(ChatChunk),
    Fail(String),
}

/// Scripted backend with call counting
///
/// Streaming calls replay the scripted steps; non-streaming calls return the
/// scripted response. `failing` makes both modes fail at call time. An
/// optional gate holds every call pending until it is notified.
pub struct FakeProvider {
    steps: Vec<Step>,
    response: ChatResponse,
    open_failure: Option<String>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl FakeProvider {
    /// A backend that streams `chunks` then completes
    pub fn streaming(chunks: &[&str]) -> Self {
        let text: String = chunks.concat();
        Self {
            steps: chunks
                .iter()
                .map(|c| Step::Chunk(ChatChunk::text(*c)))
                .collect(),
            response: ChatResponse::text(text),
            open_failure: None,
            gate: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A backend whose non-streaming call returns `response`
    pub fn responding(response: ChatResponse) -> Self {
        let mut fake = Self::streaming(&[]);
        fake.response = response;
        fake
    }

    /// A backend that fails every call with `message`
    pub fn failing(message: &str) -> Self {
        let mut fake = Self::streaming(&[]);
        fake.open_failure = Some(message.to_string());
        fake
    }

    /// Append a chunk with no text
    pub fn then_metadata(mut self) -> Self {
        self.steps.push(Step::Chunk(ChatChunk::metadata()));
        self
    }

    /// Append a text chunk
    pub fn then_text(mut self, text: &str) -> Self {
        self.steps.push(Step::Chunk(ChatChunk::text(text)));
        self
    }

    /// Append the terminal `done` chunk
    pub fn then_done(mut self) -> Self {
        self.steps.push(Step::Chunk(ChatChunk::done()));
        self
    }

    /// Append a mid-stream failure
    pub fn then_fail(mut self, message: &str) -> Self {
        self.steps.push(Step::Fail(message.to_string()));
        self
    }

    /// Hold every call until `gate` is notified
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Number of backend calls made so far (both modes)
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    async fn enter(&self, request: &ChatRequest) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.open_failure {
            Some(message) => Err(VisionChatError::Backend(message.clone()).into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Provider for FakeProvider {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.enter(request).await?;
        Ok(self.response.clone())
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<ChunkStream> {
        self.enter(request).await?;
        let items: Vec<Result<ChatChunk>> = self
            .steps
            .iter()
            .map(|step| match step {
                Step::Chunk(chunk) => Ok(chunk.clone()),
                Step::Fail(message) => Err(VisionChatError::Backend(message.clone()).into()),
            })
            .collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

/// A backend that panics, for exercising fault paths
///
/// Non-streaming calls always panic. Streaming calls panic when opened, or
/// after yielding the scripted chunks.
pub struct PanickingProvider {
    before_panic: Option<Vec<String>>,
}

impl PanickingProvider {
    /// Panic as soon as either call is made
    pub fn at_open() -> Self {
        Self { before_panic: None }
    }

    /// Stream `chunks`, then panic while producing the next one
    pub fn after(chunks: &[&str]) -> Self {
        Self {
            before_panic: Some(chunks.iter().map(|c| c.to_string()).collect()),
        }
    }
}

#[async_trait]
impl Provider for PanickingProvider {
    async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse> {
        panic!("backend exploded")
    }

    async fn chat_stream(&self, _request: &ChatRequest) -> Result<ChunkStream> {
        let Some(chunks) = self.before_panic.clone() else {
            panic!("backend exploded")
        };
        let head = futures::stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<_, anyhow::Error>(ChatChunk::text(c))),
        );
        let tail = futures::stream::poll_fn(|_| -> Poll<Option<Result<ChatChunk>>> {
            panic!("backend exploded")
        });
        Ok(Box::pin(head.chain(tail)))
    }
}

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Write a small valid PNG into `dir` and return its path
pub fn create_test_png(dir: &TempDir, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.path().join(name);
    image::RgbImage::new(width, height)
        .save(&path)
        .expect("Failed to write test image");
    path
}

/// Create a test file with the given content
pub fn create_test_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_provider_counts_calls() {
        let fake = FakeProvider::streaming(&["a"]);
        let request = ChatRequest {
            model: "m".to_string(),
            messages: Vec::new(),
        };
        fake.chat(&request).await.unwrap();
        let _ = fake.chat_stream(&request).await.unwrap();
        assert_eq!(fake.calls(), 2);
        assert_eq!(fake.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_panicking_provider_streams_before_panicking() {
        let provider = PanickingProvider::after(&["a"]);
        let request = ChatRequest {
            model: "m".to_string(),
            messages: Vec::new(),
        };
        let mut stream = provider.chat_stream(&request).await.unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.content.as_deref(), Some("a"));
    }
}
