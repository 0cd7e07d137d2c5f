//! Provider module for VisionChat
//!
//! This module contains the model backend abstraction and the Ollama
//! implementation.

pub mod base;
pub mod ollama;

pub use base::{
    ChatChunk, ChatMessage, ChatRequest, ChatResponse, ChunkStream, Provider, ResponseContent,
};
pub use ollama::OllamaProvider;

use crate::config::ProviderConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create the configured provider as a shared trait object
///
/// # Errors
///
/// Returns error if provider initialization fails
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    Ok(Arc::new(OllamaProvider::new(config.ollama.clone())?))
}
