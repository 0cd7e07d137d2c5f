//! Request assembly for a single multimodal analysis
//!
//! [`RequestBuilder`] validates the prompt and image before anything is sent
//! to the backend. Image bytes pass through untouched.

use crate::error::VisionChatError;
use crate::providers::{ChatMessage, ChatRequest};

/// A validated analysis request: prompt, raw image bytes and model identifier
///
/// Immutable once built. Consumed by a delivery component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    prompt: String,
    image: Vec<u8>,
    model: String,
}

impl AnalysisRequest {
    /// The prompt text
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The raw image bytes
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// The model identifier
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Split into the prompt (kept for the result) and the backend request
    pub(crate) fn into_chat_request(self) -> (String, ChatRequest) {
        let request = ChatRequest {
            model: self.model,
            messages: vec![ChatMessage::user_with_image(
                self.prompt.clone(),
                self.image,
            )],
        };
        (self.prompt, request)
    }
}

/// Builds [`AnalysisRequest`]s, filling in the configured default model
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    default_model: String,
}

impl RequestBuilder {
    /// Create a builder that falls back to `default_model`
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            default_model: default_model.into(),
        }
    }

    /// The model used when a request does not name one
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Validate inputs and assemble a request
    ///
    /// A `None` or blank `model` selects the default model. Performs no I/O.
    ///
    /// # Errors
    ///
    /// Returns [`VisionChatError::Validation`] if the prompt is empty or
    /// whitespace-only, or if the image is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use visionchat::analysis::RequestBuilder;
    ///
    /// let builder = RequestBuilder::new("llava");
    /// let request = builder.build("What is this?", vec![1, 2, 3], None).unwrap();
    /// assert_eq!(request.model(), "llava");
    /// assert_eq!(request.image(), &[1, 2, 3]);
    ///
    /// assert!(builder.build("   ", vec![1], None).is_err());
    /// assert!(builder.build("What is this?", Vec::new(), None).is_err());
    /// ```
    pub fn build(
        &self,
        prompt: &str,
        image: Vec<u8>,
        model: Option<&str>,
    ) -> Result<AnalysisRequest, VisionChatError> {
        if prompt.trim().is_empty() {
            return Err(VisionChatError::Validation(
                "prompt must not be empty".to_string(),
            ));
        }

        if image.is_empty() {
            return Err(VisionChatError::Validation(
                "image must not be empty".to_string(),
            ));
        }

        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.default_model)
            .to_string();

        Ok(AnalysisRequest {
            prompt: prompt.to_string(),
            image,
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_uses_default_model() {
        let request = RequestBuilder::new("llava")
            .build("describe", vec![9], None)
            .unwrap();
        assert_eq!(request.model(), "llava");
        assert_eq!(request.prompt(), "describe");
    }

    #[test]
    fn test_build_uses_explicit_model() {
        let request = RequestBuilder::new("llava")
            .build("describe", vec![9], Some("bakllava"))
            .unwrap();
        assert_eq!(request.model(), "bakllava");
    }

    #[test]
    fn test_build_blank_model_falls_back_to_default() {
        let request = RequestBuilder::new("llava")
            .build("describe", vec![9], Some("  "))
            .unwrap();
        assert_eq!(request.model(), "llava");
    }

    #[test]
    fn test_build_rejects_empty_prompt() {
        let err = RequestBuilder::new("llava")
            .build("", vec![1], None)
            .unwrap_err();
        assert!(matches!(err, VisionChatError::Validation(_)));
    }

    #[test]
    fn test_build_rejects_whitespace_prompt() {
        let err = RequestBuilder::new("llava")
            .build(" \n\t ", vec![1], None)
            .unwrap_err();
        assert!(matches!(err, VisionChatError::Validation(_)));
    }

    #[test]
    fn test_build_rejects_empty_image() {
        let err = RequestBuilder::new("llava")
            .build("describe", Vec::new(), None)
            .unwrap_err();
        assert!(matches!(err, VisionChatError::Validation(_)));
    }

    #[test]
    fn test_build_preserves_image_bytes() {
        let bytes: Vec<u8> = (0..=255).rev().collect();
        let request = RequestBuilder::new("llava")
            .build("describe", bytes.clone(), None)
            .unwrap();
        assert_eq!(request.image(), bytes.as_slice());
    }

    #[test]
    fn test_into_chat_request_shape() {
        let request = RequestBuilder::new("llava")
            .build("describe", vec![7, 8], None)
            .unwrap();
        let (prompt, chat) = request.into_chat_request();

        assert_eq!(prompt, "describe");
        assert_eq!(chat.model, "llava");
        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.messages[0].role, "user");
        assert_eq!(chat.messages[0].content, "describe");
        assert_eq!(chat.messages[0].images, vec![vec![7, 8]]);
    }
}
