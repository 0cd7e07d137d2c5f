//! Non-streaming delivery of an analysis

use crate::analysis::{AnalysisRequest, AnalysisResult};
use crate::providers::{Provider, ResponseContent};

use std::sync::Arc;

/// Drives the backend in non-streaming mode
///
/// [`run`](Self::run) never returns an error: backend failures become a
/// failed [`AnalysisResult`] whose response text carries the detail.
#[derive(Clone)]
pub struct SynchronousDelivery {
    provider: Arc<dyn Provider>,
}

impl SynchronousDelivery {
    /// Create a delivery bound to `provider`
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Run the analysis and wait for the complete response
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use visionchat::analysis::{RequestBuilder, SynchronousDelivery};
    /// use visionchat::config::OllamaConfig;
    /// use visionchat::providers::OllamaProvider;
    ///
    /// # tokio_test::block_on(async {
    /// let config = OllamaConfig {
    ///     host: "http://127.0.0.1:1".to_string(),
    ///     ..OllamaConfig::default()
    /// };
    /// let provider = Arc::new(OllamaProvider::new(config).unwrap());
    /// let request = RequestBuilder::new("llava")
    ///     .build("What is this?", vec![1, 2, 3], None)
    ///     .unwrap();
    ///
    /// // An unreachable backend still yields a result
    /// let result = SynchronousDelivery::new(provider).run(request).await;
    /// assert!(!result.is_success());
    /// assert!(result.response.starts_with("An error occurred during analysis:"));
    /// # });
    /// ```
    pub async fn run(&self, request: AnalysisRequest) -> AnalysisResult {
        let (prompt, chat_request) = request.into_chat_request();
        tracing::debug!("Running analysis with model {}", chat_request.model);

        match self.provider.chat(&chat_request).await {
            Ok(response) => {
                let text = match response.content() {
                    ResponseContent::Structured(text) => text,
                    ResponseContent::Fallback(text) => {
                        tracing::warn!("Response has no message content, using raw body");
                        text
                    }
                };
                tracing::info!("Analysis complete ({} chars)", text.chars().count());
                AnalysisResult::completed(prompt, text)
            }
            Err(e) => {
                tracing::error!("Analysis failed: {}", e);
                AnalysisResult::failed(prompt, e)
            }
        }
    }
}
