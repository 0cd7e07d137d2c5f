//! Incremental delivery of a streamed analysis
//!
//! [`StreamingDelivery::stream`] returns a lazy [`FragmentStream`]. Nothing
//! is sent to the backend until the stream is first polled, and each call
//! opens a new backend exchange.
//!
//! Termination contract:
//! - normal completion: the stream simply ends after the last content
//!   fragment, no sentinel is emitted;
//! - backend failure or fault (at open or mid-stream): exactly one
//!   [`FragmentKind::Error`] fragment with text `"Error: {detail}"` is
//!   emitted, then the stream ends.
//!
//! Chunks that carry no text are dropped without producing a fragment.

use crate::analysis::{AnalysisRequest, AnalysisResult};
use crate::error::VisionChatError;
use crate::providers::{ChatRequest, ChunkStream, Provider};

use futures::{FutureExt, Stream, StreamExt};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Callback invoked once with the terminal outcome of a stream
pub type CompletionHook = Box<dyn FnOnce(AnalysisResult) + Send>;

/// What a fragment carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    /// Generated text
    Content,
    /// The terminal error message
    Error,
}

/// One ordered piece of streamed output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFragment {
    /// Fragment text, forwarded verbatim to the consumer
    pub text: String,
    /// Whether this is generated text or the terminal error
    pub kind: FragmentKind,
}

impl ResponseFragment {
    fn content(text: String) -> Self {
        Self {
            text,
            kind: FragmentKind::Content,
        }
    }

    fn error(detail: impl std::fmt::Display) -> Self {
        Self {
            text: format!("Error: {}", detail),
            kind: FragmentKind::Error,
        }
    }
}

/// Turn a caught panic payload into a backend error
fn backend_fault(payload: Box<dyn Any + Send>) -> anyhow::Error {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!("Backend panicked during streaming: {}", detail);
    VisionChatError::Backend(format!("backend fault: {}", detail)).into()
}

/// Lazy, finite, ordered sequence of [`ResponseFragment`]s
pub struct FragmentStream {
    inner: Pin<Box<dyn Stream<Item = ResponseFragment> + Send>>,
}

impl Stream for FragmentStream {
    type Item = ResponseFragment;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for FragmentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentStream").finish_non_exhaustive()
    }
}

enum Phase {
    Opening(ChatRequest),
    Streaming(ChunkStream),
    Finished,
}

struct StreamState {
    provider: Arc<dyn Provider>,
    phase: Phase,
    prompt: String,
    collected: String,
    fragments: usize,
    on_complete: Option<CompletionHook>,
}

impl StreamState {
    fn finish(&mut self, result: AnalysisResult) {
        self.phase = Phase::Finished;
        tracing::debug!(
            fragments = self.fragments,
            success = result.is_success(),
            "Streaming analysis finished"
        );
        if let Some(hook) = self.on_complete.take() {
            hook(result);
        }
    }

    fn fail(&mut self, detail: anyhow::Error) -> ResponseFragment {
        tracing::warn!("Streaming analysis failed: {}", detail);
        let prompt = std::mem::take(&mut self.prompt);
        self.finish(AnalysisResult::failed(prompt, &detail));
        ResponseFragment::error(detail)
    }

    fn complete(&mut self) {
        let prompt = std::mem::take(&mut self.prompt);
        let text = std::mem::take(&mut self.collected);
        self.finish(AnalysisResult::completed(prompt, text));
    }
}

/// Drives the backend in streaming mode
#[derive(Clone)]
pub struct StreamingDelivery {
    provider: Arc<dyn Provider>,
}

impl StreamingDelivery {
    /// Create a delivery bound to `provider`
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Stream the analysis of `request`
    pub fn stream(&self, request: AnalysisRequest) -> FragmentStream {
        self.start(request, None)
    }

    /// Stream the analysis of `request`, reporting the terminal outcome
    ///
    /// `on_complete` runs once when the stream terminates, with the
    /// concatenated text on success or the failure detail on error. It does
    /// not run if the consumer drops the stream early.
    pub fn stream_with_completion<F>(
        &self,
        request: AnalysisRequest,
        on_complete: F,
    ) -> FragmentStream
    where
        F: FnOnce(AnalysisResult) + Send + 'static,
    {
        self.start(request, Some(Box::new(on_complete)))
    }

    fn start(
        &self,
        request: AnalysisRequest,
        on_complete: Option<CompletionHook>,
    ) -> FragmentStream {
        let (prompt, chat_request) = request.into_chat_request();
        let state = StreamState {
            provider: Arc::clone(&self.provider),
            phase: Phase::Opening(chat_request),
            prompt,
            collected: String::new(),
            fragments: 0,
            on_complete,
        };

        let inner = futures::stream::unfold(state, |mut state| async move {
            loop {
                match std::mem::replace(&mut state.phase, Phase::Finished) {
                    Phase::Finished => return None,
                    Phase::Opening(request) => {
                        tracing::debug!("Opening streaming exchange with model {}", request.model);
                        let opened = AssertUnwindSafe(state.provider.chat_stream(&request))
                            .catch_unwind()
                            .await
                            .unwrap_or_else(|payload| Err(backend_fault(payload)));
                        match opened {
                            Ok(chunks) => state.phase = Phase::Streaming(chunks),
                            Err(e) => {
                                let fragment = state.fail(e);
                                return Some((fragment, state));
                            }
                        }
                    }
                    Phase::Streaming(mut chunks) => {
                        let next = AssertUnwindSafe(chunks.next())
                            .catch_unwind()
                            .await
                            .unwrap_or_else(|payload| Some(Err(backend_fault(payload))));
                        match next {
                            Some(Ok(chunk)) => {
                                let done = chunk.done;
                                let text = chunk.content.filter(|t| !t.is_empty());
                                state.phase = Phase::Streaming(chunks);
                                if let Some(text) = text {
                                    state.collected.push_str(&text);
                                    state.fragments += 1;
                                    if done {
                                        state.complete();
                                    }
                                    return Some((ResponseFragment::content(text), state));
                                }
                                if done {
                                    state.complete();
                                    return None;
                                }
                            }
                            Some(Err(e)) => {
                                let fragment = state.fail(e);
                                return Some((fragment, state));
                            }
                            None => {
                                state.complete();
                                return None;
                            }
                        }
                    }
                }
            }
        });

        FragmentStream {
            inner: Box::pin(inner),
        }
    }
}
