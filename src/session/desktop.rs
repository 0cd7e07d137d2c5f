//! Desktop session model
//!
//! All session-owned state lives in [`DesktopState`] and is only mutated on
//! the foreground task: directly by the `DesktopSession` setters, or through
//! [`apply`] when a worker reports back over the session channel. The
//! backend call runs on a spawned worker that never touches the state.

use crate::analysis::{AnalysisResult, RequestBuilder, SynchronousDelivery};
use crate::error::VisionChatError;
use crate::history::{HistoryEntry, HistoryStore};
use crate::preview::preview_label;
use crate::session::{SessionGuard, SessionState};

use std::path::PathBuf;
use tokio::sync::mpsc;

/// Status line while idle with no finished analysis
pub const STATUS_READY: &str = "Ready";
/// Status line while an analysis is in flight
pub const STATUS_ANALYZING: &str = "Analyzing...";
/// Status line after a successful analysis
pub const STATUS_COMPLETE: &str = "Analysis complete.";
/// Status line after a failed analysis
pub const STATUS_ERROR: &str = "Error";
/// Response pane text while an analysis is in flight
pub const PROCESSING_TEXT: &str = "Processing...";

const MISSING_PROMPT: &str = "Enter a prompt for the analysis.";
const MISSING_IMAGE: &str = "Select a valid image before starting the analysis.";

/// Everything the desktop surface displays
#[derive(Debug, Clone)]
pub struct DesktopState {
    /// Current prompt text
    pub prompt: String,
    /// Currently selected image
    pub image_path: Option<PathBuf>,
    /// Preview text for the selected image
    pub preview: String,
    /// Response pane contents
    pub response_text: String,
    /// Status line
    pub status: String,
    /// Archived exchanges
    pub history: HistoryStore,
    /// Highlighted history entry
    pub selected: Option<usize>,
    /// In-flight guard
    pub guard: SessionGuard,
}

impl DesktopState {
    /// Fresh state with `prompt` prefilled
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image_path: None,
            preview: preview_label(None),
            response_text: String::new(),
            status: STATUS_READY.to_string(),
            history: HistoryStore::new(),
            selected: None,
            guard: SessionGuard::new(),
        }
    }
}

/// Messages marshalled from workers back to the foreground
#[derive(Debug, Clone)]
pub enum SessionMessage {
    /// The in-flight analysis ended, successfully or not
    Finished(AnalysisResult),
}

/// What a trigger did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// An analysis was dispatched
    Started,
    /// One was already in flight; nothing happened
    AlreadyRunning,
}

/// Fold a worker message into the session state
///
/// Always returns the guard to Idle. Successful results are archived and the
/// new entry becomes the selection; failures are displayed only.
pub fn apply(state: &mut DesktopState, message: SessionMessage) {
    match message {
        SessionMessage::Finished(result) => {
            state.guard.finish();
            state.response_text = result.response.clone();
            if result.is_success() {
                state.status = STATUS_COMPLETE.to_string();
                let entry = state.history.append(result);
                state.selected = Some(entry.index);
            } else {
                state.status = STATUS_ERROR.to_string();
            }
        }
    }
}

/// One desktop session: state, request assembly and the worker channel
pub struct DesktopSession {
    state: DesktopState,
    builder: RequestBuilder,
    delivery: SynchronousDelivery,
    tx: mpsc::UnboundedSender<SessionMessage>,
    rx: mpsc::UnboundedReceiver<SessionMessage>,
}

impl DesktopSession {
    /// Create a session with `default_prompt` prefilled
    pub fn new(
        builder: RequestBuilder,
        delivery: SynchronousDelivery,
        default_prompt: impl Into<String>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: DesktopState::new(default_prompt),
            builder,
            delivery,
            tx,
            rx,
        }
    }

    /// Read-only view of the session state
    pub fn state(&self) -> &DesktopState {
        &self.state
    }

    /// Model used for analyses
    pub fn model(&self) -> &str {
        self.builder.default_model()
    }

    /// Replace the current prompt
    ///
    /// Returns false, leaving the prompt unchanged, while an analysis is
    /// running.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) -> bool {
        if self.state.guard.is_running() {
            tracing::debug!("Analysis running, prompt change ignored");
            return false;
        }
        self.state.prompt = prompt.into();
        true
    }

    /// Change (or clear) the selected image and refresh its preview
    ///
    /// Like [`set_prompt`](Self::set_prompt), ignored while running.
    pub fn select_image(&mut self, path: Option<PathBuf>) -> bool {
        if self.state.guard.is_running() {
            tracing::debug!("Analysis running, image change ignored");
            return false;
        }
        self.state.preview = preview_label(path.as_deref());
        self.state.image_path = path;
        true
    }

    /// Start an analysis from the current prompt and image
    ///
    /// A trigger while Running is ignored. Image bytes are read here, before
    /// the guard moves to Running; the backend call runs on a worker whose
    /// result arrives through [`next_message`](Self::next_message).
    ///
    /// # Errors
    ///
    /// Returns [`VisionChatError::Validation`] if the prompt is blank or the
    /// image is missing or unreadable. The state is left untouched.
    pub fn trigger(&mut self) -> Result<TriggerOutcome, VisionChatError> {
        if self.state.guard.is_running() {
            tracing::debug!("Analysis already running, ignoring trigger");
            return Ok(TriggerOutcome::AlreadyRunning);
        }

        if self.state.prompt.trim().is_empty() {
            return Err(VisionChatError::Validation(MISSING_PROMPT.to_string()));
        }

        let image = match &self.state.image_path {
            Some(path) if path.is_file() => std::fs::read(path).map_err(|e| {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                VisionChatError::Validation(MISSING_IMAGE.to_string())
            })?,
            _ => return Err(VisionChatError::Validation(MISSING_IMAGE.to_string())),
        };

        let request = self.builder.build(&self.state.prompt, image, None)?;

        if !self.state.guard.try_start() {
            return Ok(TriggerOutcome::AlreadyRunning);
        }
        self.state.status = STATUS_ANALYZING.to_string();
        self.state.response_text = PROCESSING_TEXT.to_string();

        let delivery = self.delivery.clone();
        let tx = self.tx.clone();
        let prompt = request.prompt().to_string();
        tokio::spawn(async move {
            let result = match tokio::spawn(async move { delivery.run(request).await }).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!("Analysis worker failed: {}", e);
                    AnalysisResult::failed(prompt, format!("analysis worker stopped: {}", e))
                }
            };
            if tx.send(SessionMessage::Finished(result)).is_err() {
                tracing::debug!("Session closed before analysis finished");
            }
        });

        Ok(TriggerOutcome::Started)
    }

    /// Wait for the next worker message
    pub async fn next_message(&mut self) -> Option<SessionMessage> {
        self.rx.recv().await
    }

    /// Apply a worker message on the foreground
    pub fn handle(&mut self, message: SessionMessage) {
        apply(&mut self.state, message);
    }

    /// Process worker messages until the session is Idle
    pub async fn settle(&mut self) {
        while self.state.guard.state() == SessionState::Running {
            match self.rx.recv().await {
                Some(message) => self.handle(message),
                None => break,
            }
        }
    }

    /// Select a history entry and show its response
    ///
    /// Reads stored state only.
    ///
    /// # Errors
    ///
    /// Returns [`VisionChatError::NotFound`] if `index` is out of range.
    pub fn select_history(&mut self, index: usize) -> Result<&HistoryEntry, VisionChatError> {
        let entry = self.state.history.get(index)?;
        self.state.selected = Some(index);
        self.state.response_text = entry.response.clone();
        Ok(entry)
    }
}
