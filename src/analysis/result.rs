//! Terminal outcome of an analysis

use chrono::{DateTime, Local};
use serde::Serialize;

/// Prefix placed before the failure detail in a failed result's response text
pub const ANALYSIS_ERROR_PREFIX: &str = "An error occurred during analysis:\n";

/// Whether the backend produced a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// The backend returned content
    Completed,
    /// The backend call failed; `response` holds the error message
    Failed,
}

/// Result of one analysis request
///
/// Every request ends in exactly one of these, success or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// Prompt that was submitted
    pub prompt: String,
    /// Full response text, or a human-readable error message
    pub response: String,
    /// When the result was produced
    pub timestamp: DateTime<Local>,
    /// Outcome of the backend call
    pub status: ResultStatus,
}

impl AnalysisResult {
    /// A successful result
    pub fn completed(prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
            timestamp: Local::now(),
            status: ResultStatus::Completed,
        }
    }

    /// A failed result whose response text carries `detail`
    ///
    /// # Examples
    ///
    /// ```
    /// use visionchat::analysis::AnalysisResult;
    ///
    /// let result = AnalysisResult::failed("describe", "connection refused");
    /// assert_eq!(result.response, "An error occurred during analysis:\nconnection refused");
    /// assert!(!result.is_success());
    /// ```
    pub fn failed(prompt: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self {
            prompt: prompt.into(),
            response: format!("{}{}", ANALYSIS_ERROR_PREFIX, detail),
            timestamp: Local::now(),
            status: ResultStatus::Failed,
        }
    }

    /// True when the backend produced content
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Completed
    }
}
