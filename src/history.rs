//! In-memory record of completed analyses
//!
//! [`HistoryStore`] is append-only for the lifetime of a session. Entries are
//! addressed by their sequence index, which equals their position.

use crate::analysis::AnalysisResult;
use crate::error::VisionChatError;

use chrono::{DateTime, Local};
use serde::Serialize;

/// Maximum number of prompt characters shown in a summary label
pub const SUMMARY_PROMPT_CHARS: usize = 40;

/// One archived exchange
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    /// Sequence index, assigned on append
    pub index: usize,
    /// Prompt that was submitted
    pub prompt: String,
    /// Full response text
    pub response: String,
    /// When the result was produced
    pub timestamp: DateTime<Local>,
}

impl HistoryEntry {
    /// Short display label for this entry
    pub fn summary(&self) -> String {
        summary_label(&self.timestamp, &self.prompt)
    }
}

/// Build a `[HH:MM:SS] prompt` label, truncating long prompts
///
/// Truncation counts characters, not bytes.
///
/// # Examples
///
/// ```
/// use chrono::{Local, TimeZone};
/// use visionchat::history::summary_label;
///
/// let at = Local.with_ymd_and_hms(2024, 5, 1, 9, 5, 7).unwrap();
/// assert_eq!(summary_label(&at, "short"), "[09:05:07] short");
/// ```
pub fn summary_label(timestamp: &DateTime<Local>, prompt: &str) -> String {
    let time = timestamp.format("%H:%M:%S");
    if prompt.chars().count() > SUMMARY_PROMPT_CHARS {
        let head: String = prompt.chars().take(SUMMARY_PROMPT_CHARS).collect();
        format!("[{}] {}...", time, head)
    } else {
        format!("[{}] {}", time, prompt)
    }
}

/// Ordered, append-only history
#[derive(Debug, Default, Clone)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Archive `result` under the next sequence index
    pub fn append(&mut self, result: AnalysisResult) -> HistoryEntry {
        let entry = HistoryEntry {
            index: self.entries.len(),
            prompt: result.prompt,
            response: result.response,
            timestamp: result.timestamp,
        };
        tracing::debug!("Appended history entry {}", entry.index);
        self.entries.push(entry.clone());
        entry
    }

    /// Look up an entry by index
    ///
    /// # Errors
    ///
    /// Returns [`VisionChatError::NotFound`] if `index` is out of range.
    pub fn get(&self, index: usize) -> Result<&HistoryEntry, VisionChatError> {
        self.entries.get(index).ok_or(VisionChatError::NotFound {
            index,
            len: self.entries.len(),
        })
    }

    /// Display label for the entry at `index`
    ///
    /// # Errors
    ///
    /// Returns [`VisionChatError::NotFound`] if `index` is out of range.
    pub fn summary_of(&self, index: usize) -> Result<String, VisionChatError> {
        self.get(index).map(HistoryEntry::summary)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been appended
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in append order
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn result(prompt: &str) -> AnalysisResult {
        AnalysisResult::completed(prompt, format!("response to {}", prompt))
    }

    #[test]
    fn test_append_assigns_increasing_indices() {
        let mut store = HistoryStore::new();
        let a = store.append(result("one"));
        let b = store.append(result("one"));

        assert_eq!(a.index, 0);
        assert_eq!(b.index, 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_get_returns_entries_in_append_order() {
        let mut store = HistoryStore::new();
        let prompts = ["first", "second", "third"];
        for p in prompts {
            store.append(result(p));
        }

        for (i, p) in prompts.iter().enumerate() {
            let entry = store.get(i).unwrap();
            assert_eq!(entry.index, i);
            assert_eq!(entry.prompt, *p);
        }
    }

    #[test]
    fn test_get_out_of_range_is_not_found() {
        let mut store = HistoryStore::new();
        store.append(result("only"));

        let err = store.get(1).unwrap_err();
        assert!(matches!(err, VisionChatError::NotFound { index: 1, len: 1 }));
    }

    #[test]
    fn test_get_on_empty_store_is_not_found() {
        let store = HistoryStore::new();
        assert!(store.is_empty());
        assert!(store.get(0).is_err());
        assert!(store.summary_of(0).is_err());
    }

    #[test]
    fn test_summary_truncates_long_prompt() {
        let at = Local.with_ymd_and_hms(2024, 1, 2, 13, 4, 5).unwrap();
        let prompt = "a".repeat(50);
        let label = summary_label(&at, &prompt);

        assert_eq!(label, format!("[13:04:05] {}...", "a".repeat(40)));
    }

    #[test]
    fn test_summary_keeps_short_prompt() {
        let at = Local.with_ymd_and_hms(2024, 1, 2, 13, 4, 5).unwrap();
        let prompt = "b".repeat(30);

        assert_eq!(summary_label(&at, &prompt), format!("[13:04:05] {}", prompt));
    }

    #[test]
    fn test_summary_at_limit_is_not_truncated() {
        let at = Local.with_ymd_and_hms(2024, 1, 2, 13, 4, 5).unwrap();
        let prompt = "c".repeat(40);
        assert!(!summary_label(&at, &prompt).ends_with("..."));
    }

    #[test]
    fn test_summary_counts_characters() {
        let at = Local.with_ymd_and_hms(2024, 1, 2, 13, 4, 5).unwrap();
        let prompt = "é".repeat(45);
        let label = summary_label(&at, &prompt);

        assert_eq!(label, format!("[13:04:05] {}...", "é".repeat(40)));
    }

    #[test]
    fn test_summary_of_uses_entry_timestamp() {
        let mut store = HistoryStore::new();
        let entry = store.append(result("what is this"));

        assert_eq!(store.summary_of(0).unwrap(), entry.summary());
        assert!(entry.summary().ends_with("] what is this"));
    }
}
