//! Linear undo/redo history of whole-document snapshots
//!
//! The stack is a vector of snapshots plus a cursor. Pushing after an undo
//! discards every entry above the cursor; there is no redo tree. None of the
//! operations can fail: calls that cannot do anything are absorbed as no-ops.

use crate::document::DocumentState;
use chrono::{DateTime, Local};

/// One immutable snapshot in the history
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Full serialized document
    pub document: DocumentState,
    /// Scroll offset at capture time
    pub scroll_position: u32,
    /// Free-text cause tag (e.g. `typing`, `enter-edit`)
    pub reason: String,
    /// Capture time
    pub timestamp: DateTime<Local>,
}

/// Result of [`HistoryStack::push`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// A new entry was appended
    Recorded,
    /// The snapshot equals the current entry; nothing changed
    Unchanged,
}

/// Snapshot stack with a cursor
#[derive(Debug, Clone, Default)]
pub struct HistoryStack {
    entries: Vec<HistoryEntry>,
    cursor: Option<usize>,
    limit: Option<usize>,
}

impl HistoryStack {
    /// Create an unbounded, empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history that keeps at most `limit` entries (oldest evicted first)
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit: limit.map(|l| l.max(1)),
            ..Self::default()
        }
    }

    /// Record a snapshot unless it equals the current entry
    ///
    /// Entries above the cursor are discarded before the new entry is
    /// appended, and the cursor moves to the new entry.
    pub fn push(
        &mut self,
        snapshot: DocumentState,
        scroll_position: u32,
        reason: impl Into<String>,
    ) -> PushOutcome {
        let reason = reason.into();
        if self
            .current()
            .is_some_and(|current| current.document == snapshot)
        {
            log::debug!("History unchanged for '{}'", reason);
            return PushOutcome::Unchanged;
        }

        if let Some(cursor) = self.cursor {
            let discarded = self.entries.len() - (cursor + 1);
            if discarded > 0 {
                log::debug!("Discarding {} redo entries", discarded);
            }
            self.entries.truncate(cursor + 1);
        }

        log::debug!(
            "History push #{} ({}, {} bytes)",
            self.entries.len(),
            reason,
            snapshot.len()
        );
        self.entries.push(HistoryEntry {
            document: snapshot,
            scroll_position,
            reason,
            timestamp: Local::now(),
        });

        if let Some(limit) = self.limit {
            if self.entries.len() > limit {
                let evicted = self.entries.len() - limit;
                self.entries.drain(..evicted);
            }
        }

        self.cursor = Some(self.entries.len() - 1);
        PushOutcome::Recorded
    }

    /// Step back one entry and return it; `None` at the start of history
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        let cursor = self.cursor.filter(|&c| c > 0)?;
        self.cursor = Some(cursor - 1);
        self.entries.get(cursor - 1)
    }

    /// Step forward one entry and return it; `None` at the end of history
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        let cursor = self.cursor.filter(|&c| c + 1 < self.entries.len())?;
        self.cursor = Some(cursor + 1);
        self.entries.get(cursor + 1)
    }

    /// Whether an older entry exists
    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    /// Whether a newer entry exists
    pub fn can_redo(&self) -> bool {
        self.cursor.is_some_and(|c| c + 1 < self.entries.len())
    }

    /// Entry under the cursor
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.cursor.and_then(|c| self.entries.get(c))
    }

    /// Cursor position; `None` when the history is empty
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// All retained entries, oldest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(text: &str) -> DocumentState {
        DocumentState::new(text)
    }

    #[test]
    fn test_empty_history() {
        let mut history = HistoryStack::new();
        assert_eq!(history.cursor(), None);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_duplicate_push_is_noop() {
        let mut history = HistoryStack::new();
        assert_eq!(history.push(state("a"), 0, "init"), PushOutcome::Recorded);
        assert_eq!(history.push(state("a"), 10, "again"), PushOutcome::Unchanged);
        assert_eq!(history.len(), 1);
        assert_eq!(history.current().unwrap().reason, "init");
    }

    #[test]
    fn test_n_pushes_then_n_undos() {
        let mut history = HistoryStack::new();
        history.push(state("initial"), 0, "init");
        assert!(!history.can_undo());

        for n in 0..5 {
            history.push(state(&format!("edit {n}")), 0, "edit");
            assert!(history.can_undo());
        }
        for _ in 0..5 {
            assert!(history.undo().is_some());
        }
        assert!(!history.can_undo());
        assert!(history.can_redo());
        assert_eq!(history.current().unwrap().document, state("initial"));
        assert!(history.undo().is_none());
        assert_eq!(history.cursor(), Some(0));
    }

    #[test]
    fn test_undo_then_redo_round_trip() {
        let mut history = HistoryStack::new();
        history.push(state("one"), 0, "init");
        history.push(state("two"), 40, "edit");

        let undone = history.undo().unwrap().document.clone();
        assert_eq!(undone, state("one"));
        let redone = history.redo().unwrap();
        assert_eq!(redone.document, state("two"));
        assert_eq!(redone.scroll_position, 40);
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_push_after_undo_discards_redo_branch() {
        let mut history = HistoryStack::new();
        history.push(state("a"), 0, "init");
        history.push(state("b"), 0, "edit");
        history.push(state("c"), 0, "edit");
        history.undo();
        history.undo();

        assert_eq!(history.push(state("d"), 0, "edit"), PushOutcome::Recorded);
        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), Some(1));
        assert!(!history.can_redo());
        let docs: Vec<&str> = history
            .entries()
            .iter()
            .map(|e| e.document.as_str())
            .collect();
        assert_eq!(docs, vec!["a", "d"]);
    }

    #[test]
    fn test_push_matching_undone_entry_is_compared_to_cursor() {
        let mut history = HistoryStack::new();
        history.push(state("a"), 0, "init");
        history.push(state("b"), 0, "edit");
        history.undo();

        // Equal to entries[cursor], so the redo branch survives.
        assert_eq!(history.push(state("a"), 0, "edit"), PushOutcome::Unchanged);
        assert!(history.can_redo());
    }

    #[test]
    fn test_limit_evicts_oldest() {
        let mut history = HistoryStack::with_limit(Some(3));
        for n in 0..5 {
            history.push(state(&n.to_string()), 0, "edit");
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), Some(2));
        assert_eq!(history.entries()[0].document, state("2"));

        history.undo();
        history.undo();
        assert!(!history.can_undo());
    }

    #[test]
    fn test_clear() {
        let mut history = HistoryStack::new();
        history.push(state("a"), 0, "init");
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.cursor(), None);
    }
}
