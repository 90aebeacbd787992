//! Section-level change detection against a baseline snapshot

use crate::document::{section_bodies, DocumentState};
use crate::section_id::SectionId;
use std::collections::HashMap;

/// Per-section serialized states of one whole-document snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baseline {
    sections: HashMap<SectionId, String>,
}

impl Baseline {
    /// Extract the section states of a serialized document
    pub fn from_state(state: &DocumentState) -> Self {
        Self {
            sections: section_bodies(state).into_iter().collect(),
        }
    }

    /// Baseline with no sections; every section compares as dirty
    pub fn empty() -> Self {
        Self::default()
    }

    /// Serialized state of one section, if the baseline has it
    pub fn section_state(&self, id: &SectionId) -> Option<&str> {
        self.sections.get(id).map(String::as_str)
    }
}

/// Decides whether a section differs from its baseline
///
/// Comparison is exact byte equality of the serialized section state. The
/// detector only answers the question; recording the answer in the dirty set
/// is the caller's job.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector;

impl ChangeDetector {
    /// Whether `current_state` differs from the baseline's state for the section
    ///
    /// A section the baseline does not contain is always dirty.
    pub fn is_dirty(section_id: &SectionId, current_state: &str, baseline: &Baseline) -> bool {
        baseline.section_state(section_id) != Some(current_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn baseline(text: &str) -> Baseline {
        Baseline::from_state(&Document::parse(text).unwrap().serialize())
    }

    #[test]
    fn test_unchanged_section_is_clean() {
        let base = baseline("<!-- section: a -->\nHello\n");
        assert!(!ChangeDetector::is_dirty(
            &SectionId::new("a"),
            "Hello\n",
            &base
        ));
    }

    #[test]
    fn test_changed_section_is_dirty() {
        let base = baseline("<!-- section: a -->\nHello\n");
        assert!(ChangeDetector::is_dirty(
            &SectionId::new("a"),
            "Hello world\n",
            &base
        ));
    }

    #[test]
    fn test_whitespace_counts_as_change() {
        let base = baseline("<!-- section: a -->\nHello\n");
        assert!(ChangeDetector::is_dirty(
            &SectionId::new("a"),
            "Hello \n",
            &base
        ));
    }

    #[test]
    fn test_section_missing_from_baseline_is_dirty() {
        let base = baseline("<!-- section: a -->\nHello\n");
        assert!(ChangeDetector::is_dirty(
            &SectionId::new("b"),
            "Hello\n",
            &base
        ));
        assert!(ChangeDetector::is_dirty(
            &SectionId::new("a"),
            "",
            &Baseline::empty()
        ));
    }
}
