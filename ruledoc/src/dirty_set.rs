//! Set of sections modified since the last save

use crate::section_id::SectionId;
use indexmap::IndexSet;

/// Insertion-ordered set of dirty section ids
///
/// Iteration order is the order sections first became dirty, which is also the
/// order changelog entries are emitted in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySet {
    ids: IndexSet<SectionId>,
}

impl DirtySet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a section dirty; returns false if it already was
    pub fn insert(&mut self, id: SectionId) -> bool {
        self.ids.insert(id)
    }

    /// Mark a section clean, keeping the order of the others
    pub fn remove(&mut self, id: &SectionId) -> bool {
        self.ids.shift_remove(id)
    }

    /// Whether the section is dirty
    pub fn contains(&self, id: &SectionId) -> bool {
        self.ids.contains(id)
    }

    /// Number of dirty sections
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no section is dirty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Dirty ids in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &SectionId> {
        self.ids.iter()
    }

    /// Keep only ids matching the predicate
    pub fn retain(&mut self, mut keep: impl FnMut(&SectionId) -> bool) {
        self.ids.retain(|id| keep(id));
    }

    /// Forget every dirty id
    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

impl<'a> IntoIterator for &'a DirtySet {
    type Item = &'a SectionId;
    type IntoIter = indexmap::set::Iter<'a, SectionId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let mut set = DirtySet::new();
        set.insert(SectionId::new("b"));
        set.insert(SectionId::new("a"));
        set.insert(SectionId::new("c"));
        assert!(!set.insert(SectionId::new("b")));

        let order: Vec<&str> = set.iter().map(SectionId::as_str).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut set = DirtySet::new();
        for id in ["a", "b", "c"] {
            set.insert(SectionId::new(id));
        }
        assert!(set.remove(&SectionId::new("b")));
        assert!(!set.remove(&SectionId::new("b")));

        let order: Vec<&str> = set.iter().map(SectionId::as_str).collect();
        assert_eq!(order, vec!["a", "c"]);
    }

    #[test]
    fn test_retain_and_clear() {
        let mut set = DirtySet::new();
        for id in ["a", "b", "c"] {
            set.insert(SectionId::new(id));
        }
        set.retain(|id| id.as_str() != "a");
        assert_eq!(set.len(), 2);
        assert!(!set.contains(&SectionId::new("a")));

        set.clear();
        assert!(set.is_empty());
    }
}
