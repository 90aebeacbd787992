//! Edit session controller
//!
//! Owns the live document together with its history, dirty set and timers,
//! and is the single entry point for mode switches, edits, undo/redo and
//! save. Every operation runs to completion before returning; time is passed
//! in explicitly so the debounce and auto-checkpoint behave deterministically.
//!
//! Dirtiness is measured against one of two baselines (see [`BaselineMode`]):
//!
//! * `LastSaved`: the document as last saved. Undo/redo cannot make the
//!   dirty set lie, because `save` recomputes it from that snapshot.
//! * `HistoryCursor`: the history entry under the cursor at the time of the
//!   edit. The set only grows and goes stale after undo/redo; `save` trusts it.

use crate::change_detector::{Baseline, ChangeDetector};
use crate::changelog::{ChangelogEntry, ChangelogError, ChangelogSink, UNTITLED_CHANGE_TITLE};
use crate::config::{BaselineMode, EditorConfig};
use crate::dirty_set::DirtySet;
use crate::document::{Document, DocumentError, DocumentProvider, DocumentState, NavItem, Section};
use crate::history::{HistoryEntry, HistoryStack, PushOutcome};
use crate::section_id::{SectionId, SectionIdGenerator};
use crate::storage::{PersistError, PersistenceSink};
use crate::templates::SectionTemplate;
use crate::timers::{Debouncer, IntervalTimer};
use chrono::Local;
use std::time::Instant;
use thiserror::Error;

/// History reason recorded when edit mode is entered
pub const REASON_ENTER_EDIT: &str = "enter-edit";
/// History reason for debounced typing snapshots
pub const REASON_TYPING: &str = "typing";
/// History reason for the periodic checkpoint
pub const REASON_AUTO_SAVE: &str = "auto-save";
/// History reason for section removal
pub const REASON_REMOVE_SECTION: &str = "remove-section";

/// Errors from session operations that are not benign no-ops
#[derive(Error, Debug)]
pub enum SessionError {
    /// Mutations need edit mode
    #[error("Edit mode is off")]
    NotEditing,

    /// The session was logged out
    #[error("Session is logged out")]
    NotAuthenticated,

    /// The document rejected the change
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The changelog sink failed
    #[error("Changelog error: {0}")]
    Changelog(#[from] ChangelogError),
}

/// Errors from [`EditSession::save`]
#[derive(Error, Debug)]
pub enum SaveError {
    /// Nothing was saved; dirty set and baseline are untouched
    #[error("Save failed: {0}")]
    Persist(#[from] PersistError),

    /// The document was saved but its changelog entries could not be recorded
    #[error("Document saved but changelog failed: {0}")]
    Changelog(#[from] ChangelogError),
}

/// Result of an edit attributed to one section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Dirtiness was updated and a snapshot was offered to the history
    Recorded {
        /// Whether the section now differs from its baseline
        dirty: bool,
        /// Whether the snapshot produced a new history entry
        history: PushOutcome,
    },
    /// Dirtiness was updated; the snapshot waits for the debounce window
    Deferred {
        /// Whether the section now differs from its baseline
        dirty: bool,
    },
    /// The section does not exist; the edit was dropped
    MissingSection,
}

/// Result of [`EditSession::undo_once`] and [`EditSession::redo_once`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMove {
    /// The document was restored from the entry at `cursor`
    Moved {
        /// New history cursor
        cursor: usize,
    },
    /// Already at the start (undo) or end (redo) of history
    AtBoundary,
}

/// Result of a successful [`EditSession::save`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Document persisted; entries were sent to the changelog
    Saved(Vec<ChangelogEntry>),
    /// No section differs from its baseline
    NothingToSave,
}

/// Snapshots taken by [`EditSession::tick`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Set when the typing debounce fired
    pub typing: Option<PushOutcome>,
    /// Set when the periodic checkpoint fired with unsaved changes
    pub auto_save: Option<PushOutcome>,
}

/// One editing session over one document
#[derive(Debug)]
pub struct EditSession<P, C> {
    document: Document,
    history: HistoryStack,
    dirty: DirtySet,
    baseline_mode: BaselineMode,
    saved_state: DocumentState,
    saved_baseline: Baseline,
    ids: SectionIdGenerator,
    navigation: Vec<NavItem>,
    authenticated: bool,
    editing: bool,
    scroll_position: u32,
    typing: Debouncer,
    auto_save: IntervalTimer,
    new_section_title: String,
    persistence: P,
    changelog: C,
}

impl<P: PersistenceSink, C: ChangelogSink> EditSession<P, C> {
    /// Start an authenticated session in view mode
    ///
    /// # Parameters
    /// * `document` - The loaded document; its state becomes the saved baseline
    /// * `config` - Timer, history and baseline settings
    /// * `persistence` - Where `save` writes the document
    /// * `changelog` - Where changelog entries are sent
    /// * `now` - Start time for the auto-checkpoint period
    pub fn start(
        document: Document,
        config: &EditorConfig,
        persistence: P,
        changelog: C,
        now: Instant,
    ) -> Self {
        if config.baseline == BaselineMode::HistoryCursor {
            log::warn!(
                "Dirty tracking uses the history cursor; undo/redo can leave the dirty set stale"
            );
        }

        let saved_state = document.serialize();
        let navigation = document.navigation();
        let mut ids = SectionIdGenerator::new();
        for id in document.ids() {
            ids.reserve(id);
        }

        Self {
            saved_baseline: Baseline::from_state(&saved_state),
            saved_state,
            document,
            history: HistoryStack::with_limit(config.history_limit),
            dirty: DirtySet::new(),
            baseline_mode: config.baseline,
            ids,
            navigation,
            authenticated: true,
            editing: false,
            scroll_position: 0,
            typing: Debouncer::new(config.debounce_window()),
            auto_save: IntervalTimer::new(config.autosave_period(), now),
            new_section_title: config.new_section_title.clone(),
            persistence,
            changelog,
        }
    }

    /// Replace the id generator (ids already in the document are reserved on it)
    pub fn with_id_generator(mut self, mut ids: SectionIdGenerator) -> Self {
        for id in self.document.ids() {
            ids.reserve(id);
        }
        self.ids = ids;
        self
    }

    /// Switch to edit mode and anchor a recovery point
    pub fn enter_edit(&mut self) -> Result<PushOutcome, SessionError> {
        if !self.authenticated {
            return Err(SessionError::NotAuthenticated);
        }
        if !self.editing {
            log::info!("Entering edit mode");
        }
        self.editing = true;
        Ok(self.push_snapshot(REASON_ENTER_EDIT))
    }

    /// Switch to view mode; no snapshot is taken
    pub fn exit_edit(&mut self) {
        if self.editing {
            log::info!("Leaving edit mode");
        }
        self.editing = false;
    }

    /// End the session: view mode, no dirty state, no history
    ///
    /// The current document becomes the baseline, so a later [`login`]
    /// starts clean instead of inheriting unsaved-change markers.
    ///
    /// [`login`]: EditSession::login
    pub fn logout(&mut self) {
        log::info!(
            "Logging out ({} unsaved sections discarded from tracking)",
            self.dirty.len()
        );
        self.authenticated = false;
        self.editing = false;
        self.dirty.clear();
        self.history.clear();
        self.typing.cancel();
        self.saved_state = self.document.serialize();
        self.saved_baseline = Baseline::from_state(&self.saved_state);
    }

    /// Mark the session authenticated again; the caller does the checking
    pub fn login(&mut self) {
        self.authenticated = true;
    }

    /// Record an edit that was already applied to a section
    ///
    /// Dirtiness is computed first, against the baseline as it stands before
    /// this edit's snapshot, and then the whole document is pushed.
    pub fn record_edit(&mut self, section_id: &SectionId, reason: &str) -> EditOutcome {
        let Some(dirty) = self.update_dirtiness(section_id) else {
            log::warn!("Dropping edit '{}' for missing section {}", reason, section_id);
            return EditOutcome::MissingSection;
        };
        let history = self.push_snapshot(reason);
        EditOutcome::Recorded { dirty, history }
    }

    /// Replace a section's text and record the edit
    pub fn set_section(
        &mut self,
        section_id: &SectionId,
        body: &str,
        reason: &str,
    ) -> Result<EditOutcome, SessionError> {
        self.ensure_editing()?;
        if !self.document.contains(section_id) {
            log::warn!("Dropping edit '{}' for missing section {}", reason, section_id);
            return Ok(EditOutcome::MissingSection);
        }
        self.document.set_body(section_id, body)?;
        self.navigation = self.document.navigation();
        Ok(self.record_edit(section_id, reason))
    }

    /// Append text to a section and record the edit
    pub fn append_to_section(
        &mut self,
        section_id: &SectionId,
        text: &str,
        reason: &str,
    ) -> Result<EditOutcome, SessionError> {
        self.ensure_editing()?;
        if !self.document.contains(section_id) {
            log::warn!("Dropping edit '{}' for missing section {}", reason, section_id);
            return Ok(EditOutcome::MissingSection);
        }
        self.document.append_text(section_id, text)?;
        self.navigation = self.document.navigation();
        Ok(self.record_edit(section_id, reason))
    }

    /// Apply typed text: dirtiness now, snapshot after the debounce window
    pub fn type_into_section(
        &mut self,
        section_id: &SectionId,
        text: &str,
        now: Instant,
    ) -> Result<EditOutcome, SessionError> {
        self.ensure_editing()?;
        if !self.document.contains(section_id) {
            log::warn!("Dropping typed text for missing section {}", section_id);
            return Ok(EditOutcome::MissingSection);
        }
        self.document.append_text(section_id, text)?;
        self.navigation = self.document.navigation();
        let dirty = self.update_dirtiness(section_id).unwrap_or(false);
        self.typing.schedule(now);
        Ok(EditOutcome::Deferred { dirty })
    }

    /// Append a new section built from a template
    ///
    /// The section gets a fresh id, is marked dirty, produces one changelog
    /// entry and one history entry. If the changelog sink fails, the section
    /// stays inserted and recorded and the error is returned.
    pub fn insert_section(&mut self, template: &SectionTemplate) -> Result<SectionId, SessionError> {
        self.ensure_editing()?;
        let id = self.ids.generate();
        self.document
            .push_section(Section::new(id.clone(), template.body.as_str()))?;
        self.navigation = self.document.navigation();
        log::info!("Inserted section {} from template '{}'", id, template.id);

        self.dirty.insert(id.clone());
        self.push_snapshot(&format!("add-section:{}", template.id));

        let entry = ChangelogEntry::today(self.new_section_title.as_str(), &id);
        self.changelog.emit(std::slice::from_ref(&entry))?;
        Ok(id)
    }

    /// Remove a section and record a history entry
    ///
    /// The id stays reserved and is never handed out again.
    pub fn remove_section(&mut self, section_id: &SectionId) -> Result<EditOutcome, SessionError> {
        self.ensure_editing()?;
        if self.document.remove_section(section_id).is_err() {
            log::warn!("Cannot remove missing section {}", section_id);
            return Ok(EditOutcome::MissingSection);
        }
        self.dirty.remove(section_id);
        self.navigation = self.document.navigation();
        let history = self.push_snapshot(REASON_REMOVE_SECTION);
        Ok(EditOutcome::Recorded {
            dirty: false,
            history,
        })
    }

    /// Restore the previous history entry
    ///
    /// Typed text still waiting for the debounce window is snapshotted first.
    pub fn undo_once(&mut self) -> HistoryMove {
        self.flush_typing();
        let Some(entry) = self.history.undo().cloned() else {
            log::debug!("Undo at start of history");
            return HistoryMove::AtBoundary;
        };
        self.apply_entry(&entry)
    }

    /// Restore the next history entry
    pub fn redo_once(&mut self) -> HistoryMove {
        self.flush_typing();
        let Some(entry) = self.history.redo().cloned() else {
            log::debug!("Redo at end of history");
            return HistoryMove::AtBoundary;
        };
        self.apply_entry(&entry)
    }

    /// Bring the dirty set in line with the saved baseline
    ///
    /// Only meaningful with [`BaselineMode::LastSaved`]; the history-cursor
    /// mode keeps its set as recorded. Ids of removed sections are always
    /// dropped.
    pub fn revalidate(&mut self) {
        self.dirty.retain(|id| self.document.contains(id));
        if self.baseline_mode != BaselineMode::LastSaved {
            return;
        }

        let differs = |section: &Section| {
            ChangeDetector::is_dirty(section.id(), section.body(), &self.saved_baseline)
        };
        let mut revalidated = DirtySet::new();
        for id in &self.dirty {
            if self.document.section(id).is_some_and(differs) {
                revalidated.insert(id.clone());
            }
        }
        for section in self.document.sections() {
            if differs(section) {
                revalidated.insert(section.id().clone());
            }
        }
        self.dirty = revalidated;
    }

    /// Persist the document and emit one changelog entry per dirty section
    ///
    /// Persistence happens first. If it fails, nothing is emitted and the
    /// dirty set is kept so the save can be retried.
    ///
    /// With [`BaselineMode::LastSaved`], a document that differs from the saved
    /// one only by removed sections is still persisted and yields `Saved` with
    /// no entries.
    pub fn save(&mut self) -> Result<SaveOutcome, SaveError> {
        self.revalidate();

        let today = Local::now().date_naive();
        let entries: Vec<ChangelogEntry> = self
            .dirty
            .iter()
            .filter_map(|id| {
                let section = self.document.section(id)?;
                let title = section
                    .heading()
                    .unwrap_or_else(|| UNTITLED_CHANGE_TITLE.to_string());
                Some(ChangelogEntry::on(today, title, id))
            })
            .collect();

        let state = self.document.serialize();
        let structural_change =
            self.baseline_mode == BaselineMode::LastSaved && state != self.saved_state;
        if entries.is_empty() && !structural_change {
            log::info!("Nothing to save");
            return Ok(SaveOutcome::NothingToSave);
        }

        if let Err(e) = self.persistence.persist(&state) {
            log::warn!("Save failed, keeping {} dirty sections: {}", self.dirty.len(), e);
            return Err(SaveError::Persist(e));
        }

        let emitted = self.changelog.emit(&entries);

        log::info!("Saved document with {} changed sections", entries.len());
        self.dirty.clear();
        self.saved_baseline = Baseline::from_state(&state);
        self.saved_state = state;

        emitted?;
        Ok(SaveOutcome::Saved(entries))
    }

    /// Fire due timers: debounced typing snapshot and periodic checkpoint
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if self.typing.fire_due(now) {
            outcome.typing = Some(self.push_snapshot(REASON_TYPING));
        }
        if self.auto_save.fire_due(now) && self.editing && !self.dirty.is_empty() {
            outcome.auto_save = Some(self.push_snapshot(REASON_AUTO_SAVE));
        }
        outcome
    }

    /// Update the current scroll offset
    pub fn set_scroll_position(&mut self, position: u32) {
        self.scroll_position = position;
    }

    /// Current scroll offset
    pub fn scroll_position(&self) -> u32 {
        self.scroll_position
    }

    /// The live document
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Snapshot history
    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    /// Sections currently recorded as dirty
    pub fn dirty_set(&self) -> &DirtySet {
        &self.dirty
    }

    /// Navigation listing derived from the live document
    pub fn navigation(&self) -> &[NavItem] {
        &self.navigation
    }

    /// Whether edit mode is on
    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Whether the session is logged in
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Whether undo would move
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether redo would move
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Active dirty-tracking baseline
    pub fn baseline_mode(&self) -> BaselineMode {
        self.baseline_mode
    }

    /// Whether a typing snapshot is waiting for the debounce window
    pub fn has_pending_typing(&self) -> bool {
        self.typing.is_pending()
    }

    /// The persistence sink
    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    /// Mutable access to the persistence sink
    pub fn persistence_mut(&mut self) -> &mut P {
        &mut self.persistence
    }

    /// The changelog sink
    pub fn changelog(&self) -> &C {
        &self.changelog
    }

    fn ensure_editing(&self) -> Result<(), SessionError> {
        if !self.authenticated {
            return Err(SessionError::NotAuthenticated);
        }
        if !self.editing {
            return Err(SessionError::NotEditing);
        }
        Ok(())
    }

    /// Compare one section to the active baseline and update the dirty set
    ///
    /// Returns `None` when the section does not exist.
    fn update_dirtiness(&mut self, section_id: &SectionId) -> Option<bool> {
        let current = self.document.section(section_id)?.body();
        match self.baseline_mode {
            BaselineMode::LastSaved => {
                let dirty = ChangeDetector::is_dirty(section_id, current, &self.saved_baseline);
                if dirty {
                    self.dirty.insert(section_id.clone());
                } else {
                    self.dirty.remove(section_id);
                }
                Some(dirty)
            }
            BaselineMode::HistoryCursor => {
                let baseline = self
                    .history
                    .current()
                    .map(|entry| Baseline::from_state(&entry.document))
                    .unwrap_or_default();
                let dirty = ChangeDetector::is_dirty(section_id, current, &baseline);
                if dirty {
                    self.dirty.insert(section_id.clone());
                }
                Some(dirty)
            }
        }
    }

    /// Snapshot typed text whose debounce window has not elapsed yet
    fn flush_typing(&mut self) {
        if self.typing.is_pending() {
            self.typing.cancel();
            self.push_snapshot(REASON_TYPING);
        }
    }

    fn push_snapshot(&mut self, reason: &str) -> PushOutcome {
        self.history
            .push(self.document.serialized_state(), self.scroll_position, reason)
    }

    fn apply_entry(&mut self, entry: &HistoryEntry) -> HistoryMove {
        self.document.restore(&entry.document);
        self.scroll_position = entry.scroll_position;
        self.navigation = self.document.navigation();

        let cursor = self.history.cursor().unwrap_or_default();
        log::debug!("Restored history entry {} ('{}')", cursor, entry.reason);
        HistoryMove::Moved { cursor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::MemoryChangelog;
    use crate::section_id::FixedClock;
    use crate::storage::MemorySink;
    use crate::templates::get_template;
    use std::path::PathBuf;
    use std::time::Duration;

    const DOC: &str = "# Rules\n\n\
<!-- section: sec-1 -->\n## Attendance\n\nHello\n\
<!-- section: sec-2 -->\n### Fees\n\nTen\n";

    const HELLO_WORLD: &str = "## Attendance\n\nHello world\n";

    fn start_at(mode: BaselineMode, now: Instant) -> EditSession<MemorySink, MemoryChangelog> {
        let config = EditorConfig {
            baseline: mode,
            ..EditorConfig::default()
        };
        EditSession::start(
            Document::parse(DOC).unwrap(),
            &config,
            MemorySink::new(),
            MemoryChangelog::new(),
            now,
        )
    }

    fn start(mode: BaselineMode) -> EditSession<MemorySink, MemoryChangelog> {
        start_at(mode, Instant::now())
    }

    fn sec(id: &str) -> SectionId {
        SectionId::new(id)
    }

    #[derive(Debug, Default)]
    struct FailingChangelog;

    impl ChangelogSink for FailingChangelog {
        fn emit(&mut self, _entries: &[ChangelogEntry]) -> Result<(), ChangelogError> {
            Err(ChangelogError::Write {
                path: PathBuf::from("CHANGELOG.md"),
                source: std::io::Error::other("read-only"),
            })
        }
    }

    #[test]
    fn test_edit_undo_save_with_last_saved_baseline() {
        let mut session = start(BaselineMode::LastSaved);
        assert_eq!(session.enter_edit().unwrap(), PushOutcome::Recorded);

        let outcome = session
            .set_section(&sec("sec-1"), HELLO_WORLD, REASON_TYPING)
            .unwrap();
        assert_eq!(
            outcome,
            EditOutcome::Recorded {
                dirty: true,
                history: PushOutcome::Recorded
            }
        );
        assert!(session.dirty_set().contains(&sec("sec-1")));
        assert_eq!(session.history().len(), 2);

        assert_eq!(session.undo_once(), HistoryMove::Moved { cursor: 0 });
        assert_eq!(
            session.document().section(&sec("sec-1")).unwrap().body(),
            "## Attendance\n\nHello\n"
        );

        assert_eq!(session.save().unwrap(), SaveOutcome::NothingToSave);
        assert!(session.dirty_set().is_empty());
        assert_eq!(session.persistence().save_count(), 0);
        assert!(session.changelog().entries().is_empty());
    }

    #[test]
    fn test_history_cursor_baseline_keeps_stale_entry() {
        let mut session = start(BaselineMode::HistoryCursor);
        session.enter_edit().unwrap();
        session
            .set_section(&sec("sec-1"), HELLO_WORLD, REASON_TYPING)
            .unwrap();
        session.undo_once();

        let SaveOutcome::Saved(entries) = session.save().unwrap() else {
            panic!("expected a save");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].anchor, "#sec-1");
        assert_eq!(entries[0].title, "Attendance");
    }

    #[test]
    fn test_save_emits_one_entry_per_dirty_section() {
        let mut session = start(BaselineMode::LastSaved);
        session.enter_edit().unwrap();
        session
            .set_section(&sec("sec-1"), HELLO_WORLD, REASON_TYPING)
            .unwrap();
        session
            .append_to_section(&sec("sec-2"), " pounds", REASON_TYPING)
            .unwrap();

        let SaveOutcome::Saved(entries) = session.save().unwrap() else {
            panic!("expected a save");
        };
        let today = Local::now().date_naive();
        assert_eq!(
            entries,
            vec![
                ChangelogEntry::on(today, "Attendance", &sec("sec-1")),
                ChangelogEntry::on(today, "Fees", &sec("sec-2")),
            ]
        );
        assert_eq!(session.changelog().entries(), entries.as_slice());
        assert!(session.dirty_set().is_empty());
        assert_eq!(
            session.persistence().last(),
            Some(&session.document().serialize())
        );

        // Saved text is the new baseline.
        assert_eq!(session.save().unwrap(), SaveOutcome::NothingToSave);
    }

    #[test]
    fn test_untitled_section_uses_fallback_title() {
        let mut session = start(BaselineMode::LastSaved);
        session.enter_edit().unwrap();
        session
            .set_section(&sec("sec-1"), "Just text\n", REASON_TYPING)
            .unwrap();

        let SaveOutcome::Saved(entries) = session.save().unwrap() else {
            panic!("expected a save");
        };
        assert_eq!(entries[0].title, UNTITLED_CHANGE_TITLE);
    }

    #[test]
    fn test_failed_persist_keeps_dirty_set_for_retry() {
        let mut session = start(BaselineMode::LastSaved);
        session.enter_edit().unwrap();
        session
            .set_section(&sec("sec-1"), HELLO_WORLD, REASON_TYPING)
            .unwrap();

        session.persistence_mut().fail_with("disk full");
        assert!(matches!(session.save(), Err(SaveError::Persist(_))));
        assert!(session.dirty_set().contains(&sec("sec-1")));
        assert!(session.changelog().entries().is_empty());

        session.persistence_mut().recover();
        let SaveOutcome::Saved(entries) = session.save().unwrap() else {
            panic!("expected a save");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(session.persistence().save_count(), 1);
    }

    #[test]
    fn test_changelog_failure_after_persist_still_clears() {
        let mut session = EditSession::start(
            Document::parse(DOC).unwrap(),
            &EditorConfig::default(),
            MemorySink::new(),
            FailingChangelog,
            Instant::now(),
        );
        session.enter_edit().unwrap();
        session
            .set_section(&sec("sec-1"), HELLO_WORLD, REASON_TYPING)
            .unwrap();

        assert!(matches!(session.save(), Err(SaveError::Changelog(_))));
        assert_eq!(session.persistence().save_count(), 1);
        assert!(session.dirty_set().is_empty());
    }

    #[test]
    fn test_edit_back_to_saved_text_is_clean() {
        let mut session = start(BaselineMode::LastSaved);
        session.enter_edit().unwrap();
        session
            .set_section(&sec("sec-1"), HELLO_WORLD, REASON_TYPING)
            .unwrap();
        let outcome = session
            .set_section(&sec("sec-1"), "## Attendance\n\nHello\n", REASON_TYPING)
            .unwrap();

        assert!(matches!(outcome, EditOutcome::Recorded { dirty: false, .. }));
        assert!(session.dirty_set().is_empty());
    }

    #[test]
    fn test_missing_section_is_dropped() {
        let mut session = start(BaselineMode::LastSaved);
        session.enter_edit().unwrap();

        assert_eq!(
            session.set_section(&sec("nope"), "x", REASON_TYPING).unwrap(),
            EditOutcome::MissingSection
        );
        assert_eq!(
            session.record_edit(&sec("nope"), REASON_TYPING),
            EditOutcome::MissingSection
        );
        assert_eq!(
            session.remove_section(&sec("nope")).unwrap(),
            EditOutcome::MissingSection
        );
        assert_eq!(session.history().len(), 1);
        assert!(session.dirty_set().is_empty());
    }

    #[test]
    fn test_mutations_need_edit_mode() {
        let mut session = start(BaselineMode::LastSaved);
        assert!(matches!(
            session.set_section(&sec("sec-1"), "x", REASON_TYPING),
            Err(SessionError::NotEditing)
        ));

        session.enter_edit().unwrap();
        session.exit_edit();
        assert!(matches!(
            session.append_to_section(&sec("sec-1"), "x", REASON_TYPING),
            Err(SessionError::NotEditing)
        ));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_marker_in_body_is_rejected() {
        let mut session = start(BaselineMode::LastSaved);
        session.enter_edit().unwrap();
        let result = session.set_section(
            &sec("sec-1"),
            "text\n<!-- section: sneaky -->\n",
            REASON_TYPING,
        );
        assert!(matches!(result, Err(SessionError::Document(_))));
        assert!(session.dirty_set().is_empty());
    }

    #[test]
    fn test_insert_sections_get_unique_ids_and_changelog() {
        let mut session = start(BaselineMode::LastSaved)
            .with_id_generator(SectionIdGenerator::with_clock(Box::new(FixedClock(36))));
        session.enter_edit().unwrap();
        let template = get_template("heading-body").unwrap().unwrap();

        let first = session.insert_section(&template).unwrap();
        let second = session.insert_section(&template).unwrap();

        assert_ne!(first, second);
        assert!(session.document().contains(&first));
        assert!(session.document().contains(&second));
        assert!(session.dirty_set().contains(&first));
        assert!(session.dirty_set().contains(&second));
        assert_eq!(session.navigation().len(), 4);
        assert_eq!(
            session.history().current().unwrap().reason,
            "add-section:heading-body"
        );

        let logged: Vec<&str> = session
            .changelog()
            .entries()
            .iter()
            .map(|e| e.anchor.as_str())
            .collect();
        assert_eq!(logged, vec![first.anchor(), second.anchor()]);
        assert!(session
            .changelog()
            .entries()
            .iter()
            .all(|e| e.title == "Added new section"));
    }

    #[test]
    fn test_removed_id_is_never_reused() {
        let mut session = start(BaselineMode::LastSaved)
            .with_id_generator(SectionIdGenerator::with_clock(Box::new(FixedClock(36))));
        session.enter_edit().unwrap();
        let template = SectionTemplate::blank("blank");

        let first = session.insert_section(&template).unwrap();
        session.remove_section(&first).unwrap();
        let second = session.insert_section(&template).unwrap();

        assert_ne!(first, second);
        assert!(!session.dirty_set().contains(&first));
    }

    #[test]
    fn test_remove_section_saves_structural_change() {
        let mut session = start(BaselineMode::LastSaved);
        session.enter_edit().unwrap();

        let outcome = session.remove_section(&sec("sec-2")).unwrap();
        assert_eq!(
            outcome,
            EditOutcome::Recorded {
                dirty: false,
                history: PushOutcome::Recorded
            }
        );
        assert_eq!(session.navigation().len(), 1);

        assert_eq!(session.save().unwrap(), SaveOutcome::Saved(Vec::new()));
        assert_eq!(session.persistence().save_count(), 1);
    }

    #[test]
    fn test_undo_redo_restore_document_and_scroll() {
        let mut session = start(BaselineMode::LastSaved);
        session.set_scroll_position(40);
        session.enter_edit().unwrap();
        session.set_scroll_position(90);
        session
            .set_section(&sec("sec-2"), "### Charges\n\nTen\n", REASON_TYPING)
            .unwrap();
        assert_eq!(session.navigation()[1].title, "Charges");

        assert_eq!(session.undo_once(), HistoryMove::Moved { cursor: 0 });
        assert_eq!(session.scroll_position(), 40);
        assert_eq!(session.navigation()[1].title, "Fees");
        assert_eq!(session.undo_once(), HistoryMove::AtBoundary);

        assert_eq!(session.redo_once(), HistoryMove::Moved { cursor: 1 });
        assert_eq!(session.scroll_position(), 90);
        assert_eq!(session.navigation()[1].title, "Charges");
        assert_eq!(session.redo_once(), HistoryMove::AtBoundary);
    }

    #[test]
    fn test_typing_is_debounced() {
        let t0 = Instant::now();
        let mut session = start_at(BaselineMode::LastSaved, t0);
        session.enter_edit().unwrap();

        let outcome = session
            .type_into_section(&sec("sec-1"), " wor", t0)
            .unwrap();
        assert_eq!(outcome, EditOutcome::Deferred { dirty: true });
        session
            .type_into_section(&sec("sec-1"), "ld", t0 + Duration::from_millis(300))
            .unwrap();
        assert_eq!(session.history().len(), 1);
        assert!(session.has_pending_typing());

        let early = session.tick(t0 + Duration::from_millis(600));
        assert_eq!(early.typing, None);

        let due = session.tick(t0 + Duration::from_millis(800));
        assert_eq!(due.typing, Some(PushOutcome::Recorded));
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history().current().unwrap().reason, REASON_TYPING);
        assert!(!session.has_pending_typing());
    }

    #[test]
    fn test_undo_keeps_pending_typing_reachable() {
        let t0 = Instant::now();
        let mut session = start_at(BaselineMode::LastSaved, t0);
        session.enter_edit().unwrap();
        let fees = sec("sec-2");
        session.set_section(&fees, "Two", REASON_TYPING).unwrap();
        session.type_into_section(&fees, " typed", t0).unwrap();

        assert_eq!(session.undo_once(), HistoryMove::Moved { cursor: 1 });
        assert_eq!(session.document().section(&fees).unwrap().body(), "Two\n");
        assert!(!session.has_pending_typing());

        assert_eq!(session.redo_once(), HistoryMove::Moved { cursor: 2 });
        assert_eq!(
            session.document().section(&fees).unwrap().body(),
            "Two typed\n"
        );

        let tick = session.tick(t0 + Duration::from_secs(2));
        assert_eq!(tick.typing, None);
        assert_eq!(
            session.document().section(&fees).unwrap().body(),
            "Two typed\n"
        );
    }

    #[test]
    fn test_typed_heading_updates_navigation() {
        let t0 = Instant::now();
        let mut session = start_at(BaselineMode::LastSaved, t0);
        session.enter_edit().unwrap();

        session
            .type_into_section(&sec("sec-2"), "\n\n## Costs", t0)
            .unwrap();
        assert_eq!(session.navigation()[1].title, "Costs");
    }

    #[test]
    fn test_auto_save_checkpoint_needs_unsaved_changes() {
        let t0 = Instant::now();
        let mut session = start_at(BaselineMode::LastSaved, t0);
        session.enter_edit().unwrap();

        let idle = session.tick(t0 + Duration::from_secs(30));
        assert_eq!(idle.auto_save, None);

        session
            .type_into_section(&sec("sec-1"), "!", t0 + Duration::from_millis(59_800))
            .unwrap();
        let tick = session.tick(t0 + Duration::from_secs(60));
        assert_eq!(tick.typing, None);
        assert_eq!(tick.auto_save, Some(PushOutcome::Recorded));
        assert_eq!(session.history().current().unwrap().reason, REASON_AUTO_SAVE);
    }

    #[test]
    fn test_logout_clears_tracking() {
        let mut session = start(BaselineMode::LastSaved);
        session.enter_edit().unwrap();
        session
            .set_section(&sec("sec-1"), HELLO_WORLD, REASON_TYPING)
            .unwrap();

        session.logout();
        assert!(!session.is_authenticated());
        assert!(!session.is_editing());
        assert!(session.dirty_set().is_empty());
        assert!(session.history().is_empty());
        assert!(!session.can_undo());
        assert!(matches!(
            session.enter_edit(),
            Err(SessionError::NotAuthenticated)
        ));

        session.login();
        session.enter_edit().unwrap();
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.save().unwrap(), SaveOutcome::NothingToSave);
    }
}
