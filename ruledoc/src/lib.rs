//! ruledoc - in-place section editing with undo/redo and change tracking
//!
//! The library holds the editing engine: a snapshot history with a cursor,
//! section-level change detection, the dirty set, and the session controller
//! that ties them to save and changelog generation.

#![deny(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::all))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(clippy::pedantic))]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(missing_docs))]
// Allow some pedantic lints that are too strict for this project
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod change_detector;
pub mod changelog;
pub mod config;
pub mod dirty_set;
pub mod document;
pub mod history;
pub mod section_id;
pub mod session;
pub mod storage;
pub mod templates;
pub mod timers;

pub use change_detector::{Baseline, ChangeDetector};
pub use changelog::{ChangelogEntry, ChangelogSink, FileChangelog, MemoryChangelog};
pub use config::{BaselineMode, EditorConfig};
pub use dirty_set::DirtySet;
pub use document::{Document, DocumentError, DocumentProvider, DocumentState, NavItem, Section};
pub use history::{HistoryEntry, HistoryStack, PushOutcome};
pub use section_id::{SectionId, SectionIdGenerator};
pub use session::{
    EditOutcome, EditSession, HistoryMove, SaveError, SaveOutcome, SessionError, TickOutcome,
};
pub use storage::{FileSink, MemorySink, PersistenceSink};
pub use templates::SectionTemplate;
