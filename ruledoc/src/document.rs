//! Sectioned Markdown document model
//!
//! A document is a free-form preamble followed by an ordered list of
//! sections. Each section starts with a marker line:
//!
//! ```text
//! <!-- section: rule-section-1 -->
//! ## Heading
//!
//! Body text.
//! ```
//!
//! The section body is everything up to the next marker line, kept verbatim so
//! that the serialized form of an unchanged section never changes.

use crate::section_id::SectionId;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Title used in navigation listings for sections without a heading
pub const UNTITLED_NAV_TITLE: &str = "Item";

/// Errors that can occur while parsing or mutating a document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// Two marker lines carry the same id
    #[error("Duplicate section id '{id}' on line {line}")]
    DuplicateSectionId {
        /// The repeated id
        id: SectionId,
        /// 1-based line of the second occurrence
        line: usize,
    },

    /// A marker line has no id
    #[error("Section marker without an id on line {line}")]
    EmptySectionId {
        /// 1-based line of the marker
        line: usize,
    },

    /// No live section has this id
    #[error("Unknown section '{0}'")]
    UnknownSection(SectionId),

    /// Inserting a section whose id is already present
    #[error("Section '{0}' already exists")]
    SectionExists(SectionId),

    /// Section text would contain a marker line and split the section on reload
    #[error("Section text for '{0}' contains a section marker line")]
    MarkerInBody(SectionId),
}

/// Serialized form of a whole document
///
/// Two states are equal exactly when their serialized bytes are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DocumentState(String);

impl DocumentState {
    /// Wrap serialized document text
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Borrow the serialized text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the serialized text is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source and sink of whole-document state
///
/// Restoring a state captured by `serialized_state` and serializing again
/// must yield the identical state.
pub trait DocumentProvider {
    /// Capture the current state
    fn serialized_state(&self) -> DocumentState;

    /// Replace the live document with a previously captured state
    fn restore(&mut self, state: &DocumentState);
}

/// One addressable section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    id: SectionId,
    body: String,
}

impl Section {
    /// Create a section; the body is normalized to end with a newline
    pub fn new(id: SectionId, body: impl Into<String>) -> Self {
        Self {
            id,
            body: normalize_body(body.into()),
        }
    }

    /// Section id
    pub fn id(&self) -> &SectionId {
        &self.id
    }

    /// Serialized section state (its verbatim body)
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Text of the first level-2 heading, or else the first level-3 heading
    pub fn heading(&self) -> Option<String> {
        first_heading(&self.body)
    }
}

/// Entry of the navigation listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    /// Display title
    pub title: String,
    /// Fragment reference (`#id`)
    pub anchor: String,
}

/// A parsed document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    preamble: String,
    sections: Vec<Section>,
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse document text, rejecting duplicate or empty section ids
    ///
    /// # Parameters
    /// * `text` - Full document text
    ///
    /// # Returns
    /// * `Ok(Document)` - Parsed document
    /// * `Err(DocumentError)` - A marker line is empty or repeats an earlier id
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let (preamble, raw_sections) = split_sections(text);

        let mut seen = HashSet::new();
        let mut sections = Vec::with_capacity(raw_sections.len());
        for raw in raw_sections {
            if raw.id.is_empty() {
                return Err(DocumentError::EmptySectionId { line: raw.line });
            }
            let id = SectionId::new(raw.id);
            if !seen.insert(id.clone()) {
                return Err(DocumentError::DuplicateSectionId { id, line: raw.line });
            }
            sections.push(Section::new(id, raw.body));
        }

        Ok(Self {
            preamble: normalize_body(preamble),
            sections,
        })
    }

    /// Serialize to the canonical text form
    pub fn serialize(&self) -> DocumentState {
        let mut out = self.preamble.clone();
        for section in &self.sections {
            out.push_str(&marker_line(&section.id));
            out.push_str(&section.body);
        }
        DocumentState(out)
    }

    /// Text before the first section
    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// Sections in document order
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Look up a live section
    pub fn section(&self, id: &SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| &s.id == id)
    }

    /// Whether a live section has this id
    pub fn contains(&self, id: &SectionId) -> bool {
        self.section(id).is_some()
    }

    /// Ids of all live sections in document order
    pub fn ids(&self) -> impl Iterator<Item = &SectionId> {
        self.sections.iter().map(|s| &s.id)
    }

    /// Append a section at the end of the document
    pub fn push_section(&mut self, section: Section) -> Result<(), DocumentError> {
        if self.contains(&section.id) {
            return Err(DocumentError::SectionExists(section.id));
        }
        if contains_marker(&section.body) {
            return Err(DocumentError::MarkerInBody(section.id));
        }
        self.sections.push(section);
        Ok(())
    }

    /// Replace the body of a section
    pub fn set_body(&mut self, id: &SectionId, body: &str) -> Result<(), DocumentError> {
        let body = normalize_body(body.to_string());
        if contains_marker(&body) {
            return Err(DocumentError::MarkerInBody(id.clone()));
        }
        let section = self.section_mut(id)?;
        section.body = body;
        Ok(())
    }

    /// Append text to the end of a section's body
    pub fn append_text(&mut self, id: &SectionId, text: &str) -> Result<(), DocumentError> {
        let section = self
            .section(id)
            .ok_or_else(|| DocumentError::UnknownSection(id.clone()))?;
        let mut body = section.body.trim_end_matches('\n').to_string();
        body.push_str(text);
        self.set_body(id, &body)
    }

    /// Remove a section and return it
    pub fn remove_section(&mut self, id: &SectionId) -> Result<Section, DocumentError> {
        let index = self
            .sections
            .iter()
            .position(|s| &s.id == id)
            .ok_or_else(|| DocumentError::UnknownSection(id.clone()))?;
        Ok(self.sections.remove(index))
    }

    /// Navigation listing derived from the section headings
    pub fn navigation(&self) -> Vec<NavItem> {
        self.sections
            .iter()
            .map(|section| NavItem {
                title: section
                    .heading()
                    .unwrap_or_else(|| UNTITLED_NAV_TITLE.to_string()),
                anchor: section.id.anchor(),
            })
            .collect()
    }

    fn section_mut(&mut self, id: &SectionId) -> Result<&mut Section, DocumentError> {
        self.sections
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| DocumentError::UnknownSection(id.clone()))
    }
}

impl DocumentProvider for Document {
    fn serialized_state(&self) -> DocumentState {
        self.serialize()
    }

    fn restore(&mut self, state: &DocumentState) {
        // States come from `serialize`, so ids are already unique and non-empty.
        let (preamble, raw_sections) = split_sections(state.as_str());
        self.preamble = preamble;
        self.sections = raw_sections
            .into_iter()
            .map(|raw| Section {
                id: SectionId::new(raw.id),
                body: raw.body,
            })
            .collect();
    }
}

/// Section bodies keyed by id, extracted from a serialized document
pub(crate) fn section_bodies(state: &DocumentState) -> Vec<(SectionId, String)> {
    let (_, raw_sections) = split_sections(state.as_str());
    raw_sections
        .into_iter()
        .map(|raw| (SectionId::new(raw.id), raw.body))
        .collect()
}

/// Section as found by the splitter, before validation
struct RawSection {
    id: String,
    body: String,
    line: usize,
}

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"^<!--\s*section:\s*(\S*?)\s*-->\s*$").expect("section marker pattern is valid")
    })
}

fn marker_line(id: &SectionId) -> String {
    format!("<!-- section: {} -->\n", id)
}

fn marker_id(line: &str) -> Option<&str> {
    marker_regex()
        .captures(line.trim_end_matches(['\n', '\r']))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn contains_marker(body: &str) -> bool {
    body.split_inclusive('\n')
        .any(|line| marker_id(line).is_some())
}

/// Split text into preamble and raw sections, keeping every body byte
fn split_sections(text: &str) -> (String, Vec<RawSection>) {
    let mut preamble = String::new();
    let mut sections: Vec<RawSection> = Vec::new();

    for (index, line) in text.split_inclusive('\n').enumerate() {
        if let Some(id) = marker_id(line) {
            sections.push(RawSection {
                id: id.to_string(),
                body: String::new(),
                line: index + 1,
            });
            continue;
        }
        match sections.last_mut() {
            Some(current) => current.body.push_str(line),
            None => preamble.push_str(line),
        }
    }

    (preamble, sections)
}

fn normalize_body(mut body: String) -> String {
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }
    body
}

/// Find the first h2, falling back to the first h3
fn first_heading(markdown: &str) -> Option<String> {
    let mut current: Option<(HeadingLevel, String)> = None;
    let mut first_h3: Option<String> = None;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current = Some((level, String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, buffer)) = current.as_mut() {
                    buffer.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                let Some((level, text)) = current.take() else {
                    continue;
                };
                match level {
                    HeadingLevel::H2 => return Some(text.trim().to_string()),
                    HeadingLevel::H3 if first_h3.is_none() => {
                        first_h3 = Some(text.trim().to_string());
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    first_h3
}
