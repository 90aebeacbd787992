//! Stable identities for addressable document sections
//!
//! Every section in a document carries an id that is unique within the
//! editing session. Ids handed out by [`SectionIdGenerator`] are never
//! reused, even after the section they named has been removed.

use std::collections::HashSet;
use std::fmt;

/// Prefix used for generated section ids
pub const DEFAULT_ID_PREFIX: &str = "rule-section";

/// Identity of a section within a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(String);

impl SectionId {
    /// Wrap an existing id string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fragment reference to this section (e.g. `#rule-section-1`)
    pub fn anchor(&self) -> String {
        format!("#{}", self.0)
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SectionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Millisecond clock used as the time component of generated ids
pub trait IdClock: fmt::Debug {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> u64;
}

/// Wall clock backed by `chrono`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl IdClock for SystemClock {
    fn now_millis(&self) -> u64 {
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
    }
}

/// A clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(
    /// Milliseconds since the Unix epoch
    pub u64,
);

impl IdClock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.0
    }
}

/// Generates collision-free section ids for one session
///
/// Ids have the form `<prefix>-<millis in base 36>-<counter>`. The counter is
/// monotonic, and every id the generator has issued or been told about is
/// remembered, so a candidate that collides is skipped rather than reused.
#[derive(Debug)]
pub struct SectionIdGenerator {
    prefix: String,
    counter: u64,
    known: HashSet<SectionId>,
    clock: Box<dyn IdClock>,
}

impl SectionIdGenerator {
    /// Create a generator using the wall clock
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    /// Create a generator with an explicit clock
    pub fn with_clock(clock: Box<dyn IdClock>) -> Self {
        Self {
            prefix: DEFAULT_ID_PREFIX.to_string(),
            counter: 0,
            known: HashSet::new(),
            clock,
        }
    }

    /// Mark an id as taken (ids already present in a loaded document)
    pub fn reserve(&mut self, id: &SectionId) {
        self.known.insert(id.clone());
    }

    /// Whether the id has been issued or reserved in this session
    pub fn is_known(&self, id: &SectionId) -> bool {
        self.known.contains(id)
    }

    /// Produce a fresh id that has never been seen in this session
    pub fn generate(&mut self) -> SectionId {
        let stamp = to_base36(self.clock.now_millis());
        loop {
            self.counter += 1;
            let candidate = SectionId::new(format!("{}-{}-{}", self.prefix, stamp, self.counter));
            if self.known.insert(candidate.clone()) {
                return candidate;
            }
            log::debug!("Skipping already known section id {}", candidate);
        }
    }
}

impl Default for SectionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase base-36 rendering of a number
fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
