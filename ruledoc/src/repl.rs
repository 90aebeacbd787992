//! Line-oriented driver for an editing session
//!
//! Each input line is one command. Timers are ticked with the wall clock
//! before every command, so a debounced typing snapshot lands as soon as the
//! next command arrives after the quiet window.

use anyhow::{Context, Result};
use itertools::Itertools;
use ruledoc::config::BaselineMode;
use ruledoc::history::PushOutcome;
use ruledoc::templates;
use ruledoc::{
    ChangelogSink, EditOutcome, EditSession, HistoryMove, NavItem, PersistenceSink, SaveOutcome,
    SectionId, SessionError, TickOutcome,
};
use std::io::{self, BufRead, Write};
use std::time::Instant;
use thiserror::Error;

const HELP: &str = "\
Commands:
  edit                      enter edit mode
  preview                   leave edit mode
  set <id> <text>           replace a section body (\\n for newlines)
  append <id> <text>        append text to a section
  type <id> <text>          append text, snapshot after the debounce window
  insert <template>         insert a new section from a template
  remove <id>               remove a section
  undo | redo               move through history
  save                      persist and write changelog entries
  scroll <n>                set the scroll position
  status                    show mode, dirty sections and history
  toc                       show the navigation listing
  history                   list history entries
  logout | login            end or resume the session
  help                      show this text
  quit                      leave the editor";

/// Errors for input lines that are not valid commands
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type 'help' for commands")]
    Unknown(String),

    #[error("'{command}' needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("Not a scroll position: '{0}'")]
    InvalidNumber(String),
}

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Edit,
    Preview,
    Set { section: SectionId, text: String },
    Append { section: SectionId, text: String },
    Type { section: SectionId, text: String },
    Insert { template: String },
    Remove { section: SectionId },
    Undo,
    Redo,
    Save,
    Scroll(u32),
    Status,
    Toc,
    History,
    Logout,
    Login,
    Help,
    Quit,
}

impl ReplCommand {
    /// Parse a line; blank lines yield `None`
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (name, rest) = split_word(line);
        let command = match name.to_ascii_lowercase().as_str() {
            "edit" => Self::Edit,
            "preview" | "view" => Self::Preview,
            "set" => {
                let (section, text) = section_and_text("set", rest)?;
                Self::Set { section, text }
            }
            "append" => {
                let (section, text) = section_and_text("append", rest)?;
                Self::Append { section, text }
            }
            "type" => {
                let (section, text) = section_and_text("type", rest)?;
                Self::Type { section, text }
            }
            "insert" => Self::Insert {
                template: if rest.is_empty() {
                    "heading-body".to_string()
                } else {
                    rest.to_string()
                },
            },
            "remove" => Self::Remove {
                section: required_word("remove", "a section id", rest)?,
            },
            "undo" => Self::Undo,
            "redo" => Self::Redo,
            "save" => Self::Save,
            "scroll" => {
                let value = required_word("scroll", "a position", rest)?;
                let position = value
                    .as_str()
                    .parse()
                    .map_err(|_| CommandError::InvalidNumber(value.to_string()))?;
                Self::Scroll(position)
            }
            "status" => Self::Status,
            "toc" => Self::Toc,
            "history" => Self::History,
            "logout" => Self::Logout,
            "login" => Self::Login,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn split_word(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (text, ""),
    }
}

fn required_word(
    command: &'static str,
    argument: &'static str,
    rest: &str,
) -> Result<SectionId, CommandError> {
    let (word, _) = split_word(rest);
    if word.is_empty() {
        return Err(CommandError::MissingArgument { command, argument });
    }
    Ok(SectionId::new(word))
}

fn section_and_text(command: &'static str, rest: &str) -> Result<(SectionId, String), CommandError> {
    let section = required_word(command, "a section id and text", rest)?;
    let (_, text) = split_word(rest);
    Ok((section, text.replace("\\n", "\n")))
}

/// Read commands from `input` until `quit` or end of input
pub fn run<P, C, R, W>(session: &mut EditSession<P, C>, input: R, mut output: W) -> Result<()>
where
    P: PersistenceSink,
    C: ChangelogSink,
    R: BufRead,
    W: Write,
{
    writeln!(output, "Type 'help' for commands.")?;
    prompt(&mut output)?;

    for line in input.lines() {
        let line = line.context("Failed to read command")?;
        log_tick(session.tick(Instant::now()));

        match ReplCommand::parse(&line) {
            Ok(Some(ReplCommand::Quit)) => break,
            Ok(Some(command)) => execute(session, command, &mut output)?,
            Ok(None) => {}
            Err(e) => writeln!(output, "{}", e)?,
        }
        prompt(&mut output)?;
    }

    if !session.dirty_set().is_empty() {
        writeln!(
            output,
            "Warning: leaving with unsaved changes in {}",
            session.dirty_set().iter().join(", ")
        )?;
    }
    Ok(())
}

fn prompt<W: Write>(output: &mut W) -> io::Result<()> {
    write!(output, "> ")?;
    output.flush()
}

fn log_tick(tick: TickOutcome) {
    if tick.typing == Some(PushOutcome::Recorded) {
        log::info!("Recorded typing snapshot");
    }
    if tick.auto_save == Some(PushOutcome::Recorded) {
        log::info!("Recorded auto-save checkpoint");
    }
}

/// Run one command against the session
///
/// Session errors are reported to `out`; only output failures are returned.
pub fn execute<P, C, W>(session: &mut EditSession<P, C>, command: ReplCommand, out: &mut W) -> Result<()>
where
    P: PersistenceSink,
    C: ChangelogSink,
    W: Write,
{
    match command {
        ReplCommand::Edit => match session.enter_edit() {
            Ok(_) => writeln!(out, "Edit mode on")?,
            Err(e) => writeln!(out, "{}", e)?,
        },
        ReplCommand::Preview => {
            session.exit_edit();
            writeln!(out, "Edit mode off")?;
        }
        ReplCommand::Set { section, text } => {
            let result = session.set_section(&section, &text, "set");
            report_edit(out, &section, result)?;
        }
        ReplCommand::Append { section, text } => {
            let result = session.append_to_section(&section, &text, "append");
            report_edit(out, &section, result)?;
        }
        ReplCommand::Type { section, text } => {
            let result = session.type_into_section(&section, &text, Instant::now());
            report_edit(out, &section, result)?;
        }
        ReplCommand::Insert { template } => {
            let template = templates::resolve_template(&template)
                .context("Failed to load section templates")?;
            match session.insert_section(&template) {
                Ok(id) => writeln!(out, "Inserted section {}", id)?,
                Err(e) => writeln!(out, "{}", e)?,
            }
        }
        ReplCommand::Remove { section } => {
            let result = session.remove_section(&section);
            report_edit(out, &section, result)?;
        }
        ReplCommand::Undo => report_move(out, "undo", session.undo_once())?,
        ReplCommand::Redo => report_move(out, "redo", session.redo_once())?,
        ReplCommand::Save => match session.save() {
            Ok(SaveOutcome::Saved(entries)) => {
                for entry in &entries {
                    writeln!(out, "  {}", entry)?;
                }
                writeln!(out, "Saved ({} changelog entries)", entries.len())?;
            }
            Ok(SaveOutcome::NothingToSave) => writeln!(out, "Nothing to save")?,
            Err(e) => writeln!(out, "{}", e)?,
        },
        ReplCommand::Scroll(position) => {
            session.set_scroll_position(position);
            writeln!(out, "Scroll position {}", position)?;
        }
        ReplCommand::Status => print_status(out, session)?,
        ReplCommand::Toc => print_navigation(out, session.navigation())?,
        ReplCommand::History => print_history(out, session)?,
        ReplCommand::Logout => {
            session.logout();
            writeln!(out, "Logged out")?;
        }
        ReplCommand::Login => {
            session.login();
            writeln!(out, "Logged in")?;
        }
        ReplCommand::Help => writeln!(out, "{}", HELP)?,
        ReplCommand::Quit => {}
    }
    Ok(())
}

fn report_edit<W: Write>(
    out: &mut W,
    section: &SectionId,
    result: Result<EditOutcome, SessionError>,
) -> io::Result<()> {
    match result {
        Ok(EditOutcome::Recorded { dirty, history }) => writeln!(
            out,
            "{}: {}, {}",
            section,
            if dirty { "modified" } else { "unmodified" },
            match history {
                PushOutcome::Recorded => "snapshot recorded",
                PushOutcome::Unchanged => "no new snapshot",
            }
        ),
        Ok(EditOutcome::Deferred { dirty }) => writeln!(
            out,
            "{}: {}, snapshot pending",
            section,
            if dirty { "modified" } else { "unmodified" }
        ),
        Ok(EditOutcome::MissingSection) => writeln!(out, "No section '{}'", section),
        Err(e) => writeln!(out, "{}", e),
    }
}

fn report_move<W: Write>(out: &mut W, action: &str, result: HistoryMove) -> io::Result<()> {
    match result {
        HistoryMove::Moved { cursor } => writeln!(out, "Restored history entry {}", cursor),
        HistoryMove::AtBoundary => writeln!(out, "Nothing to {}", action),
    }
}

fn print_status<P, C, W>(out: &mut W, session: &EditSession<P, C>) -> io::Result<()>
where
    P: PersistenceSink,
    C: ChangelogSink,
    W: Write,
{
    let mode = match (session.is_authenticated(), session.is_editing()) {
        (false, _) => "logged out",
        (true, true) => "edit",
        (true, false) => "view",
    };
    let baseline = match session.baseline_mode() {
        BaselineMode::LastSaved => "last saved",
        BaselineMode::HistoryCursor => "history cursor",
    };
    let dirty = if session.dirty_set().is_empty() {
        "none".to_string()
    } else {
        session.dirty_set().iter().join(", ")
    };
    let position = session
        .history()
        .cursor()
        .map_or_else(|| "-".to_string(), |c| c.to_string());

    writeln!(out, "Mode: {}", mode)?;
    writeln!(out, "Baseline: {}", baseline)?;
    writeln!(out, "Dirty sections: {}", dirty)?;
    writeln!(
        out,
        "History: entry {} of {} (undo: {}, redo: {})",
        position,
        session.history().len(),
        yes_no(session.can_undo()),
        yes_no(session.can_redo())
    )?;
    writeln!(out, "Typing snapshot pending: {}", yes_no(session.has_pending_typing()))?;
    writeln!(out, "Scroll position: {}", session.scroll_position())
}

fn print_history<P, C, W>(out: &mut W, session: &EditSession<P, C>) -> io::Result<()>
where
    P: PersistenceSink,
    C: ChangelogSink,
    W: Write,
{
    let history = session.history();
    if history.is_empty() {
        return writeln!(out, "History is empty");
    }
    for (index, entry) in history.entries().iter().enumerate() {
        let marker = if history.cursor() == Some(index) { '*' } else { ' ' };
        writeln!(
            out,
            "{} {:>3}  {}  {}",
            marker,
            index,
            entry.timestamp.format("%H:%M:%S"),
            entry.reason
        )?;
    }
    Ok(())
}

/// Print a navigation listing, one `title (#anchor)` per line
pub fn print_navigation<W: Write>(out: &mut W, items: &[NavItem]) -> io::Result<()> {
    if items.is_empty() {
        return writeln!(out, "No sections");
    }
    for item in items {
        writeln!(out, "  {} ({})", item.title, item.anchor)?;
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
