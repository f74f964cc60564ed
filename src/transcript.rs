//! Rendering contracts shared by both controllers.
//!
//! [`TranscriptView`] is the append-only message list; [`ChoiceView`] is the
//! container that holds narration choice controls and the terminal message.
//! Controllers only talk to these traits, so any surface (terminal, GUI, web)
//! can host them. Two implementations ship here: in-memory views that record
//! what was rendered, and terminal views that print with `colored`.

use colored::*;
use std::io::{self, Write};

/// Fixed message rendered when the server offers no further choices.
pub const ENDING_MESSAGE: &str = "The end.";

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    System,
}

/// One rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub text: String,
    pub origin: Origin,
}

/// Append-only list of rendered entries. Visible order is call order.
pub trait TranscriptView {
    fn append_entry(&mut self, text: &str, origin: Origin);

    /// Remove every rendered entry.
    fn clear(&mut self);
}

/// Container for narration choice controls.
pub trait ChoiceView {
    /// Render one control per choice, in order. Duplicates stay distinct.
    fn render_choices(&mut self, choices: &[String]);

    /// Remove every rendered control, including the terminal message and the
    /// start affordance.
    fn clear_choices(&mut self);

    fn render_ending(&mut self, message: &str);
}

// ---------------------------------------------------------------------------
// In-memory views
// ---------------------------------------------------------------------------

/// Records entries instead of drawing them.
#[derive(Debug, Clone, Default)]
pub struct MemoryTranscript {
    entries: Vec<TranscriptEntry>,
    clears: usize,
}

impl MemoryTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Entry texts in visible order.
    pub fn texts(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.text.as_str()).collect()
    }

    pub fn clear_count(&self) -> usize {
        self.clears
    }
}

impl TranscriptView for MemoryTranscript {
    fn append_entry(&mut self, text: &str, origin: Origin) {
        self.entries.push(TranscriptEntry {
            text: text.to_string(),
            origin,
        });
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.clears += 1;
    }
}

/// Records the controls currently on screen.
#[derive(Debug, Clone, Default)]
pub struct MemoryChoices {
    controls: Vec<String>,
    ending: Option<String>,
    endings_rendered: usize,
}

impl MemoryChoices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels of the visible choice controls, in order.
    pub fn controls(&self) -> &[String] {
        &self.controls
    }

    /// The terminal message, if currently shown.
    pub fn ending(&self) -> Option<&str> {
        self.ending.as_deref()
    }

    /// How many times a terminal message has been rendered overall.
    pub fn endings_rendered(&self) -> usize {
        self.endings_rendered
    }
}

impl ChoiceView for MemoryChoices {
    fn render_choices(&mut self, choices: &[String]) {
        self.controls.extend(choices.iter().cloned());
    }

    fn clear_choices(&mut self) {
        self.controls.clear();
        self.ending = None;
    }

    fn render_ending(&mut self, message: &str) {
        self.ending = Some(message.to_string());
        self.endings_rendered += 1;
    }
}

// ---------------------------------------------------------------------------
// Terminal views
// ---------------------------------------------------------------------------

/// Prints entries as they are appended. User lines are prefixed with `> `.
///
/// A terminal can't un-print, so `clear` draws a separator instead.
pub struct TerminalTranscript<W: Write = io::Stdout> {
    out: W,
}

impl TerminalTranscript<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> TerminalTranscript<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TranscriptView for TerminalTranscript<W> {
    fn append_entry(&mut self, text: &str, origin: Origin) {
        let line = match origin {
            Origin::User => format!("> {}", text).bright_green(),
            Origin::System => text.bright_white(),
        };
        let _ = writeln!(self.out, "{}", line);
        let _ = self.out.flush();
    }

    fn clear(&mut self) {
        let _ = writeln!(self.out, "{}", "=".repeat(50).bright_blue());
    }
}

/// Prints choices as a numbered list, 1-based.
pub struct TerminalChoices<W: Write = io::Stdout> {
    out: W,
}

impl TerminalChoices<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> TerminalChoices<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ChoiceView for TerminalChoices<W> {
    fn render_choices(&mut self, choices: &[String]) {
        for (i, choice) in choices.iter().enumerate() {
            let _ = writeln!(
                self.out,
                "  {} {}",
                format!("[{}]", i + 1).bright_yellow().bold(),
                choice.bright_yellow()
            );
        }
        let _ = self.out.flush();
    }

    fn clear_choices(&mut self) {
        let _ = writeln!(self.out);
    }

    fn render_ending(&mut self, message: &str) {
        let _ = writeln!(self.out, "{}", message.bright_magenta().bold());
        let _ = self.out.flush();
    }
}
