//! Ordered diagnostics channel.
//!
//! Notes are accumulated, never thrown: each level of the walker returns its
//! diagnostics to the caller, which may splice them into its own channel and
//! append a contextual note. A compilation is successful iff the derived
//! maximum severity stays below [`Severity::Error`].

use std::fmt;

/// Severity of a single note. Ordering matters: the run severity is the
/// maximum over all recorded notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Note {
    pub severity: Severity,
    pub text: String,
}

/// Append-only list of notes with a derived maximum severity.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    notes: Vec<Note>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, text: impl Into<String>) -> &mut Self {
        self.notes.push(Note {
            severity,
            text: text.into(),
        });
        self
    }

    pub fn info(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Severity::Info, text)
    }

    pub fn warn(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Severity::Warn, text)
    }

    pub fn error(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Severity::Error, text)
    }

    /// Splice another channel onto the end of this one, preserving order.
    pub fn note(&mut self, other: Diagnostics) -> &mut Self {
        self.notes.extend(other.notes);
        self
    }

    /// Append a contextual note at the current maximum severity. Used by
    /// callers wrapping an inner failure with the enclosing construct.
    pub fn annotate(&mut self, text: impl Into<String>) -> &mut Self {
        let severity = self.max_severity().unwrap_or(Severity::Info);
        self.push(severity, text)
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.notes.iter().map(|n| n.severity).max()
    }

    /// True iff nothing of severity ERROR (or higher) was recorded.
    pub fn is_ok(&self) -> bool {
        self.max_severity() < Some(Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_channel_is_ok() {
        let d = Diagnostics::new();
        assert!(d.is_ok());
        assert!(d.is_empty());
        assert_eq!(d.max_severity(), None);
    }

    #[test]
    fn severity_is_monotonic() {
        let mut d = Diagnostics::new();
        d.info("loaded");
        assert_eq!(d.max_severity(), Some(Severity::Info));
        d.warn("duplicate type");
        assert_eq!(d.max_severity(), Some(Severity::Warn));
        d.error("bad ref");
        assert_eq!(d.max_severity(), Some(Severity::Error));
        assert!(!d.is_ok());
        // appending never decreases the run severity
        d.info("late info");
        assert_eq!(d.max_severity(), Some(Severity::Error));
    }

    #[test]
    fn note_splices_in_order() {
        let mut outer = Diagnostics::new();
        outer.info("first");
        let mut inner = Diagnostics::new();
        inner.warn("second");
        inner.error("third");
        outer.note(inner);
        let texts: Vec<&str> = outer.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, ["first", "second", "third"]);
    }

    #[test]
    fn annotate_uses_current_maximum() {
        let mut d = Diagnostics::new();
        d.error("inner failure");
        d.annotate("while processing outer");
        assert_eq!(d.iter().last().unwrap().severity, Severity::Error);
    }
}
