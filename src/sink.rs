//! Notification adapter
//!
//! The external parser reports problems in the document under test through
//! a three-severity callback contract. [`NotificationSink`] is that
//! contract; [`DiagnosticCollector`] is the adapter that turns raw notices
//! into [`Diagnostic`]s accumulated on the active file result.
//!
//! "Abort on fatal" is modeled as an explicit [`ParseFlow`] return value
//! rather than unwinding, so control flow stays visible to the parser
//! backend and to tests.

use std::path::PathBuf;

use crate::diagnostic::{Diagnostic, FileResult, Location, Severity};

/// Raw notification handed over by the parser. Location metadata may be
/// absent; it is then treated as unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub location: Option<Location>,
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Notice {
            message: message.into(),
            location: None,
        }
    }

    pub fn at(message: impl Into<String>, line: u32, column: u32) -> Self {
        Notice {
            message: message.into(),
            location: Some(Location::new(line, column)),
        }
    }
}

/// Whether the parser may keep going after a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFlow {
    Continue,
    /// Stop immediately; no further notifications for this file will be
    /// recorded.
    Abort,
}

/// Capability set the external parser drives during one document's parse.
///
/// One sink instance is bound to exactly one file and must only be used
/// from the thread running that file's parse.
pub trait NotificationSink {
    fn on_warning(&mut self, notice: Notice) -> ParseFlow;
    fn on_error(&mut self, notice: Notice) -> ParseFlow;
    fn on_fatal(&mut self, notice: Notice) -> ParseFlow;
}

/// Accumulates diagnostics for one file, in emission order.
///
/// Warnings and errors let the parse continue; a fatal notice is recorded
/// and every later notification is dropped, honoring the parser contract
/// that nothing after a fatal abort belongs to this file.
#[derive(Debug)]
pub struct DiagnosticCollector {
    path: PathBuf,
    diagnostics: Vec<Diagnostic>,
    aborted: bool,
}

impl DiagnosticCollector {
    pub fn new(path: PathBuf) -> Self {
        DiagnosticCollector {
            path,
            diagnostics: Vec::new(),
            aborted: false,
        }
    }

    fn record(&mut self, severity: Severity, notice: Notice) {
        let location = notice.location.unwrap_or(Location::UNKNOWN);
        self.diagnostics
            .push(Diagnostic::new(severity, location, notice.message));
    }

    pub fn aborted(&self) -> bool {
        self.aborted
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Freeze the collector into the file's result. Called exactly once,
    /// after the parse call has returned.
    pub fn into_result(self) -> FileResult {
        if self.aborted {
            FileResult::aborted(self.path, self.diagnostics)
        } else {
            FileResult::completed(self.path, self.diagnostics)
        }
    }
}

impl NotificationSink for DiagnosticCollector {
    fn on_warning(&mut self, notice: Notice) -> ParseFlow {
        if self.aborted {
            return ParseFlow::Abort;
        }
        self.record(Severity::Warning, notice);
        ParseFlow::Continue
    }

    fn on_error(&mut self, notice: Notice) -> ParseFlow {
        if self.aborted {
            return ParseFlow::Abort;
        }
        self.record(Severity::Error, notice);
        ParseFlow::Continue
    }

    fn on_fatal(&mut self, notice: Notice) -> ParseFlow {
        if self.aborted {
            return ParseFlow::Abort;
        }
        self.record(Severity::Fatal, notice);
        self.aborted = true;
        ParseFlow::Abort
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::FileStatus;

    #[test]
    fn test_warning_and_error_continue() {
        let mut collector = DiagnosticCollector::new(PathBuf::from("a.xml"));
        assert_eq!(
            collector.on_warning(Notice::at("odd attribute", 3, 1)),
            ParseFlow::Continue
        );
        assert_eq!(
            collector.on_error(Notice::at("element not allowed", 7, 12)),
            ParseFlow::Continue
        );

        let result = collector.into_result();
        assert_eq!(result.status, FileStatus::Completed);
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(result.diagnostics[0].severity, Severity::Warning);
        assert_eq!(result.diagnostics[1].severity, Severity::Error);
        assert_eq!(result.diagnostics[1].location, Location::new(7, 12));
    }

    #[test]
    fn test_fatal_aborts_and_drops_later_notices() {
        let mut collector = DiagnosticCollector::new(PathBuf::from("a.xml"));
        collector.on_warning(Notice::new("first"));
        assert_eq!(
            collector.on_fatal(Notice::at("tag mismatch", 4, 2)),
            ParseFlow::Abort
        );
        // A parser that keeps calling anyway gets told to stop again, and
        // nothing more is recorded.
        assert_eq!(collector.on_error(Notice::new("late")), ParseFlow::Abort);
        assert_eq!(collector.on_warning(Notice::new("later")), ParseFlow::Abort);

        let result = collector.into_result();
        assert_eq!(result.status, FileStatus::AbortedOnFatal);
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(
            result.diagnostics.last().map(|d| d.severity),
            Some(Severity::Fatal)
        );
    }

    #[test]
    fn test_missing_location_becomes_unknown() {
        let mut collector = DiagnosticCollector::new(PathBuf::from("a.xml"));
        collector.on_error(Notice::new("no position"));
        let result = collector.into_result();
        assert_eq!(result.diagnostics[0].location, Location::UNKNOWN);
        assert!(!result.diagnostics[0].location.is_known());
    }

    #[test]
    fn test_emission_order_preserved() {
        let mut collector = DiagnosticCollector::new(PathBuf::from("a.xml"));
        for i in 0..5u32 {
            collector.on_error(Notice::at(format!("e{i}"), i + 1, 1));
        }
        let result = collector.into_result();
        let messages: Vec<_> = result
            .diagnostics
            .iter()
            .map(|d| d.message.as_str())
            .collect();
        assert_eq!(messages, vec!["e0", "e1", "e2", "e3", "e4"]);
    }
}
