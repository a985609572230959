//! Diagnostic data model
//!
//! Value types shared by the whole pipeline: severities, source locations,
//! per-notification diagnostics, per-file results and the aggregate report.
//! Everything here is plain data; behavior lives in the adapter, engine and
//! policy modules.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Severity of one validation diagnostic.
///
/// The variant order defines the total order used for policy comparisons:
/// `Warning < Error < Fatal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Advisory finding; the parse continues.
    Warning,
    /// Schema/content violation; recoverable within the same document.
    Error,
    /// Well-formedness break; the parse cannot safely continue.
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position inside the document under validation.
///
/// Line and column are 1-based; 0 means the parser did not supply that
/// coordinate. The owning [`FileResult`] carries the file identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    /// Location for notifications that carried no position metadata.
    pub const UNKNOWN: Location = Location { line: 0, column: 0 };

    pub fn new(line: u32, column: u32) -> Self {
        Location { line, column }
    }

    pub fn is_known(&self) -> bool {
        self.line != 0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One structured report of a document violating well-formedness or schema
/// constraints. Created exactly once per parser notification and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub location: Location,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, location: Location, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            location,
            message: message.into(),
        }
    }
}

/// Terminal state of one file's validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FileStatus {
    /// The parse ran to the end of the document, with or without
    /// warning/error diagnostics.
    Completed,
    /// A fatal notification stopped the parse; the last diagnostic is the
    /// fatal one.
    AbortedOnFatal,
    /// The validator could not form a judgment at all (unreadable schema or
    /// document, parser internal failure). Not a severity: this slot has no
    /// fabricated diagnostics.
    CouldNotValidate { reason: String },
}

impl FileStatus {
    pub fn is_infrastructure_failure(&self) -> bool {
        matches!(self, FileStatus::CouldNotValidate { .. })
    }
}

/// Complete outcome of checking one document instance.
///
/// Diagnostics are append-only during the parse and frozen once the parse
/// returns; they keep emission order and are never re-sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResult {
    pub path: PathBuf,
    pub status: FileStatus,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileResult {
    pub fn completed(path: PathBuf, diagnostics: Vec<Diagnostic>) -> Self {
        FileResult {
            path,
            status: FileStatus::Completed,
            diagnostics,
        }
    }

    pub fn aborted(path: PathBuf, diagnostics: Vec<Diagnostic>) -> Self {
        debug_assert!(
            matches!(diagnostics.last(), Some(d) if d.severity == Severity::Fatal),
            "aborted result must end with a fatal diagnostic"
        );
        FileResult {
            path,
            status: FileStatus::AbortedOnFatal,
            diagnostics,
        }
    }

    pub fn could_not_validate(path: PathBuf, reason: impl Into<String>) -> Self {
        FileResult {
            path,
            status: FileStatus::CouldNotValidate {
                reason: reason.into(),
            },
            diagnostics: Vec::new(),
        }
    }

    /// Worst severity observed in this file, `None` when no diagnostics
    /// were emitted.
    pub fn worst_severity(&self) -> Option<Severity> {
        self.diagnostics.iter().map(|d| d.severity).max()
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty() && self.status == FileStatus::Completed
    }
}

/// Number of diagnostics per severity across a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub warnings: usize,
    pub errors: usize,
    pub fatals: usize,
}

impl SeverityCounts {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Warning => self.warnings += 1,
            Severity::Error => self.errors += 1,
            Severity::Fatal => self.fatals += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.warnings + self.errors + self.fatals
    }
}

/// Aggregate outcome across all documents of one invocation.
///
/// Results are stored in input order regardless of how the batch was
/// scheduled, and the report is immutable once assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub results: Vec<FileResult>,
}

impl Report {
    pub fn new(results: Vec<FileResult>) -> Self {
        Report { results }
    }

    /// Maximum severity across all contained results, `None` if no
    /// diagnostics exist anywhere.
    pub fn overall_worst_severity(&self) -> Option<Severity> {
        self.results.iter().filter_map(|r| r.worst_severity()).max()
    }

    pub fn severity_counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for result in &self.results {
            for diagnostic in &result.diagnostics {
                counts.record(diagnostic.severity);
            }
        }
        counts
    }

    /// Number of files that could not be validated at all.
    pub fn infrastructure_failures(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status.is_infrastructure_failure())
            .count()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
