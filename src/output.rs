//! Report rendering
//!
//! Turns a frozen report plus its verdict into text. The human rendering
//! is deterministic: the same report and verdict always produce
//! byte-identical output, with no timestamps, durations or colors, so CI
//! logs are reproducible and diffable. All I/O is left to the caller.

use std::fmt::Write as _;

use serde::Serialize;

use crate::diagnostic::{FileResult, FileStatus, Report};
use crate::policy::Verdict;

/// Requested rendering of the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

/// Render the report as line-oriented text.
///
/// Every input file appears exactly once, in input order: clean files get
/// an `ok` line, files with diagnostics get one line per diagnostic in
/// emission order, and files that could not be validated get an explicit
/// marker. A two-line summary with per-severity counts and the verdict
/// closes the report.
pub fn render(report: &Report, verdict: &Verdict) -> String {
    let mut out = String::new();

    for result in &report.results {
        render_file(&mut out, result);
    }

    let _ = writeln!(
        out,
        "summary: {} file{}, warnings: {}, errors: {}, fatal: {}, not validated: {}",
        report.len(),
        if report.len() == 1 { "" } else { "s" },
        verdict.counts.warnings,
        verdict.counts.errors,
        verdict.counts.fatals,
        verdict.infrastructure_failures,
    );
    let _ = writeln!(
        out,
        "result: {}",
        if verdict.pass {
            "PASS".to_string()
        } else {
            format!("FAIL ({})", verdict.category())
        }
    );

    out
}

fn render_file(out: &mut String, result: &FileResult) {
    let path = result.path.display();
    match &result.status {
        FileStatus::CouldNotValidate { reason } => {
            let _ = writeln!(out, "{path}: could not validate: {reason}");
        }
        FileStatus::Completed | FileStatus::AbortedOnFatal => {
            if result.diagnostics.is_empty() {
                let _ = writeln!(out, "{path}: ok");
                return;
            }
            for diagnostic in &result.diagnostics {
                if diagnostic.location.is_known() {
                    let _ = writeln!(
                        out,
                        "{path}:{}: {}: {}",
                        diagnostic.location, diagnostic.severity, diagnostic.message
                    );
                } else {
                    let _ = writeln!(out, "{path}: {}: {}", diagnostic.severity, diagnostic.message);
                }
            }
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    results: &'a [FileResult],
    verdict: &'a Verdict,
}

/// Machine-readable rendering of the same report.
pub fn render_json(report: &Report, verdict: &Verdict) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport {
        results: &report.results,
        verdict,
    })
}
