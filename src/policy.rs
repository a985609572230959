//! Severity policy and exit codes
//!
//! Pure decision layer: a report plus a configured failure threshold yields
//! a verdict, and a verdict maps to a process exit code. Nothing here does
//! I/O or mutates the report.

use serde::{Deserialize, Serialize};

use crate::diagnostic::{Report, Severity, SeverityCounts};

/// Everything passed.
pub const EXIT_PASS: i32 = 0;
/// Diagnostics at or above the failure threshold were found.
pub const EXIT_POLICY_FAILURE: i32 = 1;
/// At least one file could not be validated at all. Distinct from
/// [`EXIT_POLICY_FAILURE`] so scripts can tell "violations found" from
/// "could not run validation".
pub const EXIT_INFRASTRUCTURE_FAILURE: i32 = 2;

/// Pass/fail policy configuration.
///
/// The default threshold is [`Severity::Error`]: warnings alone do not fail
/// the batch. `fail_on: Warning` treats warnings as failures; `fail_on:
/// Fatal` fails only on well-formedness breaks. Infrastructure failures are
/// never masked by the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityPolicy {
    pub fail_on: Severity,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        SeverityPolicy {
            fail_on: Severity::Error,
        }
    }
}

impl SeverityPolicy {
    pub fn new(fail_on: Severity) -> Self {
        SeverityPolicy { fail_on }
    }

    /// Derive the verdict for a report. Recomputable on demand; the report
    /// is not modified.
    pub fn decide(&self, report: &Report) -> Verdict {
        let worst = report.overall_worst_severity();
        let infrastructure_failures = report.infrastructure_failures();
        let severity_fail = worst.is_some_and(|w| w >= self.fail_on);
        Verdict {
            pass: !severity_fail && infrastructure_failures == 0,
            worst,
            counts: report.severity_counts(),
            infrastructure_failures,
        }
    }
}

/// Derived pass/fail judgment for one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub pass: bool,
    pub worst: Option<Severity>,
    pub counts: SeverityCounts,
    pub infrastructure_failures: usize,
}

impl Verdict {
    /// Category named on the report's final line.
    pub fn category(&self) -> &'static str {
        if self.infrastructure_failures > 0 {
            "infrastructure failure"
        } else if self.pass {
            "pass"
        } else {
            "severity threshold"
        }
    }
}

/// Map a verdict to the process exit code. Infrastructure failures take
/// precedence over policy failures.
pub fn exit_code(verdict: &Verdict) -> i32 {
    if verdict.infrastructure_failures > 0 {
        EXIT_INFRASTRUCTURE_FAILURE
    } else if verdict.pass {
        EXIT_PASS
    } else {
        EXIT_POLICY_FAILURE
    }
}
