//! # xmlcheck Library
//!
//! Validates XML documents against XSD or DTD grammars by driving a
//! schema-validating parser (libxml2) through a warning/error/fatal
//! notification contract, aggregating diagnostics into deterministic,
//! input-ordered reports, and deriving pass/fail verdicts from a
//! configurable severity threshold.

pub mod cli;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod file_discovery;
pub mod libxml2;
pub mod output;
pub mod parser;
pub mod policy;
pub mod schema_locator;
pub mod sink;
pub mod validator;

pub use cli::{Cli, VerbosityLevel};
pub use config::{Config, ConfigManager};
pub use diagnostic::{
    Diagnostic, FileResult, FileStatus, Location, Report, Severity, SeverityCounts,
};
pub use error::{ConfigError, InfraError};
pub use file_discovery::FileDiscovery;
pub use libxml2::LibXml2Parser;
pub use output::{OutputFormat, render, render_json};
pub use parser::{ParseOutcome, SchemaParser, SchemaSource};
pub use policy::{
    EXIT_INFRASTRUCTURE_FAILURE, EXIT_PASS, EXIT_POLICY_FAILURE, SeverityPolicy, Verdict,
    exit_code,
};
pub use schema_locator::locate_schema;
pub use sink::{DiagnosticCollector, Notice, NotificationSink, ParseFlow};
pub use validator::{BatchConfig, BatchValidator, ValidationJob, validate_document};
