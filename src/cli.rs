use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::diagnostic::Severity;
use crate::parser::SchemaSource;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only the final result line
    Quiet,
    /// Full report
    #[default]
    Normal,
    /// Report plus per-file progress on stderr
    Verbose,
}

/// How to interpret the `--schema` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SchemaTypeArg {
    /// Infer from the schema file extension, or scan each document's head
    /// when no schema is given.
    #[default]
    Auto,
    Xsd,
    Dtd,
    /// Validate each document against its own internal DTD subset.
    Internal,
}

/// Severity threshold accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailOnArg {
    Warning,
    Error,
    Fatal,
}

impl From<FailOnArg> for Severity {
    fn from(arg: FailOnArg) -> Self {
        match arg {
            FailOnArg::Warning => Severity::Warning,
            FailOnArg::Error => Severity::Error,
            FailOnArg::Fatal => Severity::Fatal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Human,
    Json,
}

/// Validate XML documents against XSD or DTD grammars
#[derive(Parser, Debug, Clone)]
#[command(name = "xmlcheck")]
#[command(about = "Validate XML files against XSD or DTD grammars and aggregate the diagnostics")]
#[command(version)]
pub struct Cli {
    /// Files or directories to validate
    #[arg(required = true, help = "Documents or directories to validate")]
    pub paths: Vec<PathBuf>,

    /// Schema to validate against (XSD or DTD file)
    #[arg(
        short = 's',
        long = "schema",
        help = "Schema file; omit to auto-locate from each document"
    )]
    pub schema: Option<PathBuf>,

    /// How to interpret the schema argument
    #[arg(long = "schema-type", value_enum, default_value_t = SchemaTypeArg::Auto)]
    pub schema_type: SchemaTypeArg,

    /// Lowest severity that fails the run
    ///
    /// Optional so a config-file or environment threshold survives when the
    /// flag is absent.
    #[arg(long = "fail-on", value_enum)]
    pub fail_on: Option<FailOnArg>,

    /// Number of concurrent validation threads
    #[arg(
        short = 't',
        long = "threads",
        help = "Number of concurrent validation threads"
    )]
    pub threads: Option<usize>,

    /// Stop scheduling new files after the first infrastructure failure
    #[arg(long = "fail-fast")]
    pub fail_fast: bool,

    /// Report format
    #[arg(short = 'f', long = "format", value_enum)]
    pub format: Option<FormatArg>,

    /// File extensions to process (comma-separated)
    #[arg(
        short = 'e',
        long = "extensions",
        help = "File extensions to process (e.g., 'xml,cmdi')"
    )]
    pub extensions: Option<String>,

    /// Include file patterns (glob syntax)
    #[arg(long = "include", action = clap::ArgAction::Append)]
    pub include_patterns: Vec<String>,

    /// Exclude file patterns (glob syntax)
    #[arg(long = "exclude", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Quiet mode (final result line only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Extension list when `-e` was given, `None` otherwise.
    pub fn get_extensions(&self) -> Option<Vec<String>> {
        self.extensions.as_ref().map(|extensions| {
            extensions
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        for path in &self.paths {
            if !path.exists() {
                return Err(format!("Path does not exist: {}", path.display()));
            }
        }
        if let Some(threads) = self.threads
            && threads == 0
        {
            return Err("Number of threads must be greater than 0".to_string());
        }
        if matches!(self.schema_type, SchemaTypeArg::Xsd | SchemaTypeArg::Dtd)
            && self.schema.is_none()
        {
            return Err(format!(
                "--schema-type {} requires --schema",
                match self.schema_type {
                    SchemaTypeArg::Xsd => "xsd",
                    _ => "dtd",
                }
            ));
        }
        Ok(())
    }

    /// Schema shared by the whole batch, or `None` when each document's
    /// head is scanned individually.
    pub fn schema_source(&self) -> Option<SchemaSource> {
        match (self.schema_type, &self.schema) {
            (SchemaTypeArg::Internal, _) => Some(SchemaSource::InternalDtd),
            (SchemaTypeArg::Xsd, Some(path)) => Some(SchemaSource::Xsd(path.clone())),
            (SchemaTypeArg::Dtd, Some(path)) => Some(SchemaSource::Dtd(path.clone())),
            (SchemaTypeArg::Auto, Some(path)) => Some(SchemaSource::from_path(path.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_basic_cli_parsing() {
        let args = vec!["xmlcheck", "/tmp"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.paths, vec![PathBuf::from("/tmp")]);
        assert_eq!(cli.schema_type, SchemaTypeArg::Auto);
        assert!(!cli.fail_fast);
    }

    #[test]
    fn test_omitted_flags_stay_unset() {
        // These must parse as None so lower configuration layers are not
        // clobbered by CLI defaults.
        let cli = Cli::try_parse_from(vec!["xmlcheck", "/tmp"]).unwrap();
        assert_eq!(cli.fail_on, None);
        assert_eq!(cli.format, None);
        assert_eq!(cli.extensions, None);
        assert_eq!(cli.get_extensions(), None);
    }

    #[test]
    fn test_requires_at_least_one_path() {
        assert!(Cli::try_parse_from(vec!["xmlcheck"]).is_err());
    }

    #[test]
    fn test_schema_source_from_auto() {
        let cli =
            Cli::try_parse_from(vec!["xmlcheck", "--schema", "grammar.dtd", "/tmp"]).unwrap();
        assert_eq!(
            cli.schema_source(),
            Some(SchemaSource::Dtd(PathBuf::from("grammar.dtd")))
        );

        let cli = Cli::try_parse_from(vec!["xmlcheck", "/tmp"]).unwrap();
        assert_eq!(cli.schema_source(), None);
    }

    #[test]
    fn test_explicit_schema_type_overrides_extension() {
        let cli = Cli::try_parse_from(vec![
            "xmlcheck",
            "--schema",
            "grammar.txt",
            "--schema-type",
            "dtd",
            "/tmp",
        ])
        .unwrap();
        assert_eq!(
            cli.schema_source(),
            Some(SchemaSource::Dtd(PathBuf::from("grammar.txt")))
        );
    }

    #[test]
    fn test_internal_schema_type_needs_no_schema() {
        let cli =
            Cli::try_parse_from(vec!["xmlcheck", "--schema-type", "internal", "/tmp"]).unwrap();
        assert_eq!(cli.schema_source(), Some(SchemaSource::InternalDtd));
    }

    #[test]
    fn test_xsd_schema_type_requires_schema_argument() {
        let cli = Cli::try_parse_from(vec!["xmlcheck", "--schema-type", "xsd", "/tmp"]).unwrap();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(vec!["xmlcheck", "-q", "-v", "/tmp"]).is_err());
    }

    #[test]
    fn test_fail_on_parses_severities() {
        for (arg, expected) in [
            ("warning", Severity::Warning),
            ("error", Severity::Error),
            ("fatal", Severity::Fatal),
        ] {
            let cli = Cli::try_parse_from(vec!["xmlcheck", "--fail-on", arg, "/tmp"]).unwrap();
            assert_eq!(cli.fail_on.map(Severity::from), Some(expected));
        }
    }

    #[test]
    fn test_extensions_split_and_trimmed() {
        let cli =
            Cli::try_parse_from(vec!["xmlcheck", "-e", "xml, cmdi ,", "/tmp"]).unwrap();
        assert_eq!(
            cli.get_extensions(),
            Some(vec!["xml".to_string(), "cmdi".to_string()])
        );
    }
}
