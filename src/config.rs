use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::{Cli, FormatArg, VerbosityLevel};
use crate::diagnostic::Severity;
use crate::error::{ConfigError, ConfigResult};
use crate::output::OutputFormat;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub validation: ValidationConfig,
    pub output: OutputConfig,
    pub files: FileConfig,
}

/// Validation-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    /// Number of concurrent validation threads
    pub threads: Option<usize>,
    /// Stop scheduling new files after the first infrastructure failure
    pub fail_fast: bool,
    /// Lowest severity that fails the run
    pub fail_on: Severity,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Report format
    pub format: OutputFormatConfig,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode (final result only)
    pub quiet: bool,
}

/// File processing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    /// File extensions to process
    pub extensions: Vec<String>,
    /// Include patterns (glob syntax)
    pub include_patterns: Vec<String>,
    /// Exclude patterns (glob syntax)
    pub exclude_patterns: Vec<String>,
}

/// Report format (serializable version of the CLI/renderer enum)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatConfig {
    #[default]
    Human,
    Json,
}

impl From<FormatArg> for OutputFormatConfig {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Human => OutputFormatConfig::Human,
            FormatArg::Json => OutputFormatConfig::Json,
        }
    }
}

impl From<OutputFormatConfig> for OutputFormat {
    fn from(format: OutputFormatConfig) -> Self {
        match format {
            OutputFormatConfig::Human => OutputFormat::Human,
            OutputFormatConfig::Json => OutputFormat::Json,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            threads: None,
            fail_fast: false,
            fail_on: Severity::Error,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormatConfig::Human,
            verbose: false,
            quiet: false,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["xml".to_string()],
            include_patterns: vec![],
            exclude_patterns: vec![],
        }
    }
}

impl Config {
    pub fn verbosity(&self) -> VerbosityLevel {
        if self.output.quiet {
            VerbosityLevel::Quiet
        } else if self.output.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// Effective concurrency for the batch.
    pub fn thread_count(&self) -> usize {
        self.validation.threads.unwrap_or_else(num_cpus::get)
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: defaults -> file -> environment
    /// -> CLI.
    pub async fn load_config(cli: &Cli) -> ConfigResult<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            config = Self::load_from_file(config_path).await?;
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = found_config;
        }

        config = Self::apply_environment_overrides(config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> ConfigResult<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try TOML first, then JSON.
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> ConfigResult<Option<Config>> {
        let config_names = [
            "xmlcheck.toml",
            "xmlcheck.json",
            ".xmlcheck.toml",
            ".xmlcheck.json",
        ];

        // Current directory first.
        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        // Then the user config directory.
        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("xmlcheck");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> ConfigResult<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> ConfigResult<Config> {
        if let Some(threads) = env.get("XMLCHECK_THREADS") {
            config.validation.threads = Some(threads.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid XMLCHECK_THREADS value: {threads}"))
            })?);
        }

        if let Some(fail_fast) = env.get("XMLCHECK_FAIL_FAST") {
            config.validation.fail_fast = fail_fast.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid XMLCHECK_FAIL_FAST value: {fail_fast}"))
            })?;
        }

        if let Some(fail_on) = env.get("XMLCHECK_FAIL_ON") {
            config.validation.fail_on = match fail_on.to_lowercase().as_str() {
                "warning" => Severity::Warning,
                "error" => Severity::Error,
                "fatal" => Severity::Fatal,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid XMLCHECK_FAIL_ON value: {fail_on}"
                    )));
                }
            };
        }

        if let Some(format) = env.get("XMLCHECK_FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormatConfig::Human,
                "json" => OutputFormatConfig::Json,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid XMLCHECK_FORMAT value: {format}"
                    )));
                }
            };
        }

        if let Some(verbose) = env.get("XMLCHECK_VERBOSE") {
            config.output.verbose = verbose.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid XMLCHECK_VERBOSE value: {verbose}"))
            })?;
        }

        if let Some(quiet) = env.get("XMLCHECK_QUIET") {
            config.output.quiet = quiet.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid XMLCHECK_QUIET value: {quiet}"))
            })?;
        }

        if let Some(extensions) = env.get("XMLCHECK_EXTENSIONS") {
            config.files.extensions = extensions
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration. CLI takes precedence, but
    /// only for flags the user actually passed; absent flags leave the
    /// file/environment layers intact.
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if cli.threads.is_some() {
            config.validation.threads = cli.threads;
        }
        if cli.fail_fast {
            config.validation.fail_fast = true;
        }
        if let Some(fail_on) = cli.fail_on {
            config.validation.fail_on = fail_on.into();
        }

        if let Some(format) = cli.format {
            config.output.format = format.into();
        }
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        if let Some(extensions) = cli.get_extensions() {
            config.files.extensions = extensions;
        }
        if !cli.include_patterns.is_empty() {
            config.files.include_patterns = cli.include_patterns.clone();
        }
        if !cli.exclude_patterns.is_empty() {
            config.files.exclude_patterns = cli.exclude_patterns.clone();
        }

        config
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> ConfigResult<()> {
        if let Some(threads) = config.validation.threads {
            if threads == 0 {
                return Err(ConfigError::Validation(
                    "Number of threads must be greater than 0".to_string(),
                ));
            }
            if threads > 1000 {
                return Err(ConfigError::Validation(
                    "Number of threads cannot exceed 1000".to_string(),
                ));
            }
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        if config.files.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "At least one file extension must be specified".to_string(),
            ));
        }

        for ext in &config.files.extensions {
            if ext.contains('/') || ext.contains('\\') || ext.contains('.') {
                return Err(ConfigError::Validation(format!(
                    "Invalid file extension: {ext}"
                )));
            }
        }

        Ok(())
    }
}
