use std::path::PathBuf;

use thiserror::Error;

/// Infrastructure failure: the validator could not form a judgment for a
/// file at all. Disjoint from validation diagnostics, which describe
/// problems in the document under test and are recorded in the report
/// instead of being raised as errors.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document not readable: {path}: {details}")]
    DocumentUnreadable { path: PathBuf, details: String },

    #[error("schema not readable: {path}: {details}")]
    SchemaUnreadable { path: PathBuf, details: String },

    #[error("schema did not compile: {path}: {details}")]
    SchemaInvalid { path: PathBuf, details: String },

    #[error("no schema given and none referenced by {path}")]
    SchemaNotLocated { path: PathBuf },

    #[error("parser internal error (code {code})")]
    ParserInternal { code: i32 },

    #[error("invalid file pattern: {details}")]
    InvalidPattern { details: String },
}

/// Configuration-layer errors (config file, environment, CLI merge).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("unsupported configuration file format: {0}")]
    UnsupportedFormat(String),

    #[error("environment variable error: {0}")]
    Environment(String),

    #[error("configuration validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, InfraError>;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
