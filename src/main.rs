use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use xmlcheck::cli::{Cli, VerbosityLevel};
use xmlcheck::config::{Config, ConfigManager};
use xmlcheck::file_discovery::FileDiscovery;
use xmlcheck::libxml2::LibXml2Parser;
use xmlcheck::output::OutputFormat;
use xmlcheck::parser::SchemaSource;
use xmlcheck::policy::{EXIT_INFRASTRUCTURE_FAILURE, SeverityPolicy, exit_code};
use xmlcheck::schema_locator::locate_schema;
use xmlcheck::validator::{BatchConfig, BatchValidator, ValidationJob};
use xmlcheck::{render, render_json};

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("xmlcheck: {e:#}");
            std::process::exit(EXIT_INFRASTRUCTURE_FAILURE);
        }
    }
}

async fn run() -> anyhow::Result<i32> {
    let cli = Cli::parse_args();
    cli.validate().map_err(anyhow::Error::msg)?;

    let config = ConfigManager::load_config(&cli)
        .await
        .context("failed to load configuration")?;
    let verbosity = config.verbosity();

    let files = discover_inputs(&cli, &config).await?;
    if files.is_empty() {
        anyhow::bail!("no input files found");
    }

    if verbosity >= VerbosityLevel::Verbose
        || (verbosity == VerbosityLevel::Normal && atty::is(atty::Stream::Stderr))
    {
        eprintln!(
            "validating {} file{}...",
            files.len(),
            if files.len() == 1 { "" } else { "s" }
        );
    }

    let jobs = resolve_jobs(&cli, files, verbosity).await;

    let engine = BatchValidator::new(
        Arc::new(LibXml2Parser::new()),
        BatchConfig {
            concurrency: config.thread_count(),
            stop_on_first_infrastructure_failure: config.validation.fail_fast,
        },
    );
    let report = engine.run(jobs).await;

    let policy = SeverityPolicy::new(config.validation.fail_on);
    let verdict = policy.decide(&report);

    match OutputFormat::from(config.output.format) {
        OutputFormat::Json => {
            println!("{}", render_json(&report, &verdict)?);
        }
        OutputFormat::Human => {
            let text = render(&report, &verdict);
            if verbosity == VerbosityLevel::Quiet {
                // Final result line only.
                if let Some(line) = text.lines().last() {
                    println!("{line}");
                }
            } else {
                print!("{text}");
            }
        }
    }

    Ok(exit_code(&verdict))
}

async fn discover_inputs(cli: &Cli, config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let discovery = FileDiscovery::new()
        .with_extensions(config.files.extensions.clone())
        .with_include_patterns(config.files.include_patterns.clone())?
        .with_exclude_patterns(config.files.exclude_patterns.clone())?;

    let mut files = Vec::new();
    for path in &cli.paths {
        let mut found = discovery
            .discover_files(path)
            .await
            .with_context(|| format!("failed to scan {}", path.display()))?;
        files.append(&mut found);
    }
    Ok(files)
}

/// Pair every document with its grammar. With `--schema` the whole batch
/// shares one source; otherwise each document's head is scanned. Documents
/// naming no usable schema fall through to internal-DTD validation, which
/// reports the missing grammar as that file's infrastructure failure
/// instead of aborting the batch.
async fn resolve_jobs(cli: &Cli, files: Vec<PathBuf>, verbosity: VerbosityLevel) -> Vec<ValidationJob> {
    if let Some(shared) = cli.schema_source() {
        return files
            .into_iter()
            .map(|f| ValidationJob::new(f, shared.clone()))
            .collect();
    }

    let mut jobs = Vec::with_capacity(files.len());
    for file in files {
        let schema = match locate_schema(&file).await {
            Ok(Some(source)) => source,
            Ok(None) | Err(_) => SchemaSource::InternalDtd,
        };
        if verbosity >= VerbosityLevel::Verbose {
            eprintln!("{}: using {}", file.display(), schema.describe());
        }
        jobs.push(ValidationJob::new(file, schema));
    }
    jobs
}
