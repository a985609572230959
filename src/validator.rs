//! Validation engine
//!
//! Two layers, mirroring the batch contract:
//!
//! - [`validate_document`] runs one parse-and-validate pass for one file,
//!   strictly sequentially with respect to the parser's callback stream.
//! - [`BatchValidator`] fans the single-document validator out over a
//!   semaphore-bounded set of tokio tasks. Workers write into
//!   index-addressed slots, so whatever the scheduling, the report's result
//!   order always equals the input order.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;

use crate::diagnostic::{FileResult, Report};
use crate::parser::{SchemaParser, SchemaSource};
use crate::sink::DiagnosticCollector;

/// One unit of work: a document and the grammar to check it against.
#[derive(Debug, Clone)]
pub struct ValidationJob {
    pub document: PathBuf,
    pub schema: SchemaSource,
}

impl ValidationJob {
    pub fn new(document: PathBuf, schema: SchemaSource) -> Self {
        ValidationJob { document, schema }
    }
}

/// Batch execution knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of documents validated concurrently; 1 means strictly
    /// sequential execution.
    pub concurrency: usize,
    /// Stop handing out new work after the first infrastructure failure.
    /// In-flight files keep their results.
    pub stop_on_first_infrastructure_failure: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            concurrency: num_cpus::get(),
            stop_on_first_infrastructure_failure: false,
        }
    }
}

/// Validate one document and freeze its result.
///
/// A fatal abort is a normal terminal state, not a failure of the
/// validator. Infrastructure failures (unreadable inputs, parser internal
/// breakage) produce a `CouldNotValidate` result with no fabricated
/// diagnostics.
pub fn validate_document(
    parser: &dyn SchemaParser,
    document: &Path,
    schema: &SchemaSource,
) -> FileResult {
    let mut collector = DiagnosticCollector::new(document.to_path_buf());
    match parser.parse_and_validate(document, schema, &mut collector) {
        Ok(_) => collector.into_result(),
        Err(infra) => FileResult::could_not_validate(document.to_path_buf(), infra.to_string()),
    }
}

/// Runs the single-document validator over an input set and assembles the
/// aggregate report.
pub struct BatchValidator {
    parser: Arc<dyn SchemaParser>,
    config: BatchConfig,
}

impl BatchValidator {
    pub fn new(parser: Arc<dyn SchemaParser>, config: BatchConfig) -> Self {
        BatchValidator { parser, config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Validate every job and return one report slot per input, in input
    /// order. One file's infrastructure problem never aborts the batch
    /// unless `stop_on_first_infrastructure_failure` is set.
    pub async fn run(&self, jobs: Vec<ValidationJob>) -> Report {
        if jobs.is_empty() {
            return Report::new(Vec::new());
        }

        let total = jobs.len();
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.concurrency.max(1)));
        let stop = Arc::new(AtomicBool::new(false));
        let stop_on_infra = self.config.stop_on_first_infrastructure_failure;

        // Fallback identifiers for the rare case a worker task dies.
        let paths: Vec<PathBuf> = jobs.iter().map(|j| j.document.clone()).collect();

        let tasks: Vec<_> = jobs
            .into_iter()
            .enumerate()
            .map(|(index, job)| {
                let parser = Arc::clone(&self.parser);
                let semaphore = Arc::clone(&semaphore);
                let stop = Arc::clone(&stop);

                tokio::spawn(async move {
                    let path = job.document.clone();

                    let Ok(_permit) = semaphore.acquire().await else {
                        return (
                            index,
                            FileResult::could_not_validate(path, "validation pool shut down"),
                        );
                    };

                    if stop.load(Ordering::SeqCst) {
                        return (
                            index,
                            FileResult::could_not_validate(
                                path,
                                "not attempted: stopped after earlier infrastructure failure",
                            ),
                        );
                    }

                    // The parse is CPU-bound and blocking; keep it off the
                    // async worker threads.
                    let blocking_path = path.clone();
                    let result = tokio::task::spawn_blocking(move || {
                        validate_document(parser.as_ref(), &job.document, &job.schema)
                    })
                    .await
                    .unwrap_or_else(|e| {
                        FileResult::could_not_validate(
                            blocking_path,
                            format!("validation worker failed: {e}"),
                        )
                    });

                    if stop_on_infra && result.status.is_infrastructure_failure() {
                        stop.store(true, Ordering::SeqCst);
                    }

                    (index, result)
                })
            })
            .collect();

        let mut slots: Vec<Option<FileResult>> = (0..total).map(|_| None).collect();
        for (position, joined) in join_all(tasks).await.into_iter().enumerate() {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => {
                    slots[position] = Some(FileResult::could_not_validate(
                        paths[position].clone(),
                        format!("validation worker failed: {e}"),
                    ));
                }
            }
        }

        Report::new(
            slots
                .into_iter()
                .enumerate()
                .map(|(index, slot)| {
                    slot.unwrap_or_else(|| {
                        FileResult::could_not_validate(
                            paths[index].clone(),
                            "validation worker produced no result",
                        )
                    })
                })
                .collect(),
        )
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Scripted parser used by engine tests: replays a fixed notification
    //! sequence per file name through the sink, honoring abort signals.

    use std::collections::HashMap;
    use std::path::Path;

    use crate::diagnostic::Severity;
    use crate::error::{InfraError, Result};
    use crate::parser::{ParseOutcome, SchemaParser, SchemaSource};
    use crate::sink::{Notice, NotificationSink, ParseFlow};

    #[derive(Debug, Clone)]
    pub enum Script {
        Notices(Vec<(Severity, &'static str)>),
        Infra(&'static str),
    }

    pub struct ScriptedParser {
        scripts: HashMap<String, Script>,
    }

    impl ScriptedParser {
        pub fn new(scripts: impl IntoIterator<Item = (&'static str, Script)>) -> Self {
            ScriptedParser {
                scripts: scripts
                    .into_iter()
                    .map(|(name, script)| (name.to_string(), script))
                    .collect(),
            }
        }
    }

    impl SchemaParser for ScriptedParser {
        fn parse_and_validate(
            &self,
            document: &Path,
            _schema: &SchemaSource,
            sink: &mut dyn NotificationSink,
        ) -> Result<ParseOutcome> {
            let name = document
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            match self.scripts.get(&name) {
                None => Ok(ParseOutcome::Completed),
                Some(Script::Infra(reason)) => Err(InfraError::SchemaUnreadable {
                    path: document.to_path_buf(),
                    details: reason.to_string(),
                }),
                Some(Script::Notices(steps)) => {
                    for (position, (severity, message)) in steps.iter().enumerate() {
                        let notice = Notice::at(*message, position as u32 + 1, 1);
                        let flow = match severity {
                            Severity::Warning => sink.on_warning(notice),
                            Severity::Error => sink.on_error(notice),
                            Severity::Fatal => sink.on_fatal(notice),
                        };
                        if flow == ParseFlow::Abort {
                            return Ok(ParseOutcome::Aborted);
                        }
                    }
                    Ok(ParseOutcome::Completed)
                }
            }
        }
    }
}
