//! Shared test support: a scripted parser that replays a fixed
//! notification sequence per file name, and small fixture helpers.
//
// Each integration test binary compiles this module separately and uses a
// different subset of it.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use xmlcheck::diagnostic::Severity;
use xmlcheck::error::{InfraError, Result};
use xmlcheck::parser::{ParseOutcome, SchemaParser, SchemaSource};
use xmlcheck::sink::{Notice, NotificationSink, ParseFlow};

#[derive(Debug, Clone)]
pub enum Script {
    Notices(Vec<(Severity, &'static str)>),
    Infra(&'static str),
}

/// Stands in for the libxml2 backend in engine-level tests. Keyed by file
/// name; unknown files validate cleanly.
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

/// Write a fixture file under `dir` and return its path.
pub fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut f = std::fs::File::create(&path).unwrap();
    write!(f, "{content}").unwrap();
    path
}
