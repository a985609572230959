//! Parser collaborator contract
//!
//! The core never tokenizes XML or compiles grammars itself. It drives an
//! external schema-validating parser through [`SchemaParser`] and receives
//! that parser's notifications through the sink it hands in. The libxml2
//! backend in [`crate::libxml2`] is the production implementation; tests
//! substitute scripted parsers.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::sink::NotificationSink;

/// Grammar the document is checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    /// XML Schema file.
    Xsd(PathBuf),
    /// External DTD file, overriding whatever DOCTYPE the document carries.
    Dtd(PathBuf),
    /// Validate against the DTD declared inside the document itself.
    InternalDtd,
}

impl SchemaSource {
    /// Pick the schema kind from the file extension. `.dtd` selects DTD
    /// validation, everything else is treated as XSD.
    pub fn from_path(path: PathBuf) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("dtd") => SchemaSource::Dtd(path),
            _ => SchemaSource::Xsd(path),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SchemaSource::Xsd(path) => format!("XSD {}", path.display()),
            SchemaSource::Dtd(path) => format!("DTD {}", path.display()),
            SchemaSource::InternalDtd => "internal DTD".to_string(),
        }
    }
}

/// How the parse call ended, as seen by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The parser reached the end of the document.
    Completed,
    /// The sink signalled [`crate::sink::ParseFlow::Abort`] on a fatal
    /// notification and the parser stopped early.
    Aborted,
}

/// A schema-validating XML parser.
///
/// One call validates one document. All notifications for that document go
/// to `sink` strictly sequentially; implementations must not interleave
/// callbacks of different documents into the same sink. Errors returned
/// here are infrastructure failures (unreadable inputs, internal parser
/// breakage), never document diagnostics.
pub trait SchemaParser: Send + Sync {
    fn parse_and_validate(
        &self,
        document: &Path,
        schema: &SchemaSource,
        sink: &mut dyn NotificationSink,
    ) -> Result<ParseOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_kind_from_extension() {
        assert_eq!(
            SchemaSource::from_path(PathBuf::from("a.dtd")),
            SchemaSource::Dtd(PathBuf::from("a.dtd"))
        );
        assert_eq!(
            SchemaSource::from_path(PathBuf::from("a.DTD")),
            SchemaSource::Dtd(PathBuf::from("a.DTD"))
        );
        assert_eq!(
            SchemaSource::from_path(PathBuf::from("a.xsd")),
            SchemaSource::Xsd(PathBuf::from("a.xsd"))
        );
        // Unknown extensions default to XSD.
        assert_eq!(
            SchemaSource::from_path(PathBuf::from("a.schema")),
            SchemaSource::Xsd(PathBuf::from("a.schema"))
        );
    }

    #[test]
    fn test_describe() {
        assert_eq!(SchemaSource::InternalDtd.describe(), "internal DTD");
        assert!(
            SchemaSource::Xsd(PathBuf::from("s.xsd"))
                .describe()
                .starts_with("XSD ")
        );
    }
}
