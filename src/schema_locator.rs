//! Schema auto-location
//!
//! When the caller supplies no schema, the document head usually names one:
//! `xsi:noNamespaceSchemaLocation`, the second token of an
//! `xsi:schemaLocation` pair, or a `<!DOCTYPE ... SYSTEM "...">`
//! declaration. Only local references are honored; fetching remote schemas
//! is out of scope.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tokio::io::AsyncReadExt;

use crate::error::Result;
use crate::parser::SchemaSource;

/// Only the document head is scanned; schema references do not appear
/// after the root element opens.
const HEAD_SCAN_BYTES: usize = 16 * 1024;

// XML allows either quote style around attribute values and system
// literals.
static NO_NAMESPACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"xsi:noNamespaceSchemaLocation\s*=\s*["']([^"']+)["']"#).expect("static regex")
});

// xsi:schemaLocation holds namespace/location pairs; the location is the
// second token.
static SCHEMA_LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"xsi:schemaLocation\s*=\s*["']\s*\S+\s+([^"'\s]+)"#).expect("static regex")
});

static DOCTYPE_SYSTEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<!DOCTYPE\s+\S+\s+SYSTEM\s+["']([^"']+)["']"#).expect("static regex")
});

static DOCTYPE_INTERNAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!DOCTYPE\s+\S+\s*\[").expect("static regex"));

fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Resolve a schema reference relative to the referencing document.
fn resolve(document: &Path, reference: &str) -> PathBuf {
    let candidate = Path::new(reference);
    if candidate.is_absolute() {
        return candidate.to_path_buf();
    }
    match document.parent() {
        Some(parent) => parent.join(candidate),
        None => candidate.to_path_buf(),
    }
}

/// Scan a document's head for a usable local schema reference.
///
/// Returns `None` when the document names no schema or only a remote one;
/// the caller decides how to surface that (typically as an infrastructure
/// failure for the file).
pub async fn locate_schema(document: &Path) -> Result<Option<SchemaSource>> {
    let mut file = tokio::fs::File::open(document).await?;
    let mut head = vec![0u8; HEAD_SCAN_BYTES];
    let mut filled = 0;
    loop {
        let n = file.read(&mut head[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == head.len() {
            break;
        }
    }
    head.truncate(filled);
    let head = String::from_utf8_lossy(&head);

    if let Some(caps) = NO_NAMESPACE_RE.captures(&head) {
        let reference = &caps[1];
        if !is_remote(reference) {
            return Ok(Some(SchemaSource::Xsd(resolve(document, reference))));
        }
    }
    if let Some(caps) = SCHEMA_LOCATION_RE.captures(&head) {
        let reference = &caps[1];
        if !is_remote(reference) {
            return Ok(Some(SchemaSource::Xsd(resolve(document, reference))));
        }
    }
    if let Some(caps) = DOCTYPE_SYSTEM_RE.captures(&head) {
        let reference = &caps[1];
        if !is_remote(reference) {
            return Ok(Some(SchemaSource::Dtd(resolve(document, reference))));
        }
    }
    if DOCTYPE_INTERNAL_RE.is_match(&head) {
        return Ok(Some(SchemaSource::InternalDtd));
    }

    Ok(None)
}
