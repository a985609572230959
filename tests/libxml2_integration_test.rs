//! Full-pipeline tests against the real libxml2 backend: fixture documents
//! on disk, schema auto-location, batch validation, verdicts and rendered
//! reports.

mod common;

use std::sync::Arc;

use common::write_fixture;
use tempfile::TempDir;
use xmlcheck::diagnostic::{FileStatus, Severity};
use xmlcheck::libxml2::LibXml2Parser;
use xmlcheck::output::render;
use xmlcheck::parser::SchemaSource;
use xmlcheck::policy::{
    EXIT_INFRASTRUCTURE_FAILURE, EXIT_PASS, EXIT_POLICY_FAILURE, SeverityPolicy, exit_code,
};
use xmlcheck::schema_locator::locate_schema;
use xmlcheck::validator::{BatchConfig, BatchValidator, ValidationJob};

const NOTE_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:element name="note">
        <xs:complexType>
            <xs:sequence>
                <xs:element name="to" type="xs:string"/>
                <xs:element name="body" type="xs:string"/>
            </xs:sequence>
        </xs:complexType>
    </xs:element>
</xs:schema>"#;

fn engine(concurrency: usize) -> BatchValidator {
    BatchValidator::new(
        Arc::new(LibXml2Parser::new()),
        BatchConfig {
            concurrency,
            stop_on_first_infrastructure_failure: false,
        },
    )
}

#[tokio::test]
async fn test_mixed_xsd_batch_end_to_end() {
    let dir = TempDir::new().unwrap();
    let schema = write_fixture(dir.path(), "note.xsd", NOTE_XSD);

    let valid = write_fixture(
        dir.path(),
        "valid.xml",
        "<?xml version=\"1.0\"?>\n<note><to>a</to><body>b</body></note>",
    );
    let invalid = write_fixture(
        dir.path(),
        "invalid.xml",
        "<?xml version=\"1.0\"?>\n<note><to>a</to><oops/></note>",
    );
    let malformed = write_fixture(
        dir.path(),
        "malformed.xml",
        "<?xml version=\"1.0\"?>\n<note><to>a</to>",
    );

    let jobs = vec![
        ValidationJob::new(valid.clone(), SchemaSource::Xsd(schema.clone())),
        ValidationJob::new(invalid.clone(), SchemaSource::Xsd(schema.clone())),
        ValidationJob::new(malformed.clone(), SchemaSource::Xsd(schema.clone())),
    ];
    let report = engine(4).run(jobs).await;

    assert_eq!(report.len(), 3);
    assert!(report.results[0].is_clean());

    assert_eq!(report.results[1].status, FileStatus::Completed);
    assert_eq!(report.results[1].worst_severity(), Some(Severity::Error));
    assert!(report.results[1].diagnostics.iter().all(|d| d.location.is_known()));

    assert_eq!(report.results[2].status, FileStatus::AbortedOnFatal);
    assert_eq!(
        report.results[2].diagnostics.last().map(|d| d.severity),
        Some(Severity::Fatal)
    );

    let verdict = SeverityPolicy::default().decide(&report);
    assert!(!verdict.pass);
    assert_eq!(exit_code(&verdict), EXIT_POLICY_FAILURE);

    let text = render(&report, &verdict);
    assert!(text.contains("valid.xml: ok"));
    assert!(text.contains("result: FAIL (severity threshold)"));
}

#[tokio::test]
async fn test_missing_schema_is_infrastructure_failure_not_batch_abort() {
    let dir = TempDir::new().unwrap();
    let schema = write_fixture(dir.path(), "note.xsd", NOTE_XSD);
    let valid = write_fixture(
        dir.path(),
        "valid.xml",
        "<?xml version=\"1.0\"?>\n<note><to>a</to><body>b</body></note>",
    );
    let orphan = write_fixture(dir.path(), "orphan.xml", "<?xml version=\"1.0\"?>\n<x/>");

    let jobs = vec![
        ValidationJob::new(
            orphan.clone(),
            SchemaSource::Xsd(dir.path().join("missing.xsd")),
        ),
        ValidationJob::new(valid.clone(), SchemaSource::Xsd(schema)),
    ];
    let report = engine(2).run(jobs).await;

    assert!(report.results[0].status.is_infrastructure_failure());
    assert!(report.results[0].diagnostics.is_empty());
    assert!(report.results[1].is_clean());

    let verdict = SeverityPolicy::default().decide(&report);
    assert_eq!(exit_code(&verdict), EXIT_INFRASTRUCTURE_FAILURE);
}

#[tokio::test]
async fn test_dtd_batch_with_auto_location() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path(), "note.dtd", "<!ELEMENT note (#PCDATA)>");
    let good = write_fixture(
        dir.path(),
        "good.xml",
        "<?xml version=\"1.0\"?>\n<!DOCTYPE note SYSTEM \"note.dtd\">\n<note>hi</note>",
    );
    let bad = write_fixture(
        dir.path(),
        "bad.xml",
        "<?xml version=\"1.0\"?>\n<!DOCTYPE note SYSTEM \"note.dtd\">\n<note><x/></note>",
    );

    let mut jobs = Vec::new();
    for doc in [&good, &bad] {
        let schema = locate_schema(doc).await.unwrap().expect("DOCTYPE present");
        assert!(matches!(schema, SchemaSource::Dtd(_)));
        jobs.push(ValidationJob::new(doc.clone(), schema));
    }
    let report = engine(2).run(jobs).await;

    assert!(report.results[0].is_clean());
    assert_eq!(report.results[1].worst_severity(), Some(Severity::Error));
}

#[tokio::test]
async fn test_xsd_auto_location_via_no_namespace_hint() {
    let dir = TempDir::new().unwrap();
    let schema = write_fixture(dir.path(), "note.xsd", NOTE_XSD);
    let doc = write_fixture(
        dir.path(),
        "doc.xml",
        "<?xml version=\"1.0\"?>\n<note xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" xsi:noNamespaceSchemaLocation=\"note.xsd\"><to>a</to><body>b</body></note>",
    );

    let located = locate_schema(&doc).await.unwrap();
    assert_eq!(located, Some(SchemaSource::Xsd(schema)));

    let report = engine(1)
        .run(vec![ValidationJob::new(doc, located.unwrap())])
        .await;
    let verdict = SeverityPolicy::default().decide(&report);
    assert!(verdict.pass);
    assert_eq!(exit_code(&verdict), EXIT_PASS);
}

#[tokio::test]
async fn test_shared_schema_compiled_once_across_batch() {
    let dir = TempDir::new().unwrap();
    let schema = write_fixture(dir.path(), "note.xsd", NOTE_XSD);

    let jobs: Vec<ValidationJob> = (0..8)
        .map(|i| {
            let doc = write_fixture(
                dir.path(),
                &format!("doc{i}.xml"),
                "<?xml version=\"1.0\"?>\n<note><to>a</to><body>b</body></note>",
            );
            ValidationJob::new(doc, SchemaSource::Xsd(schema.clone()))
        })
        .collect();

    // All eight share one grammar; the memoizing backend must keep results
    // correct under full concurrency.
    let report = engine(8).run(jobs).await;
    assert_eq!(report.len(), 8);
    assert!(report.results.iter().all(|r| r.is_clean()));
}
