mod common;

use std::collections::HashMap;

use roster_import::config::ImportConfig;
use roster_import::entity::EntityKind;
use roster_import::pipeline::{ImportJob, Importer};
use roster_import::records::ImportKind;
use roster_import::tabular::{Document, DocumentFormat, SheetSelection, read_document};
use roster_import::types::Sheet;
use roster_import::ImportError;
use serde_json::json;

use common::{TENANT, store_with_classes};

fn job() -> ImportJob {
    ImportJob::new(ImportKind::Student, TENANT)
}

fn student(id: &str, email: &str) -> serde_json::Value {
    json!({
        "FirstName": "Ada",
        "LastName": "Lovelace",
        "StudentId": id,
        "Email": email,
        "Class": "Grade 5",
        "RollNumber": 7
    })
}

#[tokio::test]
async fn json_array_rows_are_numbered_from_one() {
    let store = store_with_classes(TENANT, &["Grade 5"]);
    let body = json!([student("S-1", "ada@school.org"), student("S-2", "ada@school.org")]);
    let doc = Document::new(DocumentFormat::Json, body.to_string());

    let outcome = Importer::new(store.clone()).run(&job(), &doc).await.unwrap();

    assert_eq!(outcome.success, 1);
    assert_eq!(
        outcome.error_details,
        vec!["Row 2: Duplicate Email 'ada@school.org' also appears in row 1"]
    );
    assert_eq!(outcome.data[0]["rollNumber"], json!(7));
}

#[tokio::test]
async fn json_named_sheet_is_selected_through_config() {
    let store = store_with_classes(TENANT, &["Grade 5"]);
    let body = json!({
        "Archive": [student("OLD-1", "old@school.org")],
        "Students": [student("S-1", "ada@school.org")]
    });
    let doc = Document::new(DocumentFormat::Json, body.to_string());
    let config = ImportConfig {
        sheet: SheetSelection::Named("Students".to_string()),
        ..ImportConfig::default()
    };

    let outcome = Importer::new(store.clone())
        .with_config(config)
        .run(&job(), &doc)
        .await
        .unwrap();

    assert_eq!(outcome.success, 1);
    assert_eq!(outcome.data[0]["studentId"], json!("S-1"));
    assert_eq!(store.count(EntityKind::Student), 1);
}

#[tokio::test]
async fn unknown_sheet_fails_the_job() {
    let store = store_with_classes(TENANT, &["Grade 5"]);
    let doc = Document::new(
        DocumentFormat::Json,
        json!({"Students": [student("S-1", "ada@school.org")]}).to_string(),
    );
    let config = ImportConfig {
        sheet: SheetSelection::Named("Staff".to_string()),
        ..ImportConfig::default()
    };

    let err = Importer::new(store.clone())
        .with_config(config)
        .run(&job(), &doc)
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::NoReadableSheet { sheet: Some(ref s) } if s == "Staff"));
    assert_eq!(err.to_string(), "no readable sheet named 'Staff'");
    assert_eq!(store.count(EntityKind::Student), 0);
}

#[tokio::test]
async fn csv_with_bom_and_aliased_headers() {
    let store = store_with_classes(TENANT, &["Grade 5"]);
    let mut bytes = b"\xEF\xBB\xBF".to_vec();
    bytes.extend_from_slice(
        b"First Name,Surname,Admission No,E-mail,Class,Roll No\nAda,Lovelace,S-1,ada@school.org,grade 5,1\n",
    );
    let doc = Document::from_upload("students.CSV", bytes).unwrap();

    let aliases: HashMap<String, String> = [
        ("Surname", "LastName"),
        ("Admission No", "StudentId"),
        ("Roll No", "RollNumber"),
    ]
    .into_iter()
    .map(|(a, c)| (a.to_string(), c.to_string()))
    .collect();
    let config = ImportConfig {
        column_aliases: aliases,
        ..ImportConfig::default()
    };

    let importer = Importer::new(store.clone()).with_config(config);
    let outcome = importer.run(&job(), &doc).await.unwrap();

    assert_eq!(outcome.success, 1, "{:?}", outcome.error_details);
    assert_eq!(outcome.data[0]["class"], json!("grade 5"));

    let without_aliases = Importer::new(store.clone())
        .run(&job(), &doc)
        .await
        .unwrap_err();
    match without_aliases {
        ImportError::MissingColumns { columns } => {
            assert_eq!(columns, vec!["LastName", "StudentId", "RollNumber"]);
        }
        other => panic!("expected missing columns, got {other:?}"),
    }
}

#[tokio::test]
async fn unsupported_upload_is_rejected_before_reading() {
    let err = Document::from_upload("students.txt", "FirstName\nAda\n").unwrap_err();
    assert!(matches!(err, ImportError::UnsupportedDocument { .. }));
}

#[tokio::test]
async fn malformed_json_fails_the_job() {
    let store = store_with_classes(TENANT, &["Grade 5"]);
    let doc = Document::new(DocumentFormat::Json, "[{\"FirstName\": ");

    let err = Importer::new(store).run(&job(), &doc).await.unwrap_err();
    assert!(matches!(err, ImportError::Json(_)));
    assert!(err.is_structural());
}

#[tokio::test]
async fn sheet_read_ahead_of_time_is_imported() {
    let store = store_with_classes(TENANT, &["Grade 5"]);
    let body = json!([student("S-1", "ada@school.org"), student("S-2", "alan@school.org")]);
    let doc = Document::new(DocumentFormat::Json, body.to_string());
    let sheet = read_document(&doc, &SheetSelection::First).unwrap();
    let importer = Importer::new(store.clone());

    let outcome = importer.run_sheet(&job(), &sheet).await.unwrap();
    assert_eq!((outcome.total, outcome.success), (2, 2));
    assert_eq!(store.count(EntityKind::Student), 2);

    let columns = sheet.columns().map(str::to_owned).collect();
    let header_only = Sheet::from_cells(None, columns, Vec::new());
    let err = importer.run_sheet(&job(), &header_only).await.unwrap_err();
    assert!(matches!(err, ImportError::EmptyDocument));
    assert_eq!(store.count(EntityKind::Student), 2);
}
