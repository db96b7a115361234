#![cfg(feature = "excel_test_writer")]

mod common;

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use roster_import::config::ImportConfig;
use roster_import::entity::{Entity, EntityKind};
use roster_import::pipeline::{ImportJob, Importer};
use roster_import::records::ImportKind;
use roster_import::tabular::{Document, DocumentFormat, SheetSelection};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};
use serde_json::json;

use common::{TENANT, store_with_classes};

fn tmp_file(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("roster-import-{name}-{nanos}.xlsx"))
}

fn write_students(ws: &mut Worksheet) {
    let date = Format::new().set_num_format("yyyy-mm-dd");

    let header = [
        "First Name",
        "Last Name",
        "Student ID",
        "Email",
        "Class",
        "Roll Number",
        "Date of Birth",
    ];
    for (col, name) in header.iter().enumerate() {
        ws.write_string(0, col as u16, *name).unwrap();
    }

    ws.write_string(1, 0, "Ada").unwrap();
    ws.write_string(1, 1, "Lovelace").unwrap();
    ws.write_string(1, 2, "S-001").unwrap();
    ws.write_string(1, 3, "ada@school.org").unwrap();
    ws.write_string(1, 4, "Grade 5").unwrap();
    ws.write_number(1, 5, 3).unwrap();
    let dob = ExcelDateTime::from_ymd(2014, 6, 23).unwrap();
    ws.write_datetime_with_format(1, 6, &dob, &date).unwrap();

    ws.write_string(2, 0, "Grace").unwrap();
    ws.write_string(2, 1, "Hopper").unwrap();
    ws.write_string(2, 2, "S-002").unwrap();
    ws.write_string(2, 3, "grace@school.org").unwrap();
    ws.write_string(2, 4, "Grade 5").unwrap();
    ws.write_number(2, 5, 4.5).unwrap();
}

fn write_workbook(path: &PathBuf) {
    let mut wb = Workbook::new();

    let notes = wb.add_worksheet();
    notes.set_name("Notes").unwrap();
    notes.write_string(0, 0, "Uploaded by the registrar").unwrap();

    let students = wb.add_worksheet();
    students.set_name("Students").unwrap();
    write_students(students);

    wb.save(path).unwrap();
}

fn job() -> ImportJob {
    ImportJob::new(ImportKind::Student, TENANT)
}

#[tokio::test]
async fn excel_named_sheet_with_number_and_date_cells() {
    let path = tmp_file("students");
    write_workbook(&path);
    let doc = Document::from_path(&path).unwrap();
    assert_eq!(doc.format, DocumentFormat::Excel);

    let store = store_with_classes(TENANT, &["Grade 5"]);
    let config = ImportConfig {
        sheet: SheetSelection::Named("Students".to_string()),
        ..ImportConfig::default()
    };
    let outcome = Importer::new(store.clone())
        .with_config(config)
        .run(&job(), &doc)
        .await
        .unwrap();

    assert_eq!((outcome.total, outcome.success, outcome.errors), (2, 1, 1));
    assert_eq!(
        outcome.error_details,
        vec!["Row 2: RollNumber '4.5' is not a valid integer"]
    );
    assert_eq!(outcome.data[0]["rollNumber"], json!(3));

    let stored = &store.entities(EntityKind::Student)[0];
    match &stored.entity {
        Entity::Student(s) => {
            assert_eq!(s.roll_number, 3);
            assert_eq!(
                s.date_of_birth.map(|d| d.to_string()),
                Some("2014-06-23".to_string())
            );
        }
        other => panic!("unexpected entity {other:?}"),
    }

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn excel_first_sheet_without_data_rows_is_empty() {
    let path = tmp_file("notes");
    write_workbook(&path);
    let doc = Document::from_path(&path).unwrap();

    let store = store_with_classes(TENANT, &["Grade 5"]);
    let err = Importer::new(store).run(&job(), &doc).await.unwrap_err();

    // The "Notes" sheet has a single header cell and no data rows.
    assert!(matches!(err, roster_import::ImportError::EmptyDocument));
    let _ = std::fs::remove_file(&path);
}
