#![allow(dead_code)]

use std::sync::Arc;

use roster_import::entity::{Entity, SchoolClass, Student};
use roster_import::store::MemoryStore;
use roster_import::tabular::{Document, DocumentFormat};
use roster_import::types::{EntityId, TenantId};

pub const TENANT: TenantId = TenantId(1);

pub const STUDENT_HEADER: &str = "FirstName,LastName,StudentId,Email,Class,RollNumber";

pub fn store_with_classes(tenant: TenantId, classes: &[&str]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for name in classes {
        store
            .seed(Entity::SchoolClass(SchoolClass {
                tenant_id: tenant,
                name: name.to_string(),
            }))
            .unwrap();
    }
    store
}

pub fn seed_student(
    store: &MemoryStore,
    tenant: TenantId,
    student_id: &str,
    class_id: EntityId,
) -> EntityId {
    store
        .seed(Entity::Student(Student {
            tenant_id: tenant,
            student_id: student_id.to_string(),
            first_name: "Seeded".to_string(),
            last_name: student_id.to_string(),
            email: format!("{}@seed.org", student_id.to_lowercase()),
            class_id,
            section: None,
            roll_number: 1,
            date_of_birth: None,
            gender: None,
            phone: None,
            address: None,
            blood_group: None,
            admission_date: None,
        }))
        .unwrap()
}

/// `FirstName,LastName,StudentId,Email,Class,RollNumber` for student `n` in "Grade 5".
pub fn student_row(n: usize) -> String {
    format!("First{n},Last{n},S-{n:03},student{n}@school.org,Grade 5,{n}")
}

pub fn csv(header: &str, rows: &[String]) -> Document {
    let mut text = String::from(header);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    Document::new(DocumentFormat::Csv, text)
}

pub fn student_csv(count: usize) -> Document {
    let rows: Vec<String> = (1..=count).map(student_row).collect();
    csv(STUDENT_HEADER, &rows)
}
