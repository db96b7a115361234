//! Teacher rows: one `Teacher`, the `Subject` named in the row (found or created), and the
//! teacher-subject link.

use chrono::NaiveDate;
use serde_json::json;

use crate::entity::{Entity, KeyKind, Subject, Teacher};
use crate::pipeline::parse::{Coerced, MalformedRow, RowCells};
use crate::pipeline::validate::Violations;
use crate::types::{EntityId, TenantId};

use super::{ImportKind, KeyRef, LinkDraft, RecordKind, SideDraft};

#[derive(Debug, Clone, Copy, Default)]
pub struct TeacherImport;

#[derive(Debug, Clone, PartialEq)]
pub struct TeacherCandidate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub employee_id: Option<String>,
    pub subject: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Coerced<NaiveDate>,
    pub joining_date: Coerced<NaiveDate>,
    pub qualification: Option<String>,
    pub salary: Coerced<f64>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeacherRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub employee_id: String,
    pub subject: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub joining_date: Option<NaiveDate>,
    pub qualification: Option<String>,
    pub salary: Option<f64>,
    pub address: Option<String>,
}

impl RecordKind for TeacherImport {
    type Candidate = TeacherCandidate;
    type Record = TeacherRecord;

    const KIND: ImportKind = ImportKind::Teacher;
    const REQUIRED: &'static [&'static str] =
        &["FirstName", "LastName", "Email", "EmployeeId", "Subject"];
    const OPTIONAL: &'static [&'static str] = &[
        "Phone",
        "Gender",
        "DateOfBirth",
        "JoiningDate",
        "Qualification",
        "Salary",
        "Address",
    ];

    fn parse(cells: &RowCells<'_>) -> Result<TeacherCandidate, MalformedRow> {
        Ok(TeacherCandidate {
            first_name: cells.text("FirstName")?,
            last_name: cells.text("LastName")?,
            email: cells.text("Email")?,
            employee_id: cells.text("EmployeeId")?,
            subject: cells.text("Subject")?,
            phone: cells.text("Phone")?,
            gender: cells.text("Gender")?,
            date_of_birth: cells.date("DateOfBirth")?,
            joining_date: cells.date("JoiningDate")?,
            qualification: cells.text("Qualification")?,
            salary: cells.decimal("Salary")?,
            address: cells.text("Address")?,
        })
    }

    fn validate(c: TeacherCandidate, strict: bool) -> Result<TeacherRecord, Vec<String>> {
        let mut v = Violations::new();
        v.required("FirstName", c.first_name.as_deref());
        v.required("LastName", c.last_name.as_deref());
        v.required_email("Email", c.email.as_deref());
        v.required("EmployeeId", c.employee_id.as_deref());
        v.required("Subject", c.subject.as_deref());
        v.phone("Phone", c.phone.as_deref());
        v.optional_coerced(strict, "DateOfBirth", &c.date_of_birth, "date");
        v.optional_coerced(strict, "JoiningDate", &c.joining_date, "date");
        v.optional_coerced(strict, "Salary", &c.salary, "decimal");
        v.non_negative("Salary", c.salary.copied());
        v.before(
            "DateOfBirth",
            c.date_of_birth.copied(),
            "JoiningDate",
            c.joining_date.copied(),
        );

        if !v.is_empty() {
            return Err(v.into_messages());
        }

        let (Some(first_name), Some(last_name), Some(email), Some(employee_id), Some(subject)) =
            (c.first_name, c.last_name, c.email, c.employee_id, c.subject)
        else {
            return Err(vec!["row is missing required fields".to_string()]);
        };

        Ok(TeacherRecord {
            first_name,
            last_name,
            email,
            employee_id,
            subject,
            phone: c.phone,
            gender: c.gender,
            date_of_birth: c.date_of_birth.into_option(),
            joining_date: c.joining_date.into_option(),
            qualification: c.qualification,
            salary: c.salary.into_option(),
            address: c.address,
        })
    }

    fn identity_keys(record: &TeacherRecord) -> Vec<KeyRef> {
        vec![
            KeyRef::new(KeyKind::EmployeeId, &record.employee_id),
            KeyRef::new(KeyKind::TeacherEmail, &record.email),
        ]
    }

    fn reference(_record: &TeacherRecord) -> Option<KeyRef> {
        None
    }

    fn side(record: &TeacherRecord, tenant: TenantId) -> Option<SideDraft> {
        Some(SideDraft {
            key: KeyRef::new(KeyKind::SubjectName, &record.subject),
            entity: Entity::Subject(Subject {
                tenant_id: tenant,
                name: record.subject.clone(),
            }),
        })
    }

    fn link(_record: &TeacherRecord) -> LinkDraft {
        LinkDraft::TeacherSubject
    }

    fn primary(
        record: &TeacherRecord,
        tenant: TenantId,
        _reference: Option<EntityId>,
    ) -> Result<Entity, String> {
        Ok(Entity::Teacher(Teacher {
            tenant_id: tenant,
            employee_id: record.employee_id.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            gender: record.gender.clone(),
            date_of_birth: record.date_of_birth,
            joining_date: record.joining_date,
            qualification: record.qualification.clone(),
            salary: record.salary,
            address: record.address.clone(),
        }))
    }

    fn summary(record: &TeacherRecord) -> serde_json::Value {
        json!({
            "employeeId": record.employee_id,
            "name": format!("{} {}", record.first_name, record.last_name),
            "email": record.email,
            "subject": record.subject,
        })
    }
}
