//! Student rows: one `Student`, optionally a `Parent` found or created by email, and the
//! student-parent link carrying the relationship.

use chrono::NaiveDate;
use serde_json::json;

use crate::entity::{Entity, KeyKind, Parent, Student};
use crate::pipeline::parse::{Coerced, MalformedRow, RowCells};
use crate::pipeline::validate::Violations;
use crate::types::{EntityId, TenantId};

use super::{ImportKind, KeyRef, LinkDraft, RecordKind, SideDraft};

/// Marker type selecting student behavior in the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct StudentImport;

#[derive(Debug, Clone, PartialEq)]
pub struct StudentCandidate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub student_id: Option<String>,
    pub email: Option<String>,
    pub class: Option<String>,
    pub roll_number: Coerced<i64>,
    pub section: Option<String>,
    pub date_of_birth: Coerced<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub admission_date: Coerced<NaiveDate>,
    pub parent_first_name: Option<String>,
    pub parent_last_name: Option<String>,
    pub parent_email: Option<String>,
    pub parent_phone: Option<String>,
    pub parent_relation: Option<String>,
    pub parent_occupation: Option<String>,
}

impl StudentCandidate {
    fn has_parent_details(&self) -> bool {
        self.parent_first_name.is_some()
            || self.parent_last_name.is_some()
            || self.parent_phone.is_some()
            || self.parent_relation.is_some()
            || self.parent_occupation.is_some()
    }
}

/// Parent block of a validated student row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub occupation: Option<String>,
    pub relationship: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub first_name: String,
    pub last_name: String,
    pub student_id: String,
    pub email: String,
    pub class: String,
    pub roll_number: i64,
    pub section: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub admission_date: Option<NaiveDate>,
    pub parent: Option<ParentDetails>,
}

impl RecordKind for StudentImport {
    type Candidate = StudentCandidate;
    type Record = StudentRecord;

    const KIND: ImportKind = ImportKind::Student;
    const REQUIRED: &'static [&'static str] =
        &["FirstName", "LastName", "StudentId", "Email", "Class", "RollNumber"];
    const OPTIONAL: &'static [&'static str] = &[
        "Section",
        "DateOfBirth",
        "Gender",
        "Phone",
        "Address",
        "BloodGroup",
        "AdmissionDate",
        "ParentFirstName",
        "ParentLastName",
        "ParentEmail",
        "ParentPhone",
        "ParentRelation",
        "ParentOccupation",
    ];

    fn parse(cells: &RowCells<'_>) -> Result<StudentCandidate, MalformedRow> {
        Ok(StudentCandidate {
            first_name: cells.text("FirstName")?,
            last_name: cells.text("LastName")?,
            student_id: cells.text("StudentId")?,
            email: cells.text("Email")?,
            class: cells.text("Class")?,
            roll_number: cells.integer("RollNumber")?,
            section: cells.text("Section")?,
            date_of_birth: cells.date("DateOfBirth")?,
            gender: cells.text("Gender")?,
            phone: cells.text("Phone")?,
            address: cells.text("Address")?,
            blood_group: cells.text("BloodGroup")?,
            admission_date: cells.date("AdmissionDate")?,
            parent_first_name: cells.text("ParentFirstName")?,
            parent_last_name: cells.text("ParentLastName")?,
            parent_email: cells.text("ParentEmail")?,
            parent_phone: cells.text("ParentPhone")?,
            parent_relation: cells.text("ParentRelation")?,
            parent_occupation: cells.text("ParentOccupation")?,
        })
    }

    fn validate(c: StudentCandidate, strict: bool) -> Result<StudentRecord, Vec<String>> {
        let mut v = Violations::new();
        v.required("FirstName", c.first_name.as_deref());
        v.required("LastName", c.last_name.as_deref());
        v.required("StudentId", c.student_id.as_deref());
        v.required_email("Email", c.email.as_deref());
        v.required("Class", c.class.as_deref());
        v.required_coerced("RollNumber", &c.roll_number, "integer");
        v.positive("RollNumber", c.roll_number.copied());
        v.optional_coerced(strict, "DateOfBirth", &c.date_of_birth, "date");
        v.optional_coerced(strict, "AdmissionDate", &c.admission_date, "date");
        v.phone("Phone", c.phone.as_deref());

        match (&c.parent_email, &c.parent_first_name) {
            (None, _) if c.has_parent_details() => {
                v.push("ParentEmail is required when parent details are given")
            }
            (Some(_), None) => v.push("ParentFirstName is required when ParentEmail is given"),
            _ => {}
        }
        v.email("ParentEmail", c.parent_email.as_deref());
        v.phone("ParentPhone", c.parent_phone.as_deref());
        v.before(
            "DateOfBirth",
            c.date_of_birth.copied(),
            "AdmissionDate",
            c.admission_date.copied(),
        );

        if !v.is_empty() {
            return Err(v.into_messages());
        }

        let (
            Some(first_name),
            Some(last_name),
            Some(student_id),
            Some(email),
            Some(class),
            Coerced::Value(roll_number),
        ) = (
            c.first_name,
            c.last_name,
            c.student_id,
            c.email,
            c.class,
            c.roll_number,
        )
        else {
            return Err(vec!["row is missing required fields".to_string()]);
        };

        let parent = match (c.parent_email, c.parent_first_name) {
            (Some(parent_email), Some(parent_first_name)) => Some(ParentDetails {
                first_name: parent_first_name,
                last_name: c.parent_last_name.unwrap_or_else(|| last_name.clone()),
                email: parent_email,
                phone: c.parent_phone,
                occupation: c.parent_occupation,
                relationship: c.parent_relation,
            }),
            _ => None,
        };

        Ok(StudentRecord {
            first_name,
            last_name,
            student_id,
            email,
            class,
            roll_number,
            section: c.section,
            date_of_birth: c.date_of_birth.into_option(),
            gender: c.gender,
            phone: c.phone,
            address: c.address,
            blood_group: c.blood_group,
            admission_date: c.admission_date.into_option(),
            parent,
        })
    }

    fn identity_keys(record: &StudentRecord) -> Vec<KeyRef> {
        vec![
            KeyRef::new(KeyKind::StudentId, &record.student_id),
            KeyRef::new(KeyKind::StudentEmail, &record.email),
        ]
    }

    fn reference(record: &StudentRecord) -> Option<KeyRef> {
        Some(KeyRef::new(KeyKind::ClassName, &record.class))
    }

    fn side(record: &StudentRecord, tenant: TenantId) -> Option<SideDraft> {
        let parent = record.parent.as_ref()?;
        Some(SideDraft {
            key: KeyRef::new(KeyKind::ParentEmail, &parent.email),
            entity: Entity::Parent(Parent {
                tenant_id: tenant,
                first_name: parent.first_name.clone(),
                last_name: parent.last_name.clone(),
                email: parent.email.clone(),
                phone: parent.phone.clone(),
                occupation: parent.occupation.clone(),
            }),
        })
    }

    fn link(record: &StudentRecord) -> LinkDraft {
        LinkDraft::StudentParent {
            relationship: record.parent.as_ref().and_then(|p| p.relationship.clone()),
        }
    }

    fn primary(
        record: &StudentRecord,
        tenant: TenantId,
        reference: Option<EntityId>,
    ) -> Result<Entity, String> {
        let class_id = reference.ok_or_else(|| format!("Class '{}' not found", record.class))?;
        Ok(Entity::Student(Student {
            tenant_id: tenant,
            student_id: record.student_id.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: record.email.clone(),
            class_id,
            section: record.section.clone(),
            roll_number: record.roll_number,
            date_of_birth: record.date_of_birth,
            gender: record.gender.clone(),
            phone: record.phone.clone(),
            address: record.address.clone(),
            blood_group: record.blood_group.clone(),
            admission_date: record.admission_date,
        }))
    }

    fn summary(record: &StudentRecord) -> serde_json::Value {
        json!({
            "studentId": record.student_id,
            "name": format!("{} {}", record.first_name, record.last_name),
            "email": record.email,
            "class": record.class,
            "rollNumber": record.roll_number,
            "parentEmail": record.parent.as_ref().map(|p| p.email.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::StudentImport;
    use crate::entity::{Entity, KeyKind};
    use crate::records::{RecordKind, parse_row};
    use crate::types::{EntityId, TenantId};

    const BASE: &[(&str, &str)] = &[
        ("FirstName", "Ada"),
        ("LastName", "Lovelace"),
        ("StudentId", "S-001"),
        ("Email", "ada@example.org"),
        ("Class", "Grade 9"),
        ("RollNumber", "12"),
    ];

    fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        let mut pairs: Vec<(&str, &str)> = BASE
            .iter()
            .filter(|(k, _)| !extra.iter().any(|(e, _)| e == k))
            .copied()
            .collect();
        pairs.extend_from_slice(extra);
        pairs
    }

    #[test]
    fn valid_row_builds_student_and_parent() {
        let candidate = parse_row::<StudentImport>(&with(&[
            ("ParentFirstName", "Anne"),
            ("ParentEmail", "Anne@Example.org"),
            ("ParentRelation", "Mother"),
            ("DateOfBirth", "2010-03-04"),
        ]))
        .unwrap();
        let record = StudentImport::validate(candidate, false).unwrap();

        let parent = record.parent.as_ref().unwrap();
        assert_eq!(parent.last_name, "Lovelace");
        assert_eq!(parent.relationship.as_deref(), Some("Mother"));

        let side = StudentImport::side(&record, TenantId(1)).unwrap();
        assert_eq!(side.key.key.kind, KeyKind::ParentEmail);
        assert_eq!(side.key.key.value, "anne@example.org");

        match StudentImport::primary(&record, TenantId(1), Some(EntityId(40))).unwrap() {
            Entity::Student(s) => {
                assert_eq!(s.class_id, EntityId(40));
                assert_eq!(s.roll_number, 12);
                assert!(s.date_of_birth.is_some());
            }
            other => panic!("unexpected entity {other:?}"),
        }
    }

    #[test]
    fn every_violation_is_reported() {
        let candidate = parse_row::<StudentImport>(&with(&[
            ("FirstName", ""),
            ("Email", "not-an-email"),
            ("RollNumber", "twelve"),
            ("ParentPhone", "555-0100123"),
        ]))
        .unwrap();
        let errors = StudentImport::validate(candidate, false).unwrap_err();
        assert_eq!(
            errors,
            vec![
                "FirstName is required",
                "Email 'not-an-email' is not a valid email address",
                "RollNumber 'twelve' is not a valid integer",
                "ParentEmail is required when parent details are given",
            ]
        );
    }

    #[test]
    fn parent_email_needs_a_first_name() {
        let candidate =
            parse_row::<StudentImport>(&with(&[("ParentEmail", "mum@example.org")])).unwrap();
        let errors = StudentImport::validate(candidate, false).unwrap_err();
        assert_eq!(errors, vec!["ParentFirstName is required when ParentEmail is given"]);
    }

    #[test]
    fn malformed_optional_date_is_dropped_unless_strict() {
        let pairs = with(&[("DateOfBirth", "04/03/2010")]);

        let lenient = parse_row::<StudentImport>(&pairs).unwrap();
        let record = StudentImport::validate(lenient, false).unwrap();
        assert_eq!(record.date_of_birth, None);

        let strict = parse_row::<StudentImport>(&pairs).unwrap();
        let errors = StudentImport::validate(strict, true).unwrap_err();
        assert_eq!(errors, vec!["DateOfBirth '04/03/2010' is not a valid date"]);
    }

    #[test]
    fn admission_must_follow_birth() {
        let candidate = parse_row::<StudentImport>(&with(&[
            ("DateOfBirth", "2012-01-01"),
            ("AdmissionDate", "2011-09-01"),
        ]))
        .unwrap();
        let errors = StudentImport::validate(candidate, false).unwrap_err();
        assert_eq!(
            errors,
            vec!["DateOfBirth (2012-01-01) must be before AdmissionDate (2011-09-01)"]
        );
    }

    #[test]
    fn roll_number_must_be_positive() {
        let candidate = parse_row::<StudentImport>(&with(&[("RollNumber", "0")])).unwrap();
        let errors = StudentImport::validate(candidate, false).unwrap_err();
        assert_eq!(errors, vec!["RollNumber must be a positive number"]);
    }

    #[test]
    fn unresolved_class_is_a_row_error() {
        let candidate = parse_row::<StudentImport>(BASE).unwrap();
        let record = StudentImport::validate(candidate, false).unwrap();
        let err = StudentImport::primary(&record, TenantId(1), None).unwrap_err();
        assert_eq!(err, "Class 'Grade 9' not found");
    }
}
