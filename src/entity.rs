//! Persisted entity model and natural keys.
//!
//! The pipeline never talks about tables; it hands [`Entity`] values to the
//! [`crate::store::Store`] port and looks them up by [`NaturalKey`]. Every natural key is scoped by
//! tenant at the port boundary, so the key itself only carries the kind and the normalized value.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{EntityId, TenantId};

/// Which natural key a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyKind {
    StudentId,
    StudentEmail,
    ParentEmail,
    ClassName,
    EmployeeId,
    TeacherEmail,
    SubjectName,
    HostelName,
    AllocationStudent,
    StudentParentLink,
    TeacherSubjectLink,
    HostelMembershipLink,
}

impl KeyKind {
    /// Column-style label used in user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            KeyKind::StudentId => "StudentId",
            KeyKind::StudentEmail | KeyKind::TeacherEmail => "Email",
            KeyKind::ParentEmail => "ParentEmail",
            KeyKind::ClassName => "Class",
            KeyKind::EmployeeId => "EmployeeId",
            KeyKind::SubjectName => "Subject",
            KeyKind::HostelName => "HostelName",
            KeyKind::AllocationStudent => "Hostel allocation for StudentId",
            KeyKind::StudentParentLink => "Student-parent link",
            KeyKind::TeacherSubjectLink => "Teacher-subject link",
            KeyKind::HostelMembershipLink => "Hostel membership",
        }
    }

    fn case_insensitive(self) -> bool {
        matches!(
            self,
            KeyKind::StudentEmail
                | KeyKind::ParentEmail
                | KeyKind::TeacherEmail
                | KeyKind::ClassName
                | KeyKind::SubjectName
                | KeyKind::HostelName
        )
    }
}

/// A natural key: kind plus normalized value.
///
/// Emails and names compare case-insensitively; identifiers compare exactly after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NaturalKey {
    pub kind: KeyKind,
    pub value: String,
}

impl NaturalKey {
    /// Build a key, normalizing `value` for its kind.
    pub fn new(kind: KeyKind, value: &str) -> Self {
        let trimmed = value.trim();
        let value = if kind.case_insensitive() {
            trimmed.to_lowercase()
        } else {
            trimmed.to_string()
        };
        Self { kind, value }
    }

    /// Key of a link entity joining two persisted identities.
    pub fn link(kind: KeyKind, left: EntityId, right: EntityId) -> Self {
        Self {
            kind,
            value: format!("{}:{}", left.0, right.0),
        }
    }

    /// Key of a link entity of which `owner` may hold only one.
    pub fn owned_by(kind: KeyKind, owner: EntityId) -> Self {
        Self {
            kind,
            value: owner.0.to_string(),
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind.label(), self.value)
    }
}

/// Discriminant of [`Entity`], handy for counting and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Student,
    Parent,
    StudentParent,
    SchoolClass,
    Teacher,
    Subject,
    TeacherSubject,
    Hostel,
    HostelAllocation,
    HostelMembership,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub tenant_id: TenantId,
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub class_id: EntityId,
    pub section: Option<String>,
    pub roll_number: i64,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub admission_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parent {
    pub tenant_id: TenantId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub occupation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentParent {
    pub tenant_id: TenantId,
    pub student_id: EntityId,
    pub parent_id: EntityId,
    pub relationship: Option<String>,
}

/// Classes are owned by the surrounding application; imports only look them up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolClass {
    pub tenant_id: TenantId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub tenant_id: TenantId,
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub joining_date: Option<NaiveDate>,
    pub qualification: Option<String>,
    pub salary: Option<f64>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub tenant_id: TenantId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSubject {
    pub tenant_id: TenantId,
    pub teacher_id: EntityId,
    pub subject_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hostel {
    pub tenant_id: TenantId,
    pub name: String,
    pub hostel_type: Option<String>,
    pub capacity: Option<i64>,
}

/// A student's room allocation. Keyed by the student's external id: one allocation per student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostelAllocation {
    pub tenant_id: TenantId,
    pub student_id: EntityId,
    pub student_ref: String,
    pub room_number: String,
    pub bed_number: Option<i64>,
    pub room_type: Option<String>,
    pub allocated_on: Option<NaiveDate>,
    pub monthly_fee: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostelMembership {
    pub tenant_id: TenantId,
    pub allocation_id: EntityId,
    pub hostel_id: EntityId,
}

/// Any entity the pipeline reads or writes through the store port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Entity {
    Student(Student),
    Parent(Parent),
    StudentParent(StudentParent),
    SchoolClass(SchoolClass),
    Teacher(Teacher),
    Subject(Subject),
    TeacherSubject(TeacherSubject),
    Hostel(Hostel),
    HostelAllocation(HostelAllocation),
    HostelMembership(HostelMembership),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Student(_) => EntityKind::Student,
            Entity::Parent(_) => EntityKind::Parent,
            Entity::StudentParent(_) => EntityKind::StudentParent,
            Entity::SchoolClass(_) => EntityKind::SchoolClass,
            Entity::Teacher(_) => EntityKind::Teacher,
            Entity::Subject(_) => EntityKind::Subject,
            Entity::TeacherSubject(_) => EntityKind::TeacherSubject,
            Entity::Hostel(_) => EntityKind::Hostel,
            Entity::HostelAllocation(_) => EntityKind::HostelAllocation,
            Entity::HostelMembership(_) => EntityKind::HostelMembership,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        match self {
            Entity::Student(e) => e.tenant_id,
            Entity::Parent(e) => e.tenant_id,
            Entity::StudentParent(e) => e.tenant_id,
            Entity::SchoolClass(e) => e.tenant_id,
            Entity::Teacher(e) => e.tenant_id,
            Entity::Subject(e) => e.tenant_id,
            Entity::TeacherSubject(e) => e.tenant_id,
            Entity::Hostel(e) => e.tenant_id,
            Entity::HostelAllocation(e) => e.tenant_id,
            Entity::HostelMembership(e) => e.tenant_id,
        }
    }

    /// All natural keys that must be unique within the entity's tenant.
    pub fn natural_keys(&self) -> Vec<NaturalKey> {
        match self {
            Entity::Student(e) => vec![
                NaturalKey::new(KeyKind::StudentId, &e.student_id),
                NaturalKey::new(KeyKind::StudentEmail, &e.email),
            ],
            Entity::Parent(e) => vec![NaturalKey::new(KeyKind::ParentEmail, &e.email)],
            Entity::StudentParent(e) => vec![NaturalKey::link(
                KeyKind::StudentParentLink,
                e.student_id,
                e.parent_id,
            )],
            Entity::SchoolClass(e) => vec![NaturalKey::new(KeyKind::ClassName, &e.name)],
            Entity::Teacher(e) => vec![
                NaturalKey::new(KeyKind::EmployeeId, &e.employee_id),
                NaturalKey::new(KeyKind::TeacherEmail, &e.email),
            ],
            Entity::Subject(e) => vec![NaturalKey::new(KeyKind::SubjectName, &e.name)],
            Entity::TeacherSubject(e) => vec![NaturalKey::link(
                KeyKind::TeacherSubjectLink,
                e.teacher_id,
                e.subject_id,
            )],
            Entity::Hostel(e) => vec![NaturalKey::new(KeyKind::HostelName, &e.name)],
            Entity::HostelAllocation(e) => {
                vec![NaturalKey::new(KeyKind::AllocationStudent, &e.student_ref)]
            }
            Entity::HostelMembership(e) => vec![NaturalKey::owned_by(
                KeyKind::HostelMembershipLink,
                e.allocation_id,
            )],
        }
    }

    /// Primary and side identities of a link entity.
    pub fn link_ends(&self) -> Option<(EntityId, EntityId)> {
        match self {
            Entity::StudentParent(e) => Some((e.student_id, e.parent_id)),
            Entity::TeacherSubject(e) => Some((e.teacher_id, e.subject_id)),
            Entity::HostelMembership(e) => Some((e.allocation_id, e.hostel_id)),
            _ => None,
        }
    }
}

/// An entity together with its store identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntity {
    pub id: EntityId,
    pub entity: Entity,
}
