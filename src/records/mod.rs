//! Import kinds and their typed records.
//!
//! Each kind implements [`RecordKind`]: which columns it needs, how a raw row becomes a
//! candidate, which rules turn a candidate into a validated record, and which entities a record
//! produces (primary, optional side entity, link between them).
//!
//! | kind    | primary            | side (find-or-create) | link               | reference |
//! |---------|--------------------|-----------------------|--------------------|-----------|
//! | student | `Student`          | `Parent` by email     | `StudentParent`    | class     |
//! | teacher | `Teacher`          | `Subject` by name     | `TeacherSubject`   | -         |
//! | hostel  | `HostelAllocation` | `Hostel` by name      | `HostelMembership` | student   |

pub mod hostel;
pub mod student;
pub mod teacher;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::{
    Entity, HostelMembership, KeyKind, NaturalKey, StudentParent, TeacherSubject,
};
use crate::pipeline::parse::{MalformedRow, RowCells};
use crate::types::{EntityId, TenantId};

pub use hostel::{HostelCandidate, HostelImport, HostelRecord};
pub use student::{ParentDetails, StudentCandidate, StudentImport, StudentRecord};
pub use teacher::{TeacherCandidate, TeacherImport, TeacherRecord};

/// What a document contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Student,
    Teacher,
    Hostel,
}

impl ImportKind {
    /// Columns that must be present in the header.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            ImportKind::Student => StudentImport::REQUIRED,
            ImportKind::Teacher => TeacherImport::REQUIRED,
            ImportKind::Hostel => HostelImport::REQUIRED,
        }
    }

    /// Columns that are recognized when present.
    pub fn optional_columns(self) -> &'static [&'static str] {
        match self {
            ImportKind::Student => StudentImport::OPTIONAL,
            ImportKind::Teacher => TeacherImport::OPTIONAL,
            ImportKind::Hostel => HostelImport::OPTIONAL,
        }
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportKind::Student => "student",
            ImportKind::Teacher => "teacher",
            ImportKind::Hostel => "hostel",
        };
        f.write_str(s)
    }
}

impl FromStr for ImportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" | "students" => Ok(ImportKind::Student),
            "teacher" | "teachers" => Ok(ImportKind::Teacher),
            "hostel" | "hostels" => Ok(ImportKind::Hostel),
            other => Err(format!("unknown import kind '{other}'")),
        }
    }
}

/// A natural key plus the text the user wrote, for messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRef {
    pub key: NaturalKey,
    pub display: String,
}

impl KeyRef {
    pub fn new(kind: KeyKind, value: &str) -> Self {
        Self {
            key: NaturalKey::new(kind, value),
            display: value.trim().to_string(),
        }
    }
}

impl fmt::Display for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.key.kind.label(), self.display)
    }
}

/// A side entity implied by a row, keyed for find-or-create.
#[derive(Debug, Clone, PartialEq)]
pub struct SideDraft {
    pub key: KeyRef,
    pub entity: Entity,
}

/// A link entity waiting for the identities of both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDraft {
    StudentParent { relationship: Option<String> },
    TeacherSubject,
    HostelMembership,
}

impl LinkDraft {
    pub fn key(&self, primary: EntityId, side: EntityId) -> NaturalKey {
        if let Some(key) = self.owner_key(primary) {
            return key;
        }
        let kind = match self {
            LinkDraft::StudentParent { .. } => KeyKind::StudentParentLink,
            LinkDraft::TeacherSubject => KeyKind::TeacherSubjectLink,
            LinkDraft::HostelMembership => KeyKind::HostelMembershipLink,
        };
        NaturalKey::link(kind, primary, side)
    }

    /// Key shared by every link of this kind for `primary`, when a primary holds at most one.
    ///
    /// A row naming another side for such a primary re-points the stored link instead of
    /// adding a second one.
    pub fn owner_key(&self, primary: EntityId) -> Option<NaturalKey> {
        match self {
            LinkDraft::HostelMembership => {
                Some(NaturalKey::owned_by(KeyKind::HostelMembershipLink, primary))
            }
            LinkDraft::StudentParent { .. } | LinkDraft::TeacherSubject => None,
        }
    }

    pub fn build(&self, tenant_id: TenantId, primary: EntityId, side: EntityId) -> Entity {
        match self {
            LinkDraft::StudentParent { relationship } => Entity::StudentParent(StudentParent {
                tenant_id,
                student_id: primary,
                parent_id: side,
                relationship: relationship.clone(),
            }),
            LinkDraft::TeacherSubject => Entity::TeacherSubject(TeacherSubject {
                tenant_id,
                teacher_id: primary,
                subject_id: side,
            }),
            LinkDraft::HostelMembership => Entity::HostelMembership(HostelMembership {
                tenant_id,
                allocation_id: primary,
                hostel_id: side,
            }),
        }
    }
}

/// Per-kind behavior of the import pipeline.
pub trait RecordKind: Send + Sync + 'static {
    /// Parsed row; typed fields may be empty or invalid.
    type Candidate: fmt::Debug + Send + Sync;
    /// Candidate that passed every validation rule.
    type Record: fmt::Debug + Send + Sync;

    const KIND: ImportKind;
    const REQUIRED: &'static [&'static str];
    const OPTIONAL: &'static [&'static str];

    /// Extract and coerce every field of one row.
    fn parse(cells: &RowCells<'_>) -> Result<Self::Candidate, MalformedRow>;

    /// Run every rule; `Err` carries all violation messages in rule order.
    fn validate(candidate: Self::Candidate, strict: bool) -> Result<Self::Record, Vec<String>>;

    /// Natural keys identifying the primary record, most specific first.
    fn identity_keys(record: &Self::Record) -> Vec<KeyRef>;

    /// Existing entity the record must point at, if any.
    fn reference(record: &Self::Record) -> Option<KeyRef>;

    /// Side entity the record implies, if any.
    fn side(record: &Self::Record, tenant: TenantId) -> Option<SideDraft>;

    /// Link created between primary and side.
    fn link(record: &Self::Record) -> LinkDraft;

    /// Primary entity; `reference` is the resolved identity of [`Self::reference`].
    fn primary(
        record: &Self::Record,
        tenant: TenantId,
        reference: Option<EntityId>,
    ) -> Result<Entity, String>;

    /// Short JSON summary echoed back in the outcome sample.
    fn summary(record: &Self::Record) -> serde_json::Value;
}

/// Parse one row given as `(column, value)` pairs through the kind's header.
#[cfg(test)]
pub(crate) fn parse_row<K: RecordKind>(
    pairs: &[(&str, &str)],
) -> Result<K::Candidate, MalformedRow> {
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::pipeline::header::resolve_header;
    use crate::types::RawRow;

    let columns: Vec<String> = pairs.iter().map(|(c, _)| c.to_string()).collect();
    let columns: Arc<[String]> = Arc::from(columns);
    let header = resolve_header(
        &RawRow::header(Arc::clone(&columns)),
        K::REQUIRED,
        K::OPTIONAL,
        &HashMap::new(),
    )
    .expect("test rows carry every required column");
    let row = RawRow::new(1, columns, pairs.iter().map(|(_, v)| v.to_string()).collect());
    K::parse(&RowCells::new(&row, &header))
}

#[cfg(test)]
mod tests {
    use super::{ImportKind, KeyRef, LinkDraft};
    use crate::entity::{Entity, KeyKind};
    use crate::types::{EntityId, TenantId};

    #[test]
    fn kind_columns_match_the_documented_sets() {
        assert_eq!(
            ImportKind::Student.required_columns(),
            &["FirstName", "LastName", "StudentId", "Email", "Class", "RollNumber"]
        );
        assert_eq!(
            ImportKind::Teacher.required_columns(),
            &["FirstName", "LastName", "Email", "EmployeeId", "Subject"]
        );
        assert_eq!(
            ImportKind::Hostel.required_columns(),
            &["HostelName", "RoomNumber", "StudentId"]
        );
    }

    #[test]
    fn kind_parses_from_text() {
        assert_eq!("Students".parse::<ImportKind>(), Ok(ImportKind::Student));
        assert_eq!("hostel".parse::<ImportKind>(), Ok(ImportKind::Hostel));
        assert!("fees".parse::<ImportKind>().is_err());
        assert_eq!(ImportKind::Teacher.to_string(), "teacher");
    }

    #[test]
    fn key_ref_keeps_user_spelling_for_messages() {
        let k = KeyRef::new(KeyKind::ClassName, " Grade 9 ");
        assert_eq!(k.key.value, "grade 9");
        assert_eq!(k.to_string(), "Class 'Grade 9'");
    }

    #[test]
    fn link_draft_builds_entity_with_both_ends() {
        let draft = LinkDraft::StudentParent {
            relationship: Some("Mother".to_string()),
        };
        match draft.build(TenantId(1), EntityId(5), EntityId(8)) {
            Entity::StudentParent(link) => {
                assert_eq!(link.student_id, EntityId(5));
                assert_eq!(link.parent_id, EntityId(8));
            }
            other => panic!("unexpected entity {other:?}"),
        }
        assert_eq!(draft.key(EntityId(5), EntityId(8)).value, "5:8");
        assert_eq!(draft.owner_key(EntityId(5)), None);
    }

    #[test]
    fn hostel_membership_key_ignores_the_hostel() {
        let draft = LinkDraft::HostelMembership;
        assert_eq!(draft.key(EntityId(5), EntityId(8)), draft.key(EntityId(5), EntityId(9)));
        assert_eq!(draft.owner_key(EntityId(5)), Some(draft.key(EntityId(5), EntityId(8))));
    }
}
