//! Hostel rows allocate an existing student to a room. The hostel itself is found or created by
//! name and joined to the allocation through a membership link.

use chrono::NaiveDate;
use serde_json::json;

use crate::entity::{Entity, Hostel, HostelAllocation, KeyKind};
use crate::pipeline::parse::{Coerced, MalformedRow, RowCells};
use crate::pipeline::validate::Violations;
use crate::types::{EntityId, TenantId};

use super::{ImportKind, KeyRef, LinkDraft, RecordKind, SideDraft};

#[derive(Debug, Clone, Copy, Default)]
pub struct HostelImport;

#[derive(Debug, Clone, PartialEq)]
pub struct HostelCandidate {
    pub hostel_name: Option<String>,
    pub room_number: Option<String>,
    pub student_id: Option<String>,
    pub bed_number: Coerced<i64>,
    pub room_type: Option<String>,
    pub allocation_date: Coerced<NaiveDate>,
    pub monthly_fee: Coerced<f64>,
    pub hostel_type: Option<String>,
    pub capacity: Coerced<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostelRecord {
    pub hostel_name: String,
    pub room_number: String,
    pub student_id: String,
    pub bed_number: Option<i64>,
    pub room_type: Option<String>,
    pub allocation_date: Option<NaiveDate>,
    pub monthly_fee: Option<f64>,
    pub hostel_type: Option<String>,
    pub capacity: Option<i64>,
}

impl RecordKind for HostelImport {
    type Candidate = HostelCandidate;
    type Record = HostelRecord;

    const KIND: ImportKind = ImportKind::Hostel;
    const REQUIRED: &'static [&'static str] = &["HostelName", "RoomNumber", "StudentId"];
    const OPTIONAL: &'static [&'static str] = &[
        "BedNumber",
        "RoomType",
        "AllocationDate",
        "MonthlyFee",
        "HostelType",
        "Capacity",
    ];

    fn parse(cells: &RowCells<'_>) -> Result<HostelCandidate, MalformedRow> {
        Ok(HostelCandidate {
            hostel_name: cells.text("HostelName")?,
            room_number: cells.text("RoomNumber")?,
            student_id: cells.text("StudentId")?,
            bed_number: cells.integer("BedNumber")?,
            room_type: cells.text("RoomType")?,
            allocation_date: cells.date("AllocationDate")?,
            monthly_fee: cells.decimal("MonthlyFee")?,
            hostel_type: cells.text("HostelType")?,
            capacity: cells.integer("Capacity")?,
        })
    }

    fn validate(c: HostelCandidate, strict: bool) -> Result<HostelRecord, Vec<String>> {
        let mut v = Violations::new();
        v.required("HostelName", c.hostel_name.as_deref());
        v.required("RoomNumber", c.room_number.as_deref());
        v.required("StudentId", c.student_id.as_deref());
        v.optional_coerced(strict, "BedNumber", &c.bed_number, "integer");
        v.positive("BedNumber", c.bed_number.copied());
        v.optional_coerced(strict, "AllocationDate", &c.allocation_date, "date");
        v.optional_coerced(strict, "MonthlyFee", &c.monthly_fee, "decimal");
        v.non_negative("MonthlyFee", c.monthly_fee.copied());
        v.optional_coerced(strict, "Capacity", &c.capacity, "integer");
        v.positive("Capacity", c.capacity.copied());

        if !v.is_empty() {
            return Err(v.into_messages());
        }

        let (Some(hostel_name), Some(room_number), Some(student_id)) =
            (c.hostel_name, c.room_number, c.student_id)
        else {
            return Err(vec!["row is missing required fields".to_string()]);
        };

        Ok(HostelRecord {
            hostel_name,
            room_number,
            student_id,
            bed_number: c.bed_number.into_option(),
            room_type: c.room_type,
            allocation_date: c.allocation_date.into_option(),
            monthly_fee: c.monthly_fee.into_option(),
            hostel_type: c.hostel_type,
            capacity: c.capacity.into_option(),
        })
    }

    fn identity_keys(record: &HostelRecord) -> Vec<KeyRef> {
        vec![KeyRef::new(KeyKind::AllocationStudent, &record.student_id)]
    }

    fn reference(record: &HostelRecord) -> Option<KeyRef> {
        Some(KeyRef::new(KeyKind::StudentId, &record.student_id))
    }

    fn side(record: &HostelRecord, tenant: TenantId) -> Option<SideDraft> {
        Some(SideDraft {
            key: KeyRef::new(KeyKind::HostelName, &record.hostel_name),
            entity: Entity::Hostel(Hostel {
                tenant_id: tenant,
                name: record.hostel_name.clone(),
                hostel_type: record.hostel_type.clone(),
                capacity: record.capacity,
            }),
        })
    }

    fn link(_record: &HostelRecord) -> LinkDraft {
        LinkDraft::HostelMembership
    }

    fn primary(
        record: &HostelRecord,
        tenant: TenantId,
        reference: Option<EntityId>,
    ) -> Result<Entity, String> {
        let student_id =
            reference.ok_or_else(|| format!("StudentId '{}' not found", record.student_id))?;
        Ok(Entity::HostelAllocation(HostelAllocation {
            tenant_id: tenant,
            student_id,
            student_ref: record.student_id.clone(),
            room_number: record.room_number.clone(),
            bed_number: record.bed_number,
            room_type: record.room_type.clone(),
            allocated_on: record.allocation_date,
            monthly_fee: record.monthly_fee,
        }))
    }

    fn summary(record: &HostelRecord) -> serde_json::Value {
        json!({
            "studentId": record.student_id,
            "hostelName": record.hostel_name,
            "roomNumber": record.room_number,
            "bedNumber": record.bed_number,
        })
    }
}
