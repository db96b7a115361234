//! Per-row error records and the job outcome returned to callers.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::types::EntityId;

/// Why a row was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectReason {
    /// Row too narrow for the resolved header.
    Malformed,
    /// One or more validation rules failed.
    Invalid,
    /// Natural key already taken (in the store or earlier in the file).
    Duplicate,
    /// Secondary key belongs to a different record.
    Conflict,
    /// A referenced record (class, student) does not exist.
    MissingReference,
}

/// The single error entry of a rejected row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based data row index.
    pub row: usize,
    pub reason: RejectReason,
    pub messages: Vec<String>,
}

impl RowError {
    pub fn new(row: usize, reason: RejectReason, messages: Vec<String>) -> Self {
        Self {
            row,
            reason,
            messages,
        }
    }

    pub fn single(row: usize, reason: RejectReason, message: impl Into<String>) -> Self {
        Self::new(row, reason, vec![message.into()])
    }

    /// `Row N: m1, m2`
    pub fn detail(&self) -> String {
        format!("Row {}: {}", self.row, self.messages.join(", "))
    }
}

/// What happened to an accepted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowAction {
    Created,
    Updated,
}

/// Terminal result of one import job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    /// Data rows read (blank rows excluded).
    pub total: usize,
    pub success: usize,
    pub errors: usize,
    /// One `Row N: ...` line per rejected row, in row order.
    pub error_details: Vec<String>,
    /// Sample of accepted records.
    pub data: Vec<Value>,
}

/// Aggregates row results into an [`ImportOutcome`].
#[derive(Debug)]
pub(crate) struct Reporter {
    sample_size: usize,
    total: usize,
    success: usize,
    rejected: Vec<RowError>,
    data: Vec<Value>,
}

impl Reporter {
    pub(crate) fn new(sample_size: usize) -> Self {
        Self {
            sample_size,
            total: 0,
            success: 0,
            rejected: Vec::new(),
            data: Vec::new(),
        }
    }

    pub(crate) fn row_read(&mut self) {
        self.total += 1;
    }

    pub(crate) fn reject(&mut self, error: RowError) {
        self.rejected.push(error);
    }

    /// Record an accepted row; `id` is `None` when nothing was persisted.
    pub(crate) fn accept(&mut self, mut summary: Value, id: Option<EntityId>, action: RowAction) {
        self.success += 1;
        if self.data.len() >= self.sample_size {
            return;
        }
        if let Value::Object(map) = &mut summary {
            map.insert("id".to_string(), json!(id.map(|id| id.0)));
            map.insert("action".to_string(), json!(action));
        }
        self.data.push(summary);
    }

    pub(crate) fn finish(mut self) -> ImportOutcome {
        self.rejected.sort_by_key(|e| e.row);
        ImportOutcome {
            total: self.total,
            success: self.success,
            errors: self.rejected.len(),
            error_details: self.rejected.iter().map(RowError::detail).collect(),
            data: self.data,
        }
    }
}
