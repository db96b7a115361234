//! Core value types shared by the reader, the pipeline and the store.
//!
//! Tabular input is read into a [`Sheet`]: one header [`RawRow`] plus data rows whose cells are
//! kept as raw text. Typing happens later, per import kind, in [`crate::records`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identifier of the tenant (school) an import runs for.
///
/// Every pipeline call takes it explicitly; nothing reads an ambient "current tenant".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub i64);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-generated identity of a persisted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One row of a tabular document: ordered column-name → raw text.
///
/// `index` is 1-based relative to the data rows (the header row is not counted) and is the
/// number used in every error message for this row. The header row itself has index `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based data row index (0 for the header).
    pub index: usize,
    columns: Arc<[String]>,
    cells: Vec<String>,
    defect: Option<String>,
}

impl RawRow {
    /// Create a row sharing the document's column names.
    pub fn new(index: usize, columns: Arc<[String]>, cells: Vec<String>) -> Self {
        Self {
            index,
            columns,
            cells,
            defect: None,
        }
    }

    /// Mark the row as unreadable; the pipeline rejects it with `message` before parsing.
    pub fn with_defect(mut self, message: impl Into<String>) -> Self {
        self.defect = Some(message.into());
        self
    }

    /// Why the reader could not take this row as-is, if it could not.
    pub fn defect(&self) -> Option<&str> {
        self.defect.as_deref()
    }

    /// Create a header row; its cells are the column names.
    pub fn header(columns: Arc<[String]>) -> Self {
        let cells = columns.to_vec();
        Self::new(0, columns, cells)
    }

    /// Raw cell text at `position`, if the row is that wide.
    pub fn get(&self, position: usize) -> Option<&str> {
        self.cells.get(position).map(String::as_str)
    }

    /// Raw cell text under the column named exactly `column`.
    pub fn get_by_name(&self, column: &str) -> Option<&str> {
        let position = self.columns.iter().position(|c| c == column)?;
        self.get(position)
    }

    /// Number of cells present in this row.
    pub fn width(&self) -> usize {
        self.cells.len()
    }

    /// `true` when every cell is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }

    /// Iterate `(column, cell)` pairs in column order.
    ///
    /// Cells beyond the header width are skipped; missing trailing cells are not yielded.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .zip(self.cells.iter())
            .map(|(c, v)| (c.as_str(), v.as_str()))
    }
}

/// A single sheet of a tabular document: a header row plus data rows.
///
/// Blank data rows are dropped while reading, but the indexes of the rows that follow still
/// count them, so `Row N` in a report matches the user's view of the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    /// Sheet name, when the format has named sheets.
    pub name: Option<String>,
    header: RawRow,
    rows: Vec<RawRow>,
}

impl Sheet {
    /// Build a sheet from column names and raw data rows (in document order).
    pub fn from_cells(name: Option<String>, columns: Vec<String>, data: Vec<Vec<String>>) -> Self {
        let records = data.into_iter().map(|cells| (cells, None)).collect();
        Self::from_records(name, columns, records)
    }

    /// Like [`Sheet::from_cells`], with an optional defect per data row.
    ///
    /// A row with a defect is kept even when its cells are blank.
    pub fn from_records(
        name: Option<String>,
        columns: Vec<String>,
        data: Vec<(Vec<String>, Option<String>)>,
    ) -> Self {
        let columns: Arc<[String]> = columns.into();
        let rows = data
            .into_iter()
            .enumerate()
            .map(|(idx0, (cells, defect))| {
                let row = RawRow::new(idx0 + 1, Arc::clone(&columns), cells);
                match defect {
                    Some(message) => row.with_defect(message),
                    None => row,
                }
            })
            .filter(|row| row.defect.is_some() || !row.is_blank())
            .collect();
        Self {
            name,
            header: RawRow::header(columns),
            rows,
        }
    }

    /// The header row.
    pub fn header(&self) -> &RawRow {
        &self.header
    }

    /// Column names in document order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.header.iter().map(|(c, _)| c)
    }

    /// Number of non-blank data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Data row by position (0-based over non-blank rows).
    pub fn row(&self, position: usize) -> Option<&RawRow> {
        self.rows.get(position)
    }

    /// Iterate data rows in document order. Can be called any number of times.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &RawRow> {
        self.rows.iter()
    }
}
