//! Tabular reader: turns an uploaded document into a [`crate::types::Sheet`] of raw text rows.
//!
//! Most callers should use [`read_document`], which:
//!
//! - dispatches on [`DocumentFormat`] (inferred from a file name, or forced)
//! - selects a sheet via [`SheetSelection`] (default: first sheet)
//! - fails with [`crate::ImportError::EmptyDocument`] when the sheet has a header but no data
//!   rows, and [`crate::ImportError::NoReadableSheet`] when the requested sheet does not exist
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - [`json`]
//! - `excel` (feature `excel`)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod json;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ImportError, ImportResult};
use crate::types::Sheet;

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Comma-separated values.
    Csv,
    /// JSON array-of-objects (or object of named arrays).
    Json,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
}

impl DocumentFormat {
    /// Parse a document format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Infer the format from an uploaded file name.
    pub fn from_file_name(name: &str) -> ImportResult<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ImportError::UnsupportedDocument {
                message: format!("cannot infer format: '{name}' has no extension"),
            })?;

        Self::from_extension(ext).ok_or_else(|| ImportError::UnsupportedDocument {
            message: format!("cannot infer format from extension '{ext}' of '{name}'"),
        })
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentFormat::Csv => "csv",
            DocumentFormat::Json => "json",
            DocumentFormat::Excel => "excel",
        };
        f.write_str(s)
    }
}

/// Which sheet of a multi-sheet document to read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetSelection {
    /// The first sheet (default).
    #[default]
    First,
    /// A sheet by exact name.
    Named(String),
    /// A sheet by 0-based position.
    Index(usize),
}

impl SheetSelection {
    pub(crate) fn label(&self) -> Option<String> {
        match self {
            SheetSelection::First => None,
            SheetSelection::Named(name) => Some(name.clone()),
            SheetSelection::Index(idx) => Some(format!("#{idx}")),
        }
    }
}

/// An uploaded document: raw bytes plus their format.
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    pub format: DocumentFormat,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("format", &self.format)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

impl Document {
    pub fn new(format: DocumentFormat, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            format,
            bytes: bytes.into(),
        }
    }

    /// Wrap an upload, inferring its format from the original file name.
    pub fn from_upload(file_name: &str, bytes: impl Into<Vec<u8>>) -> ImportResult<Self> {
        Ok(Self::new(DocumentFormat::from_file_name(file_name)?, bytes))
    }

    /// Read a document from disk, inferring its format from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> ImportResult<Self> {
        let path = path.as_ref();
        let format = DocumentFormat::from_file_name(&path.to_string_lossy())?;
        Ok(Self::new(format, std::fs::read(path)?))
    }
}

/// Read the selected sheet of `document`.
///
/// # Examples
///
/// ```rust
/// use roster_import::tabular::{read_document, Document, DocumentFormat, SheetSelection};
///
/// # fn main() -> Result<(), roster_import::ImportError> {
/// let doc = Document::new(DocumentFormat::Csv, "StudentId,Class\nS1,Grade 1\n");
/// let sheet = read_document(&doc, &SheetSelection::First)?;
/// assert_eq!(sheet.row_count(), 1);
/// assert_eq!(sheet.row(0).unwrap().get_by_name("Class"), Some("Grade 1"));
/// # Ok(())
/// # }
/// ```
pub fn read_document(document: &Document, selection: &SheetSelection) -> ImportResult<Sheet> {
    let sheet = match document.format {
        DocumentFormat::Csv => read_csv_dispatch(&document.bytes, selection)?,
        DocumentFormat::Json => json::read_json(&document.bytes, selection)?,
        DocumentFormat::Excel => read_excel_dispatch(&document.bytes, selection)?,
    };

    if sheet.row_count() == 0 {
        return Err(ImportError::EmptyDocument);
    }
    Ok(sheet)
}

fn read_csv_dispatch(bytes: &[u8], selection: &SheetSelection) -> ImportResult<Sheet> {
    // A CSV file is a single unnamed sheet.
    match selection {
        SheetSelection::First | SheetSelection::Index(0) => csv::read_csv(bytes),
        _ => Err(ImportError::NoReadableSheet {
            sheet: selection.label(),
        }),
    }
}

fn read_excel_dispatch(bytes: &[u8], selection: &SheetSelection) -> ImportResult<Sheet> {
    // Avoid unused warnings when the feature is off.
    let _ = (bytes, selection);

    #[cfg(feature = "excel")]
    {
        excel::read_excel(bytes, selection)
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(ImportError::UnsupportedDocument {
            message: "excel import not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}
