use thiserror::Error;

use crate::entity::NaturalKey;
use crate::types::EntityId;

/// Convenience result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Job-level error returned by the import pipeline.
///
/// Row-level problems never surface here; they are collected into
/// [`crate::pipeline::ImportOutcome::error_details`]. An `ImportError` means the job as a whole
/// failed: the document could not be read (structural) or the store failed (hard).
#[derive(Debug, Error)]
pub enum ImportError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Workbook decoding error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// CSV decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON decoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// The document has a header but no data rows.
    #[error("document contains no data rows")]
    EmptyDocument,

    /// The requested sheet does not exist (or the document has no sheets at all).
    #[error(
        "no readable sheet{}",
        .sheet.as_deref().map(|s| format!(" named '{s}'")).unwrap_or_default()
    )]
    NoReadableSheet { sheet: Option<String> },

    /// The header row lacks required columns for the chosen import kind.
    #[error("missing required columns: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    /// The document format could not be determined or is not enabled.
    #[error("unsupported document: {message}")]
    UnsupportedDocument { message: String },

    /// The pre-commit existence lookup failed.
    #[error("lookup against store failed: {0}")]
    Lookup(#[source] StoreError),

    /// The batch transaction failed and was rolled back; nothing from this job was persisted.
    #[error("batch commit failed and was rolled back: {0}")]
    Commit(#[source] StoreError),
}

impl ImportError {
    /// Structural errors abort the job before any row is processed.
    pub fn is_structural(&self) -> bool {
        !matches!(self, ImportError::Lookup(_) | ImportError::Commit(_))
    }
}

/// Convenience result type for persistence port operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error type returned by [`crate::store::Store`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A natural key is already taken by another entity of the same tenant.
    #[error("unique constraint violated: {key} already exists (entity {existing})")]
    UniqueViolation { key: NaturalKey, existing: EntityId },

    /// An update targeted an entity that does not exist.
    #[error("entity {0} not found")]
    NotFound(EntityId),

    /// The transaction was already committed or rolled back.
    #[error("transaction is no longer active")]
    TransactionClosed,

    /// Any other backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}
