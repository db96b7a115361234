//! `roster-import` is the bulk import pipeline of a multi-tenant school administration platform:
//! spreadsheets of students, teachers or hostel allocations go in, persisted records and a
//! per-row report come out.
//!
//! The primary entrypoint is [`pipeline::Importer::run`], which reads a [`tabular::Document`],
//! validates every row, deduplicates against the tenant's existing data, synthesizes the related
//! records each row implies, and commits the accepted batch in one transaction.
//!
//! ## What you can import
//!
//! **Document formats (inferred from the file name or forced):**
//!
//! - **CSV**: `.csv` (UTF-8, optional BOM)
//! - **JSON**: `.json` (array of objects, or an object of named arrays acting as sheets)
//! - **Excel/workbooks** (Cargo feature `excel`, on by default): `.xlsx`, `.xls`, `.xlsm`,
//!   `.xlsb`, `.ods`
//!
//! **Import kinds ([`records::ImportKind`]):**
//!
//! - **student**: `FirstName, LastName, StudentId, Email, Class, RollNumber` plus optional
//!   personal details and a parent block (`ParentFirstName`, `ParentEmail`, ...). The class must
//!   exist; the parent is found or created by email and linked to the student.
//! - **teacher**: `FirstName, LastName, Email, EmployeeId, Subject` plus optional details. The
//!   subject is found or created by name and linked to the teacher.
//! - **hostel**: `HostelName, RoomNumber, StudentId` plus optional room details. The student
//!   must exist; the hostel is found or created by name.
//!
//! Header matching is relaxed (`First Name`, `first_name` and `FIRSTNAME` are all `FirstName`)
//! and extra columns are ignored. Dates use `YYYY-MM-DD`.
//!
//! ## Quick example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use roster_import::entity::{Entity, SchoolClass};
//! use roster_import::pipeline::{ImportJob, Importer};
//! use roster_import::records::ImportKind;
//! use roster_import::store::MemoryStore;
//! use roster_import::tabular::{Document, DocumentFormat};
//! use roster_import::types::TenantId;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tenant = TenantId(1);
//! let store = Arc::new(MemoryStore::new());
//! store.seed(Entity::SchoolClass(SchoolClass {
//!     tenant_id: tenant,
//!     name: "Grade 5".to_string(),
//! }))?;
//!
//! let csv = "FirstName,LastName,StudentId,Email,Class,RollNumber\n\
//!            Ada,Lovelace,S-1,ada@example.org,Grade 5,1\n\
//!            Alan,Turing,S-2,not-an-email,Grade 5,2\n";
//!
//! let importer = Importer::new(store.clone());
//! let job = ImportJob::new(ImportKind::Student, tenant);
//! let outcome = importer.run(&job, &Document::new(DocumentFormat::Csv, csv)).await?;
//!
//! assert_eq!((outcome.success, outcome.errors), (1, 1));
//! assert_eq!(
//!     outcome.error_details,
//!     vec!["Row 2: Email 'not-an-email' is not a valid email address"]
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Error model
//!
//! - Problems with a single row (missing field, bad email, duplicate key, unknown class) are
//!   reported in [`pipeline::ImportOutcome::error_details`]; the other rows still import.
//! - A document that cannot be read, or lacks required columns, fails the whole job with an
//!   [`ImportError`] before any row is processed.
//! - A store failure during the commit rolls back everything and fails the job with
//!   [`ImportError::Commit`]; nothing from that job is persisted.
//!
//! ## Persistence
//!
//! The pipeline talks to storage only through the [`store::Store`] and [`store::Transaction`]
//! traits. [`store::MemoryStore`] is a complete in-process implementation used by the tests.
//!
//! ## Observability
//!
//! Attach an [`pipeline::ImportObserver`] with [`pipeline::Importer::with_observer`];
//! [`pipeline::TracingObserver`] forwards every event to `tracing`. The pipeline itself also
//! emits `tracing` events for each phase.

pub mod config;
pub mod entity;
pub mod error;
pub mod pipeline;
pub mod records;
pub mod store;
pub mod tabular;
pub mod types;

pub use error::{ImportError, ImportResult};
