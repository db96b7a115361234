//! The import pipeline.
//!
//! [`Importer::run`] takes one uploaded document through every stage:
//!
//! 1. read the document into a [`Sheet`] ([`crate::tabular`])
//! 2. resolve the header against the kind's required/optional fields ([`header`])
//! 3. per row: parse into a candidate ([`parse`]), validate it ([`validate`])
//! 4. one batched existence query for every natural key the valid rows mention
//! 5. per row: duplicate and reference checks, then side-entity planning
//! 6. one transaction for the whole accepted batch (skipped when `validate_only`)
//! 7. aggregate the [`ImportOutcome`]
//!
//! Problems with single rows become entries in [`ImportOutcome::error_details`]. Only a document
//! that cannot be read or a store failure ends the job with an [`ImportError`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use roster_import::pipeline::{ImportJob, Importer, TracingObserver};
//! use roster_import::records::ImportKind;
//! use roster_import::store::MemoryStore;
//! use roster_import::tabular::Document;
//! use roster_import::types::TenantId;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), roster_import::ImportError> {
//! let importer = Importer::new(Arc::new(MemoryStore::new()))
//!     .with_observer(Arc::new(TracingObserver));
//!
//! let job = ImportJob::new(ImportKind::Student, TenantId(7));
//! let document = Document::from_path("students.csv")?;
//! let outcome = importer.run(&job, &document).await?;
//! println!("{} of {} rows imported", outcome.success, outcome.total);
//! # Ok(())
//! # }
//! ```

mod commit;
mod dedup;
pub mod header;
pub mod observability;
pub mod parse;
mod report;
mod synthesize;
pub mod validate;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ImportConfig;
use crate::entity::NaturalKey;
use crate::error::{ImportError, ImportResult};
use crate::records::{HostelImport, ImportKind, RecordKind, StudentImport, TeacherImport};
use crate::store::Store;
use crate::tabular::{Document, DocumentFormat, read_document};
use crate::types::{Sheet, TenantId};

use commit::{CommitPlan, PrimaryRef};
use dedup::{Deduplicator, Resolution};
use parse::RowCells;
use report::Reporter;
use synthesize::Synthesizer;

pub use observability::{
    CompositeObserver, ImportContext, ImportObserver, ImportSeverity, ImportStats,
    TracingObserver,
};
pub use report::{ImportOutcome, RejectReason, RowAction, RowError};

/// Per-upload switches.
///
/// `skip_duplicates` takes precedence: a row whose key already exists is skipped even when
/// `update_existing` is also set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOptions {
    /// Reject rows whose natural key already exists (default `true`).
    pub skip_duplicates: bool,
    /// Update the existing record in place instead (requires `skip_duplicates = false`).
    pub update_existing: bool,
    /// Run every stage except the commit.
    pub validate_only: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            skip_duplicates: true,
            update_existing: false,
            validate_only: false,
        }
    }
}

/// One import request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub kind: ImportKind,
    pub tenant_id: TenantId,
    #[serde(default)]
    pub options: ImportOptions,
}

impl ImportJob {
    pub fn new(kind: ImportKind, tenant_id: TenantId) -> Self {
        Self {
            kind,
            tenant_id,
            options: ImportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }
}

/// Runs import jobs against one store.
///
/// An importer holds no per-job state; one instance can serve any number of jobs and tenants.
/// Jobs for the same tenant should not run concurrently: the duplicate checks of one job do not
/// see the uncommitted rows of another.
#[derive(Clone)]
pub struct Importer {
    store: Arc<dyn Store>,
    config: ImportConfig,
    observer: Option<Arc<dyn ImportObserver>>,
}

impl fmt::Debug for Importer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Importer")
            .field("config", &self.config)
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

/// An accepted row waiting for its identity.
struct Accepted {
    primary: PrimaryRef,
    action: RowAction,
    summary: serde_json::Value,
}

impl Importer {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            config: ImportConfig::default(),
            observer: None,
        }
    }

    pub fn with_config(mut self, config: ImportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ImportObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Import `document` according to `job`.
    ///
    /// When an observer is configured it receives `on_row_rejected` for each rejected row,
    /// then `on_success` or `on_failure` (plus `on_alert` at or above the configured severity).
    pub async fn run(&self, job: &ImportJob, document: &Document) -> ImportResult<ImportOutcome> {
        let ctx = self.context(job, Some(document.format));
        tracing::info!(
            tenant = %job.tenant_id,
            kind = %job.kind,
            format = %document.format,
            validate_only = job.options.validate_only,
            "import started"
        );

        let result = match read_document(document, &self.config.sheet) {
            Ok(sheet) => self.process(job, &ctx, &sheet).await,
            Err(e) => Err(e),
        };
        self.finish(&ctx, result)
    }

    /// Import rows that were already read into a [`Sheet`].
    pub async fn run_sheet(&self, job: &ImportJob, sheet: &Sheet) -> ImportResult<ImportOutcome> {
        let ctx = self.context(job, None);
        let result = if sheet.row_count() == 0 {
            Err(ImportError::EmptyDocument)
        } else {
            self.process(job, &ctx, sheet).await
        };
        self.finish(&ctx, result)
    }

    fn context(&self, job: &ImportJob, format: Option<DocumentFormat>) -> ImportContext {
        ImportContext {
            tenant_id: job.tenant_id,
            kind: job.kind,
            format,
            validate_only: job.options.validate_only,
        }
    }

    fn finish(
        &self,
        ctx: &ImportContext,
        result: ImportResult<(ImportOutcome, ImportStats)>,
    ) -> ImportResult<ImportOutcome> {
        match result {
            Ok((outcome, stats)) => {
                if let Some(obs) = self.observer.as_ref() {
                    obs.on_success(ctx, stats);
                }
                Ok(outcome)
            }
            Err(e) => {
                if let Some(obs) = self.observer.as_ref() {
                    let sev = ImportSeverity::for_error(&e);
                    obs.on_failure(ctx, sev, &e);
                    if sev >= self.config.alert_at_or_above {
                        obs.on_alert(ctx, sev, &e);
                    }
                }
                Err(e)
            }
        }
    }

    async fn process(
        &self,
        job: &ImportJob,
        ctx: &ImportContext,
        sheet: &Sheet,
    ) -> ImportResult<(ImportOutcome, ImportStats)> {
        match job.kind {
            ImportKind::Student => self.process_kind::<StudentImport>(job, ctx, sheet).await,
            ImportKind::Teacher => self.process_kind::<TeacherImport>(job, ctx, sheet).await,
            ImportKind::Hostel => self.process_kind::<HostelImport>(job, ctx, sheet).await,
        }
    }

    async fn process_kind<K: RecordKind>(
        &self,
        job: &ImportJob,
        ctx: &ImportContext,
        sheet: &Sheet,
    ) -> ImportResult<(ImportOutcome, ImportStats)> {
        let tenant = job.tenant_id;
        let header = header::resolve_header(
            sheet.header(),
            K::REQUIRED,
            K::OPTIONAL,
            &self.config.column_aliases,
        )?;

        let mut reporter = Reporter::new(self.config.sample_size);
        let mut valid: Vec<(usize, K::Record)> = Vec::with_capacity(sheet.row_count());
        for row in sheet.rows() {
            reporter.row_read();
            let checked = match row.defect() {
                Some(defect) => Err(RowError::single(row.index, RejectReason::Malformed, defect)),
                None => K::parse(&RowCells::new(row, &header))
                    .map_err(|m| RowError::single(row.index, RejectReason::Malformed, m.message))
                    .and_then(|candidate| {
                        K::validate(candidate, self.config.strict_optional_fields).map_err(
                            |messages| RowError::new(row.index, RejectReason::Invalid, messages),
                        )
                    }),
            };
            match checked {
                Ok(record) => valid.push((row.index, record)),
                Err(e) => self.reject(ctx, &mut reporter, e),
            }
        }
        tracing::debug!(
            rows = sheet.row_count(),
            valid = valid.len(),
            "rows parsed and validated"
        );

        let keys: Vec<NaturalKey> = valid
            .iter()
            .flat_map(|(_, record)| mentioned_keys::<K>(record, tenant))
            .collect();
        let existing = dedup::prefetch(self.store.as_ref(), tenant, keys).await?;

        let mut resolver = Deduplicator::new(&existing, &job.options);
        let mut synth = Synthesizer::new(&existing, CommitPlan::new(tenant));
        let mut accepted: Vec<Accepted> = Vec::new();
        for (row, record) in valid {
            let keys = K::identity_keys(&record);
            let resolution = match resolver.resolve(row, &keys) {
                Ok(resolution) => resolution,
                Err(e) => {
                    self.reject(ctx, &mut reporter, e);
                    continue;
                }
            };
            let reference = match K::reference(&record).map(|r| resolver.reference(row, &r)) {
                None => None,
                Some(Ok(id)) => Some(id),
                Some(Err(e)) => {
                    self.reject(ctx, &mut reporter, e);
                    continue;
                }
            };
            let primary = match K::primary(&record, tenant, reference) {
                Ok(primary) => primary,
                Err(message) => {
                    let e = RowError::single(row, RejectReason::MissingReference, message);
                    self.reject(ctx, &mut reporter, e);
                    continue;
                }
            };

            resolver.claim(row, &keys);
            let action = match resolution {
                Resolution::New => RowAction::Created,
                Resolution::Update(_) => RowAction::Updated,
            };
            let primary =
                synth.add(resolution, primary, K::side(&record, tenant), K::link(&record));
            accepted.push(Accepted {
                primary,
                action,
                summary: K::summary(&record),
            });
        }

        let mut plan = synth.into_plan();
        if !plan.updates.is_empty() {
            let links = synthesize::reconcile_existing_links(self.store.as_ref(), &mut plan).await?;
            tracing::debug!(
                dropped = links.dropped,
                replaced = links.replaced,
                "reconciled links of updated records"
            );
        }

        let mut stats = ImportStats::default();
        if job.options.validate_only {
            tracing::info!(
                inserts = plan.inserts.len(),
                updates = plan.updates.len(),
                sides = plan.sides.len(),
                links = plan.links.len(),
                "validate only, nothing committed"
            );
            for a in accepted {
                reporter.accept(a.summary, None, a.action);
            }
        } else if plan.is_empty() {
            tracing::debug!("no accepted rows, nothing to commit");
        } else {
            let committed = commit::commit(self.store.as_ref(), &plan)
                .await
                .map_err(ImportError::Commit)?;
            stats.inserted = committed.inserted.len();
            stats.updated = plan.updates.len();
            stats.side_entities_created = committed.sides.len();
            stats.links_created = committed.links.len();
            for a in accepted {
                reporter.accept(a.summary, committed.primary_id(a.primary), a.action);
            }
        }

        let outcome = reporter.finish();
        stats.rows = outcome.total;
        stats.accepted = outcome.success;
        stats.rejected = outcome.errors;
        Ok((outcome, stats))
    }

    fn reject(&self, ctx: &ImportContext, reporter: &mut Reporter, error: RowError) {
        if let Some(obs) = self.observer.as_ref() {
            obs.on_row_rejected(ctx, &error);
        }
        reporter.reject(error);
    }
}

/// Every key a record may need looked up: identity, reference and side entity.
fn mentioned_keys<K: RecordKind>(record: &K::Record, tenant: TenantId) -> Vec<NaturalKey> {
    let mut keys: Vec<NaturalKey> = K::identity_keys(record).into_iter().map(|k| k.key).collect();
    keys.extend(K::reference(record).map(|k| k.key));
    keys.extend(K::side(record, tenant).map(|s| s.key.key));
    keys
}
