use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ImportError;
use crate::records::ImportKind;
use crate::tabular::DocumentFormat;
use crate::types::TenantId;

use super::report::RowError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (a row was rejected).
    Warning,
    /// Error-level event (the job failed on its input).
    Error,
    /// Critical error (the store failed; typically infrastructure).
    Critical,
}

impl ImportSeverity {
    /// Severity of a job-level failure.
    pub fn for_error(error: &ImportError) -> Self {
        match error {
            ImportError::Io(_) | ImportError::Lookup(_) | ImportError::Commit(_) => {
                ImportSeverity::Critical
            }
            ImportError::Csv(err) => match err.kind() {
                ::csv::ErrorKind::Io(_) => ImportSeverity::Critical,
                _ => ImportSeverity::Error,
            },
            _ => ImportSeverity::Error,
        }
    }
}

/// Context about an import attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportContext {
    pub tenant_id: TenantId,
    pub kind: ImportKind,
    pub format: Option<DocumentFormat>,
    pub validate_only: bool,
}

/// Counters reported when a job finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportStats {
    /// Data rows read (blank rows excluded).
    pub rows: usize,
    /// Rows accepted (inserted or updated).
    pub accepted: usize,
    /// Rows rejected.
    pub rejected: usize,
    /// Primary records inserted.
    pub inserted: usize,
    /// Primary records updated in place.
    pub updated: usize,
    /// Side entities synthesized (parents, subjects, hostels).
    pub side_entities_created: usize,
    /// Link entities created or re-pointed at another side.
    pub links_created: usize,
}

/// Observer interface for import outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait ImportObserver: Send + Sync {
    /// Called when a job completes (possibly with rejected rows).
    fn on_success(&self, _ctx: &ImportContext, _stats: ImportStats) {}

    /// Called once per rejected row.
    fn on_row_rejected(&self, _ctx: &ImportContext, _row: &RowError) {}

    /// Called when the job fails.
    fn on_failure(&self, _ctx: &ImportContext, _severity: ImportSeverity, _error: &ImportError) {}

    /// Called when a job failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &ImportContext, severity: ImportSeverity, error: &ImportError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ImportObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn ImportObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl ImportObserver for CompositeObserver {
    fn on_success(&self, ctx: &ImportContext, stats: ImportStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_row_rejected(&self, ctx: &ImportContext, row: &RowError) {
        for o in &self.observers {
            o.on_row_rejected(ctx, row);
        }
    }

    fn on_failure(&self, ctx: &ImportContext, severity: ImportSeverity, error: &ImportError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &ImportContext, severity: ImportSeverity, error: &ImportError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Emits import events through `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl ImportObserver for TracingObserver {
    fn on_success(&self, ctx: &ImportContext, stats: ImportStats) {
        tracing::info!(
            tenant = %ctx.tenant_id,
            kind = %ctx.kind,
            format = ?ctx.format,
            validate_only = ctx.validate_only,
            rows = stats.rows,
            accepted = stats.accepted,
            rejected = stats.rejected,
            inserted = stats.inserted,
            updated = stats.updated,
            side_entities = stats.side_entities_created,
            links = stats.links_created,
            "import finished"
        );
    }

    fn on_row_rejected(&self, ctx: &ImportContext, row: &RowError) {
        tracing::debug!(
            tenant = %ctx.tenant_id,
            kind = %ctx.kind,
            format = ?ctx.format,
            row = row.row,
            reason = ?row.reason,
            messages = %row.messages.join(", "),
            "row rejected"
        );
    }

    fn on_failure(&self, ctx: &ImportContext, severity: ImportSeverity, error: &ImportError) {
        tracing::warn!(
            tenant = %ctx.tenant_id,
            kind = %ctx.kind,
            format = ?ctx.format,
            ?severity,
            error = %error,
            "import failed"
        );
    }

    fn on_alert(&self, ctx: &ImportContext, severity: ImportSeverity, error: &ImportError) {
        tracing::error!(
            tenant = %ctx.tenant_id,
            kind = %ctx.kind,
            format = ?ctx.format,
            ?severity,
            error = %error,
            "import failure alert"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::{ImportContext, ImportObserver, ImportSeverity, ImportStats, TracingObserver};
    use crate::error::{ImportError, StoreError};
    use crate::pipeline::{RejectReason, RowError};
    use crate::records::ImportKind;
    use crate::tabular::DocumentFormat;
    use crate::types::TenantId;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn store_failures_are_critical_and_input_failures_are_errors() {
        let commit = ImportError::Commit(StoreError::Backend("down".to_string()));
        assert_eq!(ImportSeverity::for_error(&commit), ImportSeverity::Critical);

        let missing = ImportError::MissingColumns {
            columns: vec!["Email".to_string()],
        };
        assert_eq!(ImportSeverity::for_error(&missing), ImportSeverity::Error);
        assert!(ImportSeverity::Warning < ImportSeverity::Error);
    }

    #[test]
    fn tracing_events_carry_the_document_format() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .finish();

        let ctx = ImportContext {
            tenant_id: TenantId(3),
            kind: ImportKind::Hostel,
            format: Some(DocumentFormat::Json),
            validate_only: false,
        };
        let error = ImportError::EmptyDocument;
        tracing::subscriber::with_default(subscriber, || {
            let observer = TracingObserver;
            observer.on_success(&ctx, ImportStats::default());
            observer.on_row_rejected(&ctx, &RowError::single(2, RejectReason::Invalid, "bad"));
            observer.on_failure(&ctx, ImportSeverity::Error, &error);
            observer.on_alert(&ctx, ImportSeverity::Error, &error);
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4, "{output}");
        assert!(lines.iter().all(|l| l.contains("format=Some(Json)")), "{output}");
    }
}
