//! # Cleanup Cycle
//!
//! One pass over the namespace inventory: list, filter, evaluate, act. Namespaces
//! are handled strictly in listed order, one at a time. A failure on one
//! namespace is recorded and the pass moves on; only a failed listing (or an
//! invalid configuration) aborts the whole cycle.

use crate::config::{ConfigError, CycleConfig};
use crate::expiry::{evaluate, Expiry};
use crate::filter::{exemption, Exemption};
use crate::source::{Namespace, NamespaceDeleter, NamespaceSource, SourceError};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Errors that abort a whole cycle
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to list namespaces: {0}")]
    List(#[source] SourceError),

    #[error("invalid cycle configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("cycle cancelled before namespaces were listed")]
    Cancelled,
}

/// What happened to a single namespace during a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum NamespaceOutcome {
    SkippedProtected,
    SkippedPattern,
    SkippedNoExpiry,
    SkippedParseError { value: String },
    SkippedNotDue { expires_at: i64 },
    DryRunMarked { expires_at: i64 },
    Deleted { expires_at: i64 },
    DeleteFailed { expires_at: i64, error: String },
}

impl NamespaceOutcome {
    /// Stable label used in logs and summaries
    pub fn label(&self) -> &'static str {
        match self {
            Self::SkippedProtected => "skipped-protected",
            Self::SkippedPattern => "skipped-pattern",
            Self::SkippedNoExpiry => "skipped-no-expiry",
            Self::SkippedParseError { .. } => "skipped-parse-error",
            Self::SkippedNotDue { .. } => "skipped-not-due",
            Self::DryRunMarked { .. } => "dry-run-marked",
            Self::Deleted { .. } => "deleted",
            Self::DeleteFailed { .. } => "delete-failed",
        }
    }
}

impl From<Exemption> for NamespaceOutcome {
    fn from(exemption: Exemption) -> Self {
        match exemption {
            Exemption::Protected => Self::SkippedProtected,
            Exemption::PatternMismatch => Self::SkippedPattern,
        }
    }
}

/// Decision recorded for one namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceRecord {
    pub namespace: String,
    #[serde(flatten)]
    pub outcome: NamespaceOutcome,
}

/// Per-outcome counts for a finished cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub total: usize,
    pub skipped_protected: usize,
    pub skipped_pattern: usize,
    pub skipped_no_expiry: usize,
    pub skipped_parse_error: usize,
    pub skipped_not_due: usize,
    pub dry_run_marked: usize,
    pub deleted: usize,
    pub delete_failed: usize,
}

/// Everything a cycle decided, in processing order
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub reference_time: i64,
    pub dry_run: bool,
    pub records: Vec<NamespaceRecord>,
    /// The cycle stopped early because cancellation was requested
    pub cancelled: bool,
}

impl CycleReport {
    fn new(config: &CycleConfig) -> Self {
        Self {
            reference_time: config.reference_time,
            dry_run: config.dry_run,
            records: Vec::new(),
            cancelled: false,
        }
    }

    /// Outcome recorded for `namespace`, if it was processed this cycle.
    pub fn outcome_of(&self, namespace: &str) -> Option<&NamespaceOutcome> {
        self.records
            .iter()
            .find(|record| record.namespace == namespace)
            .map(|record| &record.outcome)
    }

    /// Names of namespaces actually deleted this cycle.
    pub fn deleted(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|record| matches!(record.outcome, NamespaceOutcome::Deleted { .. }))
            .map(|record| record.namespace.as_str())
            .collect()
    }

    pub fn summary(&self) -> CycleSummary {
        let mut summary = CycleSummary {
            total: self.records.len(),
            ..CycleSummary::default()
        };
        for record in &self.records {
            let counter = match record.outcome {
                NamespaceOutcome::SkippedProtected => &mut summary.skipped_protected,
                NamespaceOutcome::SkippedPattern => &mut summary.skipped_pattern,
                NamespaceOutcome::SkippedNoExpiry => &mut summary.skipped_no_expiry,
                NamespaceOutcome::SkippedParseError { .. } => &mut summary.skipped_parse_error,
                NamespaceOutcome::SkippedNotDue { .. } => &mut summary.skipped_not_due,
                NamespaceOutcome::DryRunMarked { .. } => &mut summary.dry_run_marked,
                NamespaceOutcome::Deleted { .. } => &mut summary.deleted,
                NamespaceOutcome::DeleteFailed { .. } => &mut summary.delete_failed,
            };
            *counter += 1;
        }
        summary
    }
}

/// Run one cleanup cycle.
///
/// Cancellation is honoured while listing and between namespaces. A delete
/// request already sent is always awaited, so a cancelled cycle returns a
/// partial report with `cancelled` set rather than an error.
#[instrument(
    skip_all,
    fields(dry_run = config.dry_run, reference_time = config.reference_time)
)]
pub async fn run_cycle(
    source: &dyn NamespaceSource,
    deleter: &dyn NamespaceDeleter,
    config: &CycleConfig,
    cancel: &CancellationToken,
) -> Result<CycleReport, CycleError> {
    let namespaces = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(CycleError::Cancelled),
        listed = source.list() => listed.map_err(CycleError::List)?,
    };
    debug!(count = namespaces.len(), "Evaluating namespaces");

    let mut report = CycleReport::new(config);
    for namespace in namespaces {
        if cancel.is_cancelled() {
            warn!(
                processed = report.records.len(),
                "Cycle cancelled, leaving remaining namespaces for a later run"
            );
            report.cancelled = true;
            break;
        }

        let outcome = process_namespace(&namespace, deleter, config).await;
        report.records.push(NamespaceRecord {
            namespace: namespace.name,
            outcome,
        });
    }

    Ok(report)
}

async fn process_namespace(
    namespace: &Namespace,
    deleter: &dyn NamespaceDeleter,
    config: &CycleConfig,
) -> NamespaceOutcome {
    let name = namespace.name.as_str();

    if let Some(exempt) = exemption(name, config) {
        match exempt {
            Exemption::Protected => warn!(namespace = %name, "Skipping system namespace"),
            Exemption::PatternMismatch => warn!(
                namespace = %name,
                "Skipping namespace that does not match configured regular expression"
            ),
        }
        return exempt.into();
    }

    let expires_at = match evaluate(&namespace.annotations, config) {
        Ok(Expiry::Expired { expires_at }) => expires_at,
        Ok(Expiry::NoExpiry) => {
            debug!(namespace = %name, "No expiry annotation");
            return NamespaceOutcome::SkippedNoExpiry;
        }
        Ok(Expiry::NotYetDue { expires_at }) => {
            debug!(
                namespace = %name,
                expires_in_seconds = expires_at.saturating_sub(config.reference_time),
                "Namespace not yet expired"
            );
            return NamespaceOutcome::SkippedNotDue { expires_at };
        }
        Err(e) => {
            warn!(namespace = %name, error = %e, "Error parsing expiry timestamp in namespace");
            return NamespaceOutcome::SkippedParseError { value: e.value };
        }
    };

    if config.dry_run {
        info!(namespace = %name, expires_at, "(DRY-RUN) Namespace marked for deletion");
        return NamespaceOutcome::DryRunMarked { expires_at };
    }

    match deleter.delete(name).await {
        Ok(()) => {
            info!(namespace = %name, expires_at, "Namespace deleted successfully");
            NamespaceOutcome::Deleted { expires_at }
        }
        Err(e) => {
            error!(namespace = %name, error = %e, "Error deleting namespace");
            NamespaceOutcome::DeleteFailed {
                expires_at,
                error: e.to_string(),
            }
        }
    }
}
