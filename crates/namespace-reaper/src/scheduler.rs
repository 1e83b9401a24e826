//! Periodic driver for cleanup cycles
//!
//! Each tick builds a fresh [`CycleConfig`] (re-reading the name pattern),
//! runs one cycle and logs the outcome. Failed cycles are logged and the next
//! tick simply tries again.

use crate::config::{CycleConfig, EnvPatternSource, PatternSource, ReaperSettings};
use crate::cycle::{run_cycle, CycleError, CycleReport};
use crate::source::{NamespaceDeleter, NamespaceSource};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default pause between cycles
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3600);

/// Runs cleanup cycles against a namespace API
pub struct Scheduler {
    source: Arc<dyn NamespaceSource>,
    deleter: Arc<dyn NamespaceDeleter>,
    settings: ReaperSettings,
    pattern_source: Arc<dyn PatternSource>,
    interval: Duration,
}

impl Scheduler {
    /// Create a scheduler that reads the name pattern from the environment every cycle.
    #[must_use]
    pub fn new(
        source: Arc<dyn NamespaceSource>,
        deleter: Arc<dyn NamespaceDeleter>,
        settings: ReaperSettings,
    ) -> Self {
        Self {
            source,
            deleter,
            settings,
            pattern_source: Arc::new(EnvPatternSource),
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Set the pause between cycles (default: one hour)
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Replace where the name pattern is read from
    #[must_use]
    pub fn with_pattern_source(mut self, pattern_source: Arc<dyn PatternSource>) -> Self {
        self.pattern_source = pattern_source;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Capture the reference time and compile the current name pattern.
    pub fn prepare_cycle(&self) -> Result<CycleConfig, CycleError> {
        let pattern = self.pattern_source.current();
        let reference_time = chrono::Utc::now().timestamp();
        Ok(CycleConfig::build(
            &self.settings,
            pattern.as_deref(),
            reference_time,
        )?)
    }

    /// Run exactly one cleanup cycle.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<CycleReport, CycleError> {
        let started = Instant::now();
        let config = self.prepare_cycle()?;

        info!(
            dry_run = config.dry_run,
            pattern = config.name_pattern.as_ref().map_or("", |p| p.as_str()),
            reference_time = config.reference_time,
            "Starting namespace cleanup cycle"
        );

        let report = run_cycle(
            self.source.as_ref(),
            self.deleter.as_ref(),
            &config,
            cancel,
        )
        .await?;

        let summary = report.summary();
        info!(
            total = summary.total,
            deleted = summary.deleted,
            delete_failed = summary.delete_failed,
            dry_run_marked = summary.dry_run_marked,
            skipped_protected = summary.skipped_protected,
            skipped_pattern = summary.skipped_pattern,
            skipped_parse_error = summary.skipped_parse_error,
            skipped_not_due = summary.skipped_not_due,
            skipped_no_expiry = summary.skipped_no_expiry,
            cancelled = report.cancelled,
            duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Namespace cleanup cycle finished"
        );

        Ok(report)
    }

    /// Run cycles until `cancel` fires. The first cycle starts immediately.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.run_once(&cancel).await {
                warn!(error = %e, "Error cleaning up namespaces");
            }
        }

        info!("Namespace cleanup scheduler stopped");
    }
}
