//! Core logging types: the run log and the [`Log`] trait.
use chrono::{DateTime, Utc};

use crate::provisioner::StepOutcome;

/// One step outcome as recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLogEntry {
    /// When the outcome was recorded.
    pub timestamp: DateTime<Utc>,
    /// Step name.
    pub step: String,
    /// What happened.
    pub outcome: StepOutcome,
}

/// Append-only, ordered record of step outcomes.
///
/// Entries can only be appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunLog {
    entries: Vec<RunLogEntry>,
}

impl RunLog {
    /// An empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an outcome stamped with the current time.
    pub fn append(&mut self, step: &str, outcome: StepOutcome) {
        self.entries.push(RunLogEntry {
            timestamp: Utc::now(),
            step: step.to_string(),
            outcome,
        });
    }

    /// Entries in the order they were recorded.
    #[must_use]
    pub fn entries(&self) -> &[RunLogEntry] {
        &self.entries
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tally of outcomes by kind.
    #[must_use]
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for entry in &self.entries {
            match entry.outcome {
                StepOutcome::Applied => counts.applied += 1,
                StepOutcome::Skipped { .. } => counts.skipped += 1,
                StepOutcome::DryRun => counts.dry_run += 1,
                StepOutcome::Failed { .. } => counts.failed += 1,
            }
        }
        counts
    }
}

/// Number of outcomes of each kind in a [`RunLog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    /// Steps that mutated the host.
    pub applied: usize,
    /// Steps that were converged, not applicable, or declined.
    pub skipped: usize,
    /// Steps reported but not applied.
    pub dry_run: usize,
    /// Steps that failed.
    pub failed: usize,
}

impl OutcomeCounts {
    /// Sum of all counts.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.applied + self.skipped + self.dry_run + self.failed
    }
}

impl std::fmt::Display for OutcomeCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} steps: {} applied, {} skipped, {} dry-run, {} failed",
            self.total(),
            self.applied,
            self.skipped,
            self.dry_run,
            self.failed
        )
    }
}

/// Abstraction over logging backends.
///
/// Credentials must never be passed to any of these methods.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Persist a step outcome.
    fn record_step(&self, name: &str, outcome: &StepOutcome);
    /// Snapshot of every outcome recorded so far.
    fn run_log(&self) -> RunLog;
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order() {
        let mut log = RunLog::new();
        log.append("group msmtp", StepOutcome::Applied);
        log.append(
            "package msmtp",
            StepOutcome::Skipped {
                reason: "already converged".to_string(),
            },
        );
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].step, "group msmtp");
        assert_eq!(log.entries()[1].step, "package msmtp");
        assert!(log.entries()[0].timestamp <= log.entries()[1].timestamp);
    }

    #[test]
    fn counts_summary_line() {
        let mut log = RunLog::new();
        log.append("a", StepOutcome::Applied);
        log.append("b", StepOutcome::DryRun);
        log.append(
            "c",
            StepOutcome::Failed {
                reason: "boom".to_string(),
            },
        );
        assert_eq!(
            log.counts().to_string(),
            "3 steps: 1 applied, 0 skipped, 1 dry-run, 1 failed"
        );
    }

    #[test]
    fn empty_log() {
        let log = RunLog::default();
        assert!(log.is_empty());
        assert_eq!(log.counts().total(), 0);
    }
}
