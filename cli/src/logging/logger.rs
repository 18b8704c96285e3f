//! Structured logger with dry-run awareness and run-log collection.
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, OUTCOME_TARGET, STAGE_TARGET};
use super::types::{Log, RunLog};
use super::utils::log_file_path;
use crate::provisioner::StepOutcome;

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with dry-run awareness and run-log collection.
///
/// Messages become [`tracing`] events; the file layer installed by
/// [`init_subscriber`](super::subscriber::init_subscriber) appends them to
/// `$XDG_CACHE_HOME/ssh-alert/<command>.log`.  Step outcomes are additionally
/// kept in memory as a [`RunLog`] for the end-of-run summary.
#[derive(Debug)]
pub struct Logger {
    run_log: Mutex<RunLog>,
    log_file: PathBuf,
}

impl Logger {
    /// Create a new logger for `command`.
    ///
    /// Does not touch the filesystem.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            run_log: Mutex::new(RunLog::new()),
            log_file: log_file_path(command),
        }
    }

    /// Path of the persistent run log.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_file
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the run log).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Record a step outcome.
    pub fn record_step(&self, name: &str, outcome: &StepOutcome) {
        tracing::info!(target: OUTCOME_TARGET, "{name}: {outcome}");
        if let Ok(mut guard) = self.run_log.lock() {
            guard.append(name, outcome.clone());
        }
    }

    /// Snapshot of the recorded outcomes.
    #[must_use]
    pub fn run_log(&self) -> RunLog {
        self.run_log
            .lock()
            .map_or_else(|_| RunLog::new(), |g| g.clone())
    }

    /// Count the number of failed steps.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.run_log().counts().failed
    }

    /// Print the summary of all recorded steps.
    pub fn print_summary(&self) {
        let run_log = self.run_log();
        if run_log.is_empty() {
            return;
        }

        self.stage("Summary");
        for entry in run_log.entries() {
            let (icon, color) = match entry.outcome {
                StepOutcome::Applied => ("✓", "\x1b[32m"),
                StepOutcome::Skipped { .. } => ("○", "\x1b[2m"),
                StepOutcome::DryRun => ("~", "\x1b[37m"),
                StepOutcome::Failed { .. } => ("✗", "\x1b[31m"),
            };
            let suffix = match &entry.outcome {
                StepOutcome::Skipped { reason } | StepOutcome::Failed { reason } => {
                    format!(" ({reason})")
                }
                StepOutcome::Applied | StepOutcome::DryRun => String::new(),
            };
            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", entry.step));
        }

        self.info(&run_log.counts().to_string());
        self.info(&format!("\x1b[2mlog: {}\x1b[0m", self.log_file.display()));
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record_step(&self, name: &str, outcome: &StepOutcome) {
        self.record_step(name, outcome);
    }

    fn run_log(&self) -> RunLog {
        self.run_log()
    }
}
