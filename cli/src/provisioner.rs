//! Strictly sequential, fail-fast step execution.
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::logging::Log;
use crate::prompt::Prompter;
use crate::resources::ResourceChange;
use crate::steps::{Check, Step};

const ALREADY_CONVERGED: &str = "already converged";
const DECLINED: &str = "declined by operator";
const INTERRUPTED_REASON: &str = "interrupted before this step";

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Ask every running provisioner to stop before its next step.
///
/// Returns `true` if an interrupt had already been requested.
#[must_use = "a repeated interrupt usually means the operator wants out now"]
pub fn interrupt() -> bool {
    INTERRUPTED.swap(true, Ordering::SeqCst)
}

/// Whether [`interrupt`] has been called in this process.
#[must_use]
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The host was mutated.
    Applied,
    /// Nothing was done.
    Skipped {
        /// Why: already converged, not applicable, or declined.
        reason: String,
    },
    /// The step needed work but the run is a dry run.
    DryRun,
    /// The check or the mutation failed; the run halted here.
    Failed {
        /// Error chain.
        reason: String,
    },
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::Skipped { reason } => write!(f, "skipped ({reason})"),
            Self::DryRun => write!(f, "dry-run"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Result of a whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Whether every step ran without failing.
    pub completed: bool,
    /// Name of the failed step.
    pub failed_at: Option<String>,
    /// Failure reason.
    pub reason: Option<String>,
}

impl RunResult {
    const fn success() -> Self {
        Self {
            completed: true,
            failed_at: None,
            reason: None,
        }
    }

    const fn failure(step: String, reason: String) -> Self {
        Self {
            completed: false,
            failed_at: Some(step),
            reason: Some(reason),
        }
    }
}

/// Executes steps in order, recording each outcome before moving on.
#[derive(Clone, Copy)]
pub struct Provisioner<'a> {
    log: &'a dyn Log,
    prompter: &'a dyn Prompter,
    dry_run: bool,
    interrupt: Option<&'a AtomicBool>,
}

impl fmt::Debug for Provisioner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioner")
            .field("prompter", &self.prompter)
            .field("dry_run", &self.dry_run)
            .field("interrupt", &self.interrupt)
            .finish_non_exhaustive()
    }
}

impl<'a> Provisioner<'a> {
    /// Create a provisioner.
    #[must_use]
    pub const fn new(log: &'a dyn Log, prompter: &'a dyn Prompter, dry_run: bool) -> Self {
        Self {
            log,
            prompter,
            dry_run,
            interrupt: None,
        }
    }

    /// Watch `flag` instead of the process-wide interrupt flag.
    #[must_use]
    pub const fn with_interrupt(mut self, flag: &'a AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Run `steps` in order.
    ///
    /// The first failure is recorded and ends the run; later steps are never
    /// checked or applied.  A pending [`interrupt`] ends the run the same way
    /// before the next step starts.
    pub fn run(&self, steps: &[Box<dyn Step>]) -> RunResult {
        for step in steps {
            let name = step.name();
            if self.interrupt.unwrap_or(&INTERRUPTED).load(Ordering::SeqCst) {
                let reason = INTERRUPTED_REASON.to_string();
                self.log.record_step(&name, &StepOutcome::Failed {
                    reason: reason.clone(),
                });
                self.log.warn("interrupted; the host keeps every step completed so far");
                return RunResult::failure(name, reason);
            }
            let outcome = self.execute(step.as_ref(), &name);
            self.log.record_step(&name, &outcome);
            if let StepOutcome::Failed { reason } = outcome {
                self.log.error(&format!("{name}: {reason}"));
                self.log
                    .error("run halted; fix the cause and run the command again");
                return RunResult::failure(name, reason);
            }
        }
        RunResult::success()
    }

    fn execute(&self, step: &dyn Step, name: &str) -> StepOutcome {
        let check = match step.check() {
            Ok(check) => check,
            Err(e) => {
                return StepOutcome::Failed {
                    reason: format!("{e:#}"),
                };
            }
        };

        let detail = match check {
            Check::Converged => {
                self.log.debug(&format!("ok: {name} ({ALREADY_CONVERGED})"));
                return skipped(ALREADY_CONVERGED);
            }
            Check::NotApplicable(reason) => {
                self.log.info(&format!("skipped: {name} ({reason})"));
                return StepOutcome::Skipped { reason };
            }
            Check::NeedsWork(detail) => detail,
        };
        if let Some(detail) = detail {
            self.log.debug(&format!("{name}: {detail}"));
        }

        if self.dry_run {
            self.log.dry_run(&step.dry_run_message());
            return StepOutcome::DryRun;
        }

        if let Some(question) = step.confirmation() {
            match self.prompter.confirm(question) {
                Ok(true) => {}
                Ok(false) => {
                    self.log.warn(&format!("{name}: {DECLINED}"));
                    return skipped(DECLINED);
                }
                Err(e) => {
                    return StepOutcome::Failed {
                        reason: e.to_string(),
                    };
                }
            }
        }

        match step.apply() {
            Ok(ResourceChange::Applied) => StepOutcome::Applied,
            Ok(ResourceChange::AlreadyCorrect) => skipped(ALREADY_CONVERGED),
            Ok(ResourceChange::Skipped { reason }) => StepOutcome::Skipped { reason },
            Err(e) => StepOutcome::Failed {
                reason: format!("{e:#}"),
            },
        }
    }
}

fn skipped(reason: &str) -> StepOutcome {
    StepOutcome::Skipped {
        reason: reason.to_string(),
    }
}
