//! Deprovision command implementation.
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::{DeprovisionOpts, GlobalOpts};
use crate::config::Settings;
use crate::exec::SystemExecutor;
use crate::host::HostEnvironment;
use crate::host::system::SystemHost;
use crate::logging::{self, Log, Logger};
use crate::prompt::{NonInteractivePrompter, Prompter, TerminalPrompter};
use crate::provisioner::{Provisioner, RunResult};
use crate::steps::deprovision::deprovision_steps;

/// Question asked once before anything is removed.
pub const CONFIRM_QUESTION: &str = "Remove ssh-alert from this host?";

/// Everything a deprovision run needs besides the host and collaborators.
#[derive(Debug, Clone, Default)]
pub struct DeprovisionRequest {
    /// System user to remove; the configured user when `None`.
    pub user: Option<String>,
    /// Provision run log to delete at the end.
    pub run_log: Option<PathBuf>,
    /// Check only, never mutate.
    pub dry_run: bool,
}

/// Run the deprovision command against the real host.
///
/// # Errors
///
/// Returns an error if settings cannot be loaded, preflight fails, the
/// operator declines, or any step fails.
pub fn run(global: &GlobalOpts, opts: &DeprovisionOpts, log: &Logger) -> Result<()> {
    let settings = super::load_settings(&global.config, log)?;
    let request = DeprovisionRequest {
        user: opts.user.clone(),
        run_log: Some(logging::log_file_path("provision")),
        dry_run: global.dry_run,
    };

    let host: Arc<dyn HostEnvironment> = Arc::new(SystemHost::new(Arc::new(SystemExecutor)));
    let prompter: &dyn Prompter = if opts.non_interactive {
        &NonInteractivePrompter
    } else {
        &TerminalPrompter
    };

    let result = execute(&settings, &request, &host, prompter, log)?;
    super::finish(&result, log)
}

/// Preflight, confirm once, then remove everything provision created.
///
/// # Errors
///
/// Returns an error if preflight fails or the operator declines.  Step
/// failures are reported in the returned [`RunResult`].
pub fn execute(
    settings: &Settings,
    request: &DeprovisionRequest,
    host: &Arc<dyn HostEnvironment>,
    prompter: &dyn Prompter,
    log: &dyn Log,
) -> Result<RunResult> {
    super::preflight(host.as_ref(), request.dry_run)?;

    if !request.dry_run && !prompter.confirm(CONFIRM_QUESTION)? {
        anyhow::bail!("deprovision declined by operator");
    }

    let user = request
        .user
        .as_deref()
        .unwrap_or(settings.accounts.user.as_str());
    log.stage("Deprovisioning");
    let steps = deprovision_steps(settings, user, request.run_log.as_deref(), host);
    Ok(Provisioner::new(log, prompter, request.dry_run).run(&steps))
}
