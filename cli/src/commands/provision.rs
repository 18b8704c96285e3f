//! Provision command implementation.
use anyhow::{Context as _, Result};
use std::io::BufRead;
use std::sync::Arc;

use crate::cli::{GlobalOpts, ProvisionOpts};
use crate::config::Settings;
use crate::credentials::{self, CredentialInput};
use crate::exec::SystemExecutor;
use crate::host::HostEnvironment;
use crate::host::system::SystemHost;
use crate::logging::{Log, Logger};
use crate::plan::ProvisionPlan;
use crate::prompt::{NonInteractivePrompter, Prompter, TerminalPrompter};
use crate::provisioner::{Provisioner, RunResult};
use crate::steps::provision::provision_steps;

/// Everything a provision run needs besides the host and collaborators.
#[derive(Debug, Clone, Default)]
pub struct ProvisionRequest {
    /// Credential values supplied up front.
    pub credentials: CredentialInput,
    /// Whether access-control relaxation may run.
    pub access_control: bool,
    /// Check only, never mutate.
    pub dry_run: bool,
}

/// Run the provision command against the real host.
///
/// # Errors
///
/// Returns an error if settings cannot be loaded, preflight or credential
/// validation fails, or any step fails.
pub fn run(global: &GlobalOpts, opts: &ProvisionOpts, log: &Logger) -> Result<()> {
    log.info(&format!("ssh-alert {}", env!("CARGO_PKG_VERSION")));
    let settings = super::load_settings(&global.config, log)?;

    let secret_stdin = if opts.secret_stdin {
        Some(read_secret_line(std::io::stdin().lock())?)
    } else {
        None
    };
    let request = ProvisionRequest {
        credentials: CredentialInput {
            from: opts.from.clone(),
            user: opts.user.clone(),
            recipient: opts.recipient.clone(),
            secret_stdin,
            non_interactive: opts.non_interactive,
        },
        access_control: !opts.skip_access_control,
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

/// Preflight, collect credentials, then converge every provision step.
///
/// Credentials are collected and validated before the first step, so
/// invalid input returns an error with the host untouched.
///
/// # Errors
///
/// Returns an error if preflight fails or credentials are invalid.  Step
/// failures are reported in the returned [`RunResult`].
pub fn execute(
    settings: &Settings,
    request: &ProvisionRequest,
    host: &Arc<dyn HostEnvironment>,
    prompter: &dyn Prompter,
    log: &dyn Log,
) -> Result<RunResult> {
    super::preflight(host.as_ref(), request.dry_run)?;

    log.stage("Collecting credentials");
    let credentials = credentials::collect(&request.credentials, prompter)?;
    log.info(&format!(
        "alerts from {} to {}",
        credentials.from, credentials.recipient
    ));

    let plan = ProvisionPlan::new(settings, &credentials, request.access_control);
    if plan.access_control.is_none() {
        log.info("access-control relaxation disabled");
    }

    log.stage("Provisioning");
    let steps = provision_steps(&plan, host);
    Ok(Provisioner::new(log, prompter, request.dry_run).run(&steps))
}

/// Read the first line of `reader`, without its line terminator.
///
/// # Errors
///
/// Returns an error if the reader fails.
pub fn read_secret_line(mut reader: impl BufRead) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("reading secret from stdin")?;
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(line)
}
