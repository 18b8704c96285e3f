// Shared helpers for integration tests.
//
// Provides an in-memory Debian-like host and ready-made requests so each
// integration test can drive the provision and deprovision commands end to
// end without touching the real machine.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::sync::Arc;

use ssh_alert_cli::commands::deprovision::{self, DeprovisionRequest};
use ssh_alert_cli::commands::provision::{self, ProvisionRequest};
use ssh_alert_cli::config::Settings;
use ssh_alert_cli::credentials::CredentialInput;
use ssh_alert_cli::host::HostEnvironment;
use ssh_alert_cli::host::memory::MemoryHost;
use ssh_alert_cli::logging::Logger;
use ssh_alert_cli::prompt::{NonInteractivePrompter, Prompter};
use ssh_alert_cli::provisioner::RunResult;

/// Fresh Debian-like host where `msmtp` is installable but not installed.
pub fn debian_host() -> Arc<MemoryHost> {
    Arc::new(MemoryHost::debian())
}

/// Upcast for the command entry points.
pub fn as_dyn(host: &Arc<MemoryHost>) -> Arc<dyn HostEnvironment> {
    Arc::clone(host) as Arc<dyn HostEnvironment>
}

/// Credentials fully supplied by flags, as an automated run would pass them.
pub fn full_credentials() -> CredentialInput {
    CredentialInput {
        from: Some("a@x.com".to_string()),
        user: Some("a@x.com".to_string()),
        recipient: Some("b@y.com".to_string()),
        secret_stdin: Some("pw".to_string()),
        non_interactive: true,
    }
}

/// A non-interactive provision request with access control enabled.
pub fn full_request() -> ProvisionRequest {
    ProvisionRequest {
        credentials: full_credentials(),
        access_control: true,
        dry_run: false,
    }
}

/// Run provision with default settings and a non-interactive prompter.
pub fn provision(
    host: &Arc<MemoryHost>,
    request: &ProvisionRequest,
) -> anyhow::Result<RunResult> {
    provision_with(host, request, &NonInteractivePrompter, &Logger::new("test"))
}

/// Run provision with explicit collaborators.
pub fn provision_with(
    host: &Arc<MemoryHost>,
    request: &ProvisionRequest,
    prompter: &dyn Prompter,
    log: &Logger,
) -> anyhow::Result<RunResult> {
    provision::execute(&Settings::default(), request, &as_dyn(host), prompter, log)
}

/// Run deprovision with default settings.
pub fn deprovision(
    host: &Arc<MemoryHost>,
    request: &DeprovisionRequest,
    prompter: &dyn Prompter,
) -> anyhow::Result<RunResult> {
    deprovision::execute(
        &Settings::default(),
        request,
        &as_dyn(host),
        prompter,
        &Logger::new("test"),
    )
}
