//! Top-level subcommand orchestration.
pub mod completions;
pub mod deprovision;
pub mod provision;
pub mod version;

use anyhow::Result;
use std::path::Path;

use crate::config::Settings;
use crate::config::validation;
use crate::host::HostEnvironment;
use crate::logging::{Log, Logger};
use crate::provisioner::RunResult;

/// Load settings from `path` and log any validation warnings.
///
/// # Errors
///
/// Returns an error if the settings file exists but cannot be read or parsed.
pub fn load_settings(path: &Path, log: &dyn Log) -> Result<Settings> {
    log.stage("Loading configuration");
    let settings = Settings::load(path)?;
    log.debug(&format!("settings: {}", path.display()));

    let warnings = validation::validate(&settings);
    if !warnings.is_empty() {
        log.warn(&format!(
            "found {} configuration warning(s):",
            warnings.len()
        ));
        for warning in &warnings {
            log.warn(&format!("  {warning}"));
        }
    }
    Ok(settings)
}

/// Refuse to mutate the host without privileges.  Dry runs need none.
///
/// # Errors
///
/// Returns an error if the run is not a dry run and the process is not
/// privileged, or if privileges cannot be determined.
pub fn preflight(host: &dyn HostEnvironment, dry_run: bool) -> Result<()> {
    if !dry_run && !host.is_privileged()? {
        anyhow::bail!("this command must run as root (use --dry-run to preview)");
    }
    Ok(())
}

/// Print the summary and turn a halted run into an error.
///
/// # Errors
///
/// Returns an error naming the failed step if the run did not complete.
pub fn finish(result: &RunResult, log: &Logger) -> Result<()> {
    log.print_summary();
    if !result.completed {
        anyhow::bail!(
            "step '{}' failed: {}",
            result.failed_at.as_deref().unwrap_or("unknown"),
            result.reason.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
