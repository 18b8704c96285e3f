#![allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
//! Integration tests for the `provision` command.
//!
//! Each test drives `provision::execute` against an in-memory Debian-like
//! host and asserts on the resulting host state and mutation journal.

mod common;

use ssh_alert_cli::commands::provision::ProvisionRequest;
use ssh_alert_cli::error::{AlertError, ResourceError, ValidationError};
use ssh_alert_cli::host::HostEnvironment as _;
use ssh_alert_cli::host::memory::{MemoryHost, Mutation, NodeKind, Operation};
use ssh_alert_cli::logging::Logger;
use ssh_alert_cli::prompt::{NonInteractivePrompter, ScriptedPrompter};
use std::path::PathBuf;
use std::sync::Arc;

use common::{debian_host, full_request, provision, provision_with};

const MSMTPRC: &str = "/etc/msmtprc";
const RC_LOCAL: &str = "/etc/rc.local";
const LOGIN_HOOK: &str = "/etc/profile.d/ssh-login-alert.sh";
const ALERT_SCRIPT: &str = "/usr/local/bin/ssh-login-alert";
const COMPLAIN_LINE: &str = "aa-complain /etc/apparmor.d/usr.bin.msmtp";

fn count_lines(content: &str, line: &str) -> usize {
    content.lines().filter(|l| l.trim() == line).count()
}

// ---------------------------------------------------------------------------
// Fresh host
// ---------------------------------------------------------------------------

#[test]
fn fresh_host_reaches_desired_state() {
    let host = debian_host();
    let result = provision(&host, &full_request()).unwrap();
    assert!(result.completed, "{result:?}");

    let snapshot = host.snapshot();
    assert!(snapshot.groups.contains_key("msmtp"));
    assert!(snapshot.users.contains_key("msmtp"));
    assert!(snapshot.packages.contains("msmtp"));
    assert!(snapshot.complain.contains("/usr/bin/msmtp"));

    let gid = snapshot.groups["msmtp"];
    let log_dir = host.node("/var/log/msmtp").unwrap();
    assert_eq!(log_dir.kind, NodeKind::Directory);
    assert_eq!((log_dir.mode, log_dir.uid, log_dir.gid), (0o2775, 0, gid));
    let log_file = host.node("/var/log/msmtp/msmtp.log").unwrap();
    assert_eq!((log_file.mode, log_file.uid, log_file.gid), (0o664, 0, gid));

    assert_eq!(
        host.node("/usr/sbin/sendmail").unwrap().kind,
        NodeKind::Symlink(PathBuf::from("/usr/bin/msmtp"))
    );
    assert_eq!(host.node(ALERT_SCRIPT).unwrap().mode, 0o755);
    assert_eq!(host.node(MSMTPRC).unwrap().mode, 0o644);
}

#[test]
fn config_carries_supplied_credentials() {
    let host = debian_host();
    provision(&host, &full_request()).unwrap();

    let config = host.file_contents(MSMTPRC).unwrap();
    assert!(config.lines().any(|l| l == "from a@x.com"), "{config}");
    assert!(config.lines().any(|l| l == "user a@x.com"), "{config}");
    assert!(config.lines().any(|l| l == r#"password "pw""#), "{config}");
    assert!(config.contains("logfile /var/log/msmtp/msmtp.log"));

    let script = host.file_contents(ALERT_SCRIPT).unwrap();
    assert!(script.contains("b@y.com"));
    assert!(script.contains("/usr/sbin/sendmail"));
}

#[test]
fn hooks_are_registered() {
    let host = debian_host();
    provision(&host, &full_request()).unwrap();

    let hook = host.file_contents(LOGIN_HOOK).unwrap();
    assert_eq!(hook.lines().filter(|l| l.contains(ALERT_SCRIPT)).count(), 1);

    let rc_local = host.file_contents(RC_LOCAL).unwrap();
    assert!(rc_local.starts_with("#!/bin/sh -e\n"));
    assert_eq!(count_lines(&rc_local, COMPLAIN_LINE), 1);
    assert_eq!(host.node(RC_LOCAL).unwrap().mode, 0o755);
}

// ---------------------------------------------------------------------------
// Idempotence
// ---------------------------------------------------------------------------

#[test]
fn second_run_only_rewrites_config() {
    let host = debian_host();
    provision(&host, &full_request()).unwrap();
    let before = host.snapshot();
    let first_run = host.mutation_count();

    let log = Logger::new("test");
    let result = provision_with(&host, &full_request(), &NonInteractivePrompter, &log).unwrap();
    assert!(result.completed);

    assert_eq!(
        host.mutations()[first_run..],
        [Mutation {
            op: Operation::WriteFile,
            target: MSMTPRC.to_string(),
        }]
    );
    assert_eq!(host.snapshot(), before);

    let counts = log.run_log().counts();
    assert_eq!(counts.applied, 1);
    assert_eq!(counts.failed, 0);
    assert_eq!(counts.total(), 11);
}

#[test]
fn hook_line_added_once_to_existing_boot_script() {
    let host = Arc::new(MemoryHost::debian().with_file(
        RC_LOCAL,
        "#!/bin/sh -e\n# site-local tweaks\nexit 0\n",
        0o755,
    ));
    provision(&host, &full_request()).unwrap();
    provision(&host, &full_request()).unwrap();

    let rc_local = host.file_contents(RC_LOCAL).unwrap();
    assert_eq!(count_lines(&rc_local, COMPLAIN_LINE), 1);
    assert!(rc_local.contains("# site-local tweaks\n"));
    assert!(rc_local.ends_with("exit 0\n"), "{rc_local}");
}

// ---------------------------------------------------------------------------
// Failure handling
// ---------------------------------------------------------------------------

#[test]
fn package_failure_halts_before_later_steps() {
    let host = debian_host();
    host.fail_on(Operation::InstallPackage);
    let log = Logger::new("test");

    let result = provision_with(&host, &full_request(), &NonInteractivePrompter, &log).unwrap();
    assert!(!result.completed);
    assert_eq!(result.failed_at.as_deref(), Some("package msmtp"));
    assert!(result.reason.unwrap().contains("package manager failed"));

    assert!(host.file_contents(MSMTPRC).is_none());
    assert!(host.node("/usr/sbin/sendmail").is_none());
    assert!(host.node(ALERT_SCRIPT).is_none());
    assert!(host.snapshot().complain.is_empty());

    assert_eq!(log.run_log().len(), 5);
    assert_eq!(log.run_log().counts().failed, 1);

    host.clear_failures();
    let retry = provision(&host, &full_request()).unwrap();
    assert!(retry.completed);
    assert!(host.file_contents(MSMTPRC).is_some());
}

#[test]
fn package_failure_is_reported_as_package_manager_error() {
    let host = MemoryHost::debian();
    host.fail_on(Operation::InstallPackage);
    let err = host.install_package("msmtp").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ResourceError>(),
        Some(ResourceError::PackageManager { .. })
    ));
}

#[test]
fn failed_config_write_keeps_previous_config() {
    let host = debian_host();
    provision(&host, &full_request()).unwrap();
    let original = host.file_contents(MSMTPRC).unwrap();

    let mut changed = full_request();
    changed.credentials.from = Some("other@x.com".to_string());
    host.fail_on(Operation::WriteFile);
    let result = provision(&host, &changed).unwrap();

    assert!(!result.completed);
    assert_eq!(result.failed_at.as_deref(), Some(MSMTPRC));
    assert_eq!(host.file_contents(MSMTPRC).unwrap(), original);
}

#[test]
fn directory_at_config_path_halts_run() {
    let host = Arc::new(MemoryHost::debian().with_dir(MSMTPRC));
    let log = Logger::new("test");

    let result = provision_with(&host, &full_request(), &NonInteractivePrompter, &log).unwrap();
    assert!(!result.completed);
    assert_eq!(result.failed_at.as_deref(), Some(MSMTPRC));
    assert!(result.reason.unwrap().contains("is a directory"));
    assert_eq!(host.node(MSMTPRC).unwrap().kind, NodeKind::Directory);
    assert!(host.node(ALERT_SCRIPT).is_none());
    assert_eq!(log.run_log().counts().failed, 1);
}

#[test]
fn directory_at_login_hook_path_halts_run() {
    let host = Arc::new(MemoryHost::debian().with_dir(LOGIN_HOOK));

    let result = provision(&host, &full_request()).unwrap();
    assert!(!result.completed);
    assert_eq!(
        result.failed_at.as_deref(),
        Some("hook line in /etc/profile.d/ssh-login-alert.sh")
    );
    assert_eq!(host.node(LOGIN_HOOK).unwrap().kind, NodeKind::Directory);
}

#[test]
fn file_at_log_directory_path_halts_run() {
    let host = Arc::new(MemoryHost::debian().with_file("/var/log/msmtp", "", 0o644));

    let result = provision(&host, &full_request()).unwrap();
    assert!(!result.completed);
    assert_eq!(
        result.failed_at.as_deref(),
        Some("directory /var/log/msmtp (2775 root:msmtp)")
    );
    assert!(!host.snapshot().packages.contains("msmtp"));
    assert!(host.file_contents(MSMTPRC).is_none());
}

#[test]
fn empty_recipient_is_rejected_before_any_mutation() {
    let host = debian_host();
    let mut request = full_request();
    request.credentials.recipient = Some("   ".to_string());

    let err = provision(&host, &request).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AlertError>(),
        Some(AlertError::Validation(ValidationError::Empty {
            field: "recipient address"
        }))
    ));
    assert_eq!(host.mutation_count(), 0);
}

#[test]
fn missing_secret_in_non_interactive_mode_is_rejected() {
    let host = debian_host();
    let mut request = full_request();
    request.credentials.secret_stdin = None;

    let err = provision(&host, &request).unwrap_err();
    assert!(format!("{err:#}").contains("--secret-stdin"));
    assert_eq!(host.mutation_count(), 0);
}

#[test]
fn unprivileged_run_is_refused() {
    let host = Arc::new(MemoryHost::debian().unprivileged());
    let err = provision(&host, &full_request()).unwrap_err();
    assert!(err.to_string().contains("must run as root"));
    assert_eq!(host.mutation_count(), 0);
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[test]
fn dry_run_makes_no_changes_and_needs_no_privileges() {
    let host = Arc::new(MemoryHost::debian().unprivileged());
    let mut request = full_request();
    request.dry_run = true;
    let log = Logger::new("test");

    let result = provision_with(&host, &request, &NonInteractivePrompter, &log).unwrap();
    assert!(result.completed);
    assert_eq!(host.mutation_count(), 0);
    assert_eq!(log.run_log().counts().applied, 0);
    assert!(log.run_log().counts().dry_run > 0);
}

#[test]
fn dry_run_without_privileges_tolerates_installed_profile() {
    let host = Arc::new(
        MemoryHost::debian()
            .with_installed_package("msmtp")
            .unprivileged(),
    );
    let mut request = full_request();
    request.dry_run = true;
    let log = Logger::new("test");

    let result = provision_with(&host, &request, &NonInteractivePrompter, &log).unwrap();
    assert!(result.completed, "{result:?}");
    assert_eq!(host.mutation_count(), 0);
    assert_eq!(log.run_log().counts().failed, 0);
}

#[test]
fn skip_access_control_leaves_profile_and_boot_script_alone() {
    let host = debian_host();
    let mut request = full_request();
    request.access_control = false;

    let result = provision(&host, &request).unwrap();
    assert!(result.completed);
    assert!(host.snapshot().complain.is_empty());
    assert!(host.node(RC_LOCAL).is_none());
    assert!(host.file_contents(MSMTPRC).is_some());
}

#[test]
fn missing_access_control_tooling_is_skipped() {
    let host = Arc::new(MemoryHost::debian().without_access_control());
    let result = provision(&host, &full_request()).unwrap();
    assert!(result.completed);
    assert!(host.snapshot().complain.is_empty());
}

#[test]
fn interactive_run_prompts_in_order() {
    let host = debian_host();
    let prompter = ScriptedPrompter::new()
        .text("a@x.com")
        .text("a@x.com")
        .secret("pw")
        .secret("pw")
        .text("b@y.com")
        .confirm_with(true)
        .confirm_with(true);
    let request = ProvisionRequest {
        access_control: true,
        ..ProvisionRequest::default()
    };

    let result = provision_with(&host, &request, &prompter, &Logger::new("test")).unwrap();
    assert!(result.completed, "{result:?}");
    assert_eq!(
        prompter.asked(),
        [
            "From address",
            "User address",
            "Secret",
            "Confirm secret",
            "Recipient address",
            "Install package msmtp?",
            "Put access-control profile /usr/bin/msmtp in complain mode?",
        ]
    );
}

#[test]
fn declined_package_install_skips_without_failing() {
    let host = debian_host();
    let prompter = ScriptedPrompter::new()
        .text("a@x.com")
        .text("a@x.com")
        .secret("pw")
        .secret("pw")
        .text("b@y.com")
        .confirm_with(false);
    let request = ProvisionRequest {
        access_control: true,
        ..ProvisionRequest::default()
    };
    let log = Logger::new("test");

    let result = provision_with(&host, &request, &prompter, &log).unwrap();
    assert!(result.completed, "{result:?}");
    assert!(!host.snapshot().packages.contains("msmtp"));
    assert!(host.snapshot().complain.is_empty());
}
