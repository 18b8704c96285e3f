//! Text rendered onto the host: mail client config, alert script, hook lines.
use std::fmt::Write as _;
use std::path::Path;

use crate::config::SmtpSettings;
use crate::credentials::Credentials;

const MANAGED_BANNER: &str =
    "# Managed by ssh-alert; changes are overwritten on the next provision run.";

/// Render the mail client configuration.
///
/// A defaults section, one named account block, and the default-account
/// directive.  The password is double-quoted with `\` and `"` escaped.
#[must_use]
pub fn msmtprc(smtp: &SmtpSettings, log_file: &Path, credentials: &Credentials) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{MANAGED_BANNER}");
    let _ = writeln!(out, "defaults");
    let _ = writeln!(out, "auth on");
    if smtp.tls {
        let _ = writeln!(out, "tls on");
        let _ = writeln!(out, "tls_trust_file {}", smtp.tls_trust_file.display());
    } else {
        let _ = writeln!(out, "tls off");
    }
    let _ = writeln!(out, "logfile {}", log_file.display());
    let _ = writeln!(out);
    let _ = writeln!(out, "account {}", smtp.account);
    let _ = writeln!(out, "host {}", smtp.host);
    let _ = writeln!(out, "port {}", smtp.port);
    let _ = writeln!(out, "from {}", credentials.from);
    let _ = writeln!(out, "user {}", credentials.user);
    let _ = writeln!(out, "password {}", quote_password(&credentials.secret));
    let _ = writeln!(out);
    let _ = writeln!(out, "account default : {}", smtp.account);
    out
}

fn quote_password(secret: &str) -> String {
    let mut quoted = String::with_capacity(secret.len() + 2);
    quoted.push('"');
    for c in secret.chars() {
        if matches!(c, '\\' | '"') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Quote `value` as a single POSIX shell word.
///
/// ```
/// use ssh_alert_cli::render::shell_quote;
///
/// assert_eq!(shell_quote("b@y.com"), "'b@y.com'");
/// assert_eq!(shell_quote("it's"), r#"'it'\''s'"#);
/// ```
#[must_use]
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Render the login alert script.
///
/// Exits quietly outside SSH sessions; otherwise pipes a one-line
/// `Subject:` message naming the caller, host, and client address into
/// `sendmail`, addressed to `recipient`.
#[must_use]
pub fn alert_script(sendmail: &Path, recipient: &str) -> String {
    let sendmail = shell_quote(&sendmail.display().to_string());
    let recipient = shell_quote(recipient);
    format!(
        r#"#!/bin/sh
{MANAGED_BANNER}
[ -n "$SSH_CLIENT" ] || exit 0
caller="${{USER:-$(id -un)}}"
ip="${{SSH_CLIENT%% *}}"
host="$(hostname)"
printf 'Subject: User %s logged in to %s from %s\n' "$caller" "$host" "$ip" \
    | {sendmail} {recipient}
"#
    )
}

/// Line added to the login hook; runs the alert script in the background for
/// SSH sessions only.
#[must_use]
pub fn login_hook_line(alert_script: &Path) -> String {
    format!(
        r#"[ -n "$SSH_CLIENT" ] && ( {} >/dev/null 2>&1 & )"#,
        alert_script.display()
    )
}

/// Line added to the boot script to re-apply complain mode.
#[must_use]
pub fn boot_complain_line(profile_path: &Path) -> String {
    format!("aa-complain {}", profile_path.display())
}
