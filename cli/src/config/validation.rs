//! Non-fatal sanity checks over [`Settings`].
use std::path::Path;

use super::Settings;

/// A validation warning detected after loading settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Settings section (e.g. "paths", "smtp").
    pub source: String,
    /// The specific key that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Build a warning.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.source, self.item, self.message)
    }
}

fn check_absolute(warnings: &mut Vec<ValidationWarning>, source: &str, item: &str, path: &Path) {
    if !path.is_absolute() {
        warnings.push(ValidationWarning::new(
            source,
            item,
            format!("path should be absolute: {}", path.display()),
        ));
    }
}

/// Check `settings` for values that load fine but are probably mistakes.
#[must_use]
pub fn validate(settings: &Settings) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let paths = &settings.paths;

    for (item, path) in [
        ("config_file", &paths.config_file),
        ("log_dir", &paths.log_dir),
        ("log_file", &paths.log_file),
        ("mail_client", &paths.mail_client),
        ("sendmail_link", &paths.sendmail_link),
        ("alert_script", &paths.alert_script),
        ("login_hook", &paths.login_hook),
    ] {
        check_absolute(&mut warnings, "paths", item, path);
    }
    check_absolute(
        &mut warnings,
        "smtp",
        "tls_trust_file",
        &settings.smtp.tls_trust_file,
    );
    if settings.access_control.enabled {
        check_absolute(
            &mut warnings,
            "access_control",
            "profile_path",
            &settings.access_control.profile_path,
        );
        check_absolute(
            &mut warnings,
            "access_control",
            "boot_script",
            &settings.access_control.boot_script,
        );
    }

    if settings.smtp.port == 0 {
        warnings.push(ValidationWarning::new("smtp", "port", "port 0 is not a valid relay port"));
    }

    if paths.log_file.parent() != Some(paths.log_dir.as_path()) {
        warnings.push(ValidationWarning::new(
            "paths",
            "log_file",
            format!(
                "log file is not directly inside log_dir {}; its parent must already exist",
                paths.log_dir.display()
            ),
        ));
    }

    if paths.sendmail_link == paths.mail_client {
        warnings.push(ValidationWarning::new(
            "paths",
            "sendmail_link",
            "sendmail_link points at itself (same path as mail_client)",
        ));
    }

    if settings.packages.names.is_empty() {
        warnings.push(ValidationWarning::new(
            "packages",
            "names",
            "no packages listed; the mail client must already be installed",
        ));
    }

    for (item, value) in [
        ("group", &settings.accounts.group),
        ("user", &settings.accounts.user),
    ] {
        if value.trim().is_empty() {
            warnings.push(ValidationWarning::new("accounts", item, "name is empty"));
        }
    }

    warnings
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults_are_clean() {
        assert!(validate(&Settings::default()).is_empty());
    }

    #[test]
    fn relative_path_warns() {
        let mut settings = Settings::default();
        settings.paths.alert_script = PathBuf::from("bin/ssh-login-alert");
        let warnings = validate(&settings);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].item, "alert_script");
    }

    #[test]
    fn disabled_access_control_skips_its_paths() {
        let mut settings = Settings::default();
        settings.access_control.enabled = false;
        settings.access_control.boot_script = PathBuf::from("rc.local");
        assert!(validate(&settings).is_empty());
    }

    #[test]
    fn port_zero_warns() {
        let mut settings = Settings::default();
        settings.smtp.port = 0;
        assert_eq!(
            validate(&settings)[0].to_string(),
            "smtp [port]: port 0 is not a valid relay port"
        );
    }

    #[test]
    fn log_file_outside_log_dir_warns() {
        let mut settings = Settings::default();
        settings.paths.log_file = PathBuf::from("/var/log/msmtp.log");
        let warnings = validate(&settings);
        assert!(warnings.iter().any(|w| w.item == "log_file"));
    }

    #[test]
    fn self_referencing_link_warns() {
        let mut settings = Settings::default();
        settings.paths.sendmail_link = settings.paths.mail_client.clone();
        assert!(validate(&settings).iter().any(|w| w.item == "sendmail_link"));
    }

    #[test]
    fn empty_packages_and_accounts_warn() {
        let mut settings = Settings::default();
        settings.packages.names.clear();
        settings.accounts.group = " ".to_string();
        settings.accounts.user = String::new();
        let items: Vec<_> = validate(&settings).into_iter().map(|w| w.item).collect();
        assert_eq!(items, vec!["names", "group", "user"]);
    }
}
