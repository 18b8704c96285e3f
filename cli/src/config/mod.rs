//! Operator settings loaded from TOML.
//!
//! Every section and field has a built-in default, so the settings file is
//! optional.  Unknown keys are rejected to catch typos early.
pub mod toml_loader;
pub mod validation;

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Default location of the settings file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ssh-alert/config.toml";

/// All operator-tunable settings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Outbound relay.
    pub smtp: SmtpSettings,
    /// System accounts.
    pub accounts: AccountSettings,
    /// Packages to install.
    pub packages: PackageSettings,
    /// Managed paths.
    pub paths: PathSettings,
    /// Access-control relaxation.
    pub access_control: AccessControlSettings,
}

impl Settings {
    /// Load settings from `path`, falling back to defaults if it is absent.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        toml_loader::load_config(path)
    }
}

/// `[smtp]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SmtpSettings {
    /// Relay host name.
    pub host: String,
    /// Relay submission port.
    pub port: u16,
    /// Account name used in the rendered config.
    pub account: String,
    /// Whether to use TLS.
    pub tls: bool,
    /// CA bundle for TLS verification.
    pub tls_trust_file: PathBuf,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            account: "gmail".to_string(),
            tls: true,
            tls_trust_file: PathBuf::from("/etc/ssl/certs/ca-certificates.crt"),
        }
    }
}

/// `[accounts]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AccountSettings {
    /// System group owning the mail log.
    pub group: String,
    /// System user created for the mail client.
    pub user: String,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            group: "msmtp".to_string(),
            user: "msmtp".to_string(),
        }
    }
}

/// `[packages]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PackageSettings {
    /// Package names, installed in order.
    pub names: Vec<String>,
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            names: vec!["msmtp".to_string()],
        }
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PathSettings {
    /// Rendered mail client configuration.
    pub config_file: PathBuf,
    /// Mail log directory.
    pub log_dir: PathBuf,
    /// Mail log file.
    pub log_file: PathBuf,
    /// Installed mail client binary.
    pub mail_client: PathBuf,
    /// Local mail-submission command, redirected to the mail client.
    pub sendmail_link: PathBuf,
    /// Generated alert script.
    pub alert_script: PathBuf,
    /// Profile-loaded login hook.
    pub login_hook: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("/etc/msmtprc"),
            log_dir: PathBuf::from("/var/log/msmtp"),
            log_file: PathBuf::from("/var/log/msmtp/msmtp.log"),
            mail_client: PathBuf::from("/usr/bin/msmtp"),
            sendmail_link: PathBuf::from("/usr/sbin/sendmail"),
            alert_script: PathBuf::from("/usr/local/bin/ssh-login-alert"),
            login_hook: PathBuf::from("/etc/profile.d/ssh-login-alert.sh"),
        }
    }
}

/// `[access_control]` section.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AccessControlSettings {
    /// Whether to relax the mail client's profile at all.
    pub enabled: bool,
    /// Profile file passed to `aa-complain`.
    pub profile_path: PathBuf,
    /// Profile name as listed by `aa-status`.
    pub profile_name: String,
    /// Startup script that re-applies complain mode at boot.
    pub boot_script: PathBuf,
}

impl Default for AccessControlSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            profile_path: PathBuf::from("/etc/apparmor.d/usr.bin.msmtp"),
            profile_name: "/usr/bin/msmtp".to_string(),
            boot_script: PathBuf::from("/etc/rc.local"),
        }
    }
}
