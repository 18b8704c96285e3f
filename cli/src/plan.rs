//! Desired state of a provisioned host.
//!
//! A [`ProvisionPlan`] is derived once from [`Settings`] and validated
//! [`Credentials`] and never changes afterwards.  The helper functions that
//! build individual specs are shared with the deprovision sequence, which
//! needs the same paths and marker lines but no credentials.
use std::fmt;
use std::path::PathBuf;

use crate::config::Settings;
use crate::credentials::Credentials;
use crate::host::Ownership;
use crate::render;
use crate::resources::RewritePolicy;

/// Mode of the mail log directory (setgid, group-writable).
pub const LOG_DIR_MODE: u32 = 0o2775;
/// Mode of the mail log file.
pub const LOG_FILE_MODE: u32 = 0o664;
/// Mode of the rendered mail client configuration.
pub const CONFIG_FILE_MODE: u32 = 0o644;
/// Mode of the generated alert script.
pub const ALERT_SCRIPT_MODE: u32 = 0o755;
/// Mode of the boot script when it has to be created.
pub const BOOT_SCRIPT_MODE: u32 = 0o755;
/// Mode of the login hook when it has to be created.
pub const LOGIN_HOOK_MODE: u32 = 0o644;
/// First line of a boot script created from scratch.
pub const BOOT_SCRIPT_HEADER: &str = "#!/bin/sh -e";

/// A directory with owner and mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirSpec {
    /// Directory path.
    pub path: PathBuf,
    /// Desired owner.
    pub owner: Ownership,
    /// Desired mode.
    pub mode: u32,
}

/// An empty-on-creation file with owner and mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    /// File path.
    pub path: PathBuf,
    /// Desired owner.
    pub owner: Ownership,
    /// Desired mode.
    pub mode: u32,
}

/// A symlink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    /// What the link points to.
    pub source: PathBuf,
    /// Where the link lives.
    pub link: PathBuf,
}

/// A marker line that must be present in a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookSpec {
    /// Script path.
    pub path: PathBuf,
    /// Exact line to ensure.
    pub marker: String,
    /// First line when the script is created.
    pub header: Option<String>,
    /// Mode when the script is created.
    pub create_mode: u32,
}

/// A file whose whole content is generated.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedSpec {
    /// Destination path.
    pub path: PathBuf,
    /// Full content.
    pub content: String,
    /// Desired owner.
    pub owner: Ownership,
    /// Desired mode.
    pub mode: u32,
    /// When to rewrite.
    pub policy: RewritePolicy,
}

impl fmt::Debug for RenderedSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedSpec")
            .field("path", &self.path)
            .field("content", &format_args!("<{} bytes>", self.content.len()))
            .field("owner", &self.owner)
            .field("mode", &format_args!("{:04o}", self.mode))
            .field("policy", &self.policy)
            .finish()
    }
}

/// Access-control relaxation for the mail client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessControlSpec {
    /// Profile file passed to the complain-mode tool.
    pub profile_path: PathBuf,
    /// Profile name as reported by the status tool.
    pub profile_name: String,
    /// Boot-time re-application.
    pub boot_hook: HookSpec,
}

/// Everything a provision run converges, in declaration form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionPlan {
    /// System group.
    pub group: String,
    /// System user.
    pub user: String,
    /// Mail log directory.
    pub log_dir: DirSpec,
    /// Mail log file.
    pub log_file: FileSpec,
    /// Packages, in install order.
    pub packages: Vec<String>,
    /// Access-control relaxation; `None` when disabled.
    pub access_control: Option<AccessControlSpec>,
    /// Rendered mail client configuration.
    pub config_file: RenderedSpec,
    /// Mail-submission shim.
    pub sendmail: LinkSpec,
    /// Generated alert script.
    pub alert_script: RenderedSpec,
    /// Login hook.
    pub login_hook: HookSpec,
}

impl ProvisionPlan {
    /// Derive the plan.
    ///
    /// Access-control steps are included only when both the settings and
    /// `access_control` allow it.
    #[must_use]
    pub fn new(settings: &Settings, credentials: &Credentials, access_control: bool) -> Self {
        let paths = &settings.paths;
        let log_owner = Ownership::new("root", settings.accounts.group.clone());
        Self {
            group: settings.accounts.group.clone(),
            user: settings.accounts.user.clone(),
            log_dir: DirSpec {
                path: paths.log_dir.clone(),
                owner: log_owner.clone(),
                mode: LOG_DIR_MODE,
            },
            log_file: FileSpec {
                path: paths.log_file.clone(),
                owner: log_owner,
                mode: LOG_FILE_MODE,
            },
            packages: settings.packages.names.clone(),
            access_control: (access_control && settings.access_control.enabled).then(|| {
                AccessControlSpec {
                    profile_path: settings.access_control.profile_path.clone(),
                    profile_name: settings.access_control.profile_name.clone(),
                    boot_hook: boot_hook(settings),
                }
            }),
            config_file: RenderedSpec {
                path: paths.config_file.clone(),
                content: render::msmtprc(&settings.smtp, &paths.log_file, credentials),
                owner: Ownership::root(),
                mode: CONFIG_FILE_MODE,
                policy: RewritePolicy::Always,
            },
            sendmail: sendmail_link(settings),
            alert_script: RenderedSpec {
                path: paths.alert_script.clone(),
                content: render::alert_script(&paths.sendmail_link, &credentials.recipient),
                owner: Ownership::root(),
                mode: ALERT_SCRIPT_MODE,
                policy: RewritePolicy::WhenChanged,
            },
            login_hook: login_hook(settings),
        }
    }
}

/// The mail-submission shim.
#[must_use]
pub fn sendmail_link(settings: &Settings) -> LinkSpec {
    LinkSpec {
        source: settings.paths.mail_client.clone(),
        link: settings.paths.sendmail_link.clone(),
    }
}

/// The login hook marker.
#[must_use]
pub fn login_hook(settings: &Settings) -> HookSpec {
    HookSpec {
        path: settings.paths.login_hook.clone(),
        marker: render::login_hook_line(&settings.paths.alert_script),
        header: None,
        create_mode: LOGIN_HOOK_MODE,
    }
}

/// The boot-script marker that re-applies complain mode.
#[must_use]
pub fn boot_hook(settings: &Settings) -> HookSpec {
    HookSpec {
        path: settings.access_control.boot_script.clone(),
        marker: render::boot_complain_line(&settings.access_control.profile_path),
        header: Some(BOOT_SCRIPT_HEADER.to_string()),
        create_mode: BOOT_SCRIPT_MODE,
    }
}
