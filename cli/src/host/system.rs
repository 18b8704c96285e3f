//! Real host backed by system commands and [`std::fs`].
//!
//! Account tables are queried with `getent` and changed with the shadow
//! utilities, packages go through `dpkg-query`/`apt-get`, and the
//! access-control subsystem through `aa-status`/`aa-complain`.
use anyhow::{Context as _, Result};
use std::os::unix::fs::{MetadataExt as _, PermissionsExt as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{HostEnvironment, OwnerIds, Ownership, PathFacts, PathKind};
use crate::exec::{ExecResult, Executor};
use crate::resources::error::ResourceError;
use crate::resources::helpers::fs::{atomic_write, remove_any};

/// Exit status `getent` uses for "key not found".
const GETENT_NOT_FOUND: i32 = 2;

/// Login shell assigned to the system user.
const NOLOGIN_SHELL: &str = "/usr/sbin/nologin";

/// Host implementation that mutates the real machine.
#[derive(Debug, Clone)]
pub struct SystemHost {
    executor: Arc<dyn Executor>,
}

impl SystemHost {
    /// Create a host that runs commands through `executor`.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }

    /// Run `getent <database> <key>` and return the matching line, if any.
    fn getent(&self, database: &str, key: &str) -> Result<Option<String>> {
        let result = self.executor.run_unchecked("getent", &[database, key])?;
        match result.code {
            Some(0) => Ok(Some(result.stdout.trim().to_string())),
            Some(GETENT_NOT_FOUND) => Ok(None),
            _ => Err(exec_failure("getent", &result).into()),
        }
    }
}

fn exec_failure(program: &str, result: &ExecResult) -> ResourceError {
    ResourceError::ExecutionFailed {
        program: program.to_string(),
        exit_code: result.code.unwrap_or(-1),
        stderr: result.stderr.trim().to_string(),
    }
}

fn failure_reason(program: &str, result: &ExecResult) -> String {
    format!(
        "{program} exited {}: {}",
        result.code.unwrap_or(-1),
        result.stderr.trim()
    )
}

/// Extract the numeric id (third field) from a `getent passwd|group` line.
pub(crate) fn parse_getent_id(line: &str) -> Option<u32> {
    line.split(':').nth(2)?.trim().parse().ok()
}

/// Whether `dpkg-query -W -f='${Status}'` output describes an installed package.
pub(crate) fn dpkg_status_installed(status: &str) -> bool {
    status.trim() == "install ok installed"
}

/// Collect the profile names listed under the "profiles are in complain
/// mode" heading of `aa-status` output.
pub(crate) fn parse_complain_profiles(status: &str) -> Vec<String> {
    let mut in_section = false;
    let mut profiles = Vec::new();
    for line in status.lines() {
        if !line.starts_with(char::is_whitespace) {
            in_section = line.contains("profile") && line.contains("in complain mode");
            continue;
        }
        if in_section {
            let name = line.trim();
            if !name.is_empty() {
                profiles.push(name.to_string());
            }
        }
    }
    profiles
}

/// Change ownership only when it differs, so unprivileged callers can still
/// write files they already own.
fn chown_if_needed(path: &Path, ids: OwnerIds) -> Result<()> {
    let meta = std::fs::symlink_metadata(path)
        .with_context(|| format!("reading metadata: {}", path.display()))?;
    if meta.uid() != ids.uid || meta.gid() != ids.gid {
        std::os::unix::fs::chown(path, Some(ids.uid), Some(ids.gid))
            .with_context(|| format!("chown {}:{} {}", ids.uid, ids.gid, path.display()))?;
    }
    Ok(())
}

impl HostEnvironment for SystemHost {
    fn is_privileged(&self) -> Result<bool> {
        let result = self.executor.run("id", &["-u"])?;
        Ok(result.stdout.trim() == "0")
    }

    fn group_exists(&self, name: &str) -> Result<bool> {
        Ok(self.getent("group", name)?.is_some())
    }

    fn create_group(&self, name: &str) -> Result<()> {
        let result = self.executor.run_unchecked("groupadd", &["--system", name])?;
        if !result.success {
            return Err(ResourceError::GroupCreateFailed {
                group: name.to_string(),
                reason: failure_reason("groupadd", &result),
            }
            .into());
        }
        Ok(())
    }

    fn delete_group(&self, name: &str) -> Result<()> {
        let result = self.executor.run_unchecked("groupdel", &[name])?;
        if !result.success {
            return Err(exec_failure("groupdel", &result).into());
        }
        Ok(())
    }

    fn user_exists(&self, name: &str) -> Result<bool> {
        Ok(self.getent("passwd", name)?.is_some())
    }

    fn create_system_user(&self, name: &str, group: &str) -> Result<()> {
        let result = self.executor.run_unchecked(
            "useradd",
            &[
                "--system",
                "--no-create-home",
                "--shell",
                NOLOGIN_SHELL,
                "--gid",
                group,
                name,
            ],
        )?;
        if !result.success {
            return Err(ResourceError::UserCreateFailed {
                user: name.to_string(),
                reason: failure_reason("useradd", &result),
            }
            .into());
        }
        Ok(())
    }

    fn delete_user(&self, name: &str) -> Result<()> {
        let result = self.executor.run_unchecked("userdel", &[name])?;
        if !result.success {
            return Err(exec_failure("userdel", &result).into());
        }
        Ok(())
    }

    fn lookup_ids(&self, owner: &Ownership) -> Result<Option<OwnerIds>> {
        let Some(user) = self.getent("passwd", &owner.user)? else {
            return Ok(None);
        };
        let Some(group) = self.getent("group", &owner.group)? else {
            return Ok(None);
        };
        let uid = parse_getent_id(&user)
            .with_context(|| format!("malformed passwd entry for {}", owner.user))?;
        let gid = parse_getent_id(&group)
            .with_context(|| format!("malformed group entry for {}", owner.group))?;
        Ok(Some(OwnerIds { uid, gid }))
    }

    fn package_installed(&self, name: &str) -> Result<bool> {
        let result = self
            .executor
            .run_unchecked("dpkg-query", &["-W", "-f=${Status}", name])?;
        Ok(result.success && dpkg_status_installed(&result.stdout))
    }

    fn install_package(&self, name: &str) -> Result<()> {
        let result = self.executor.run_unchecked_with_env(
            "apt-get",
            &["install", "-y", "--no-install-recommends", name],
            &[("DEBIAN_FRONTEND", "noninteractive")],
        )?;
        if !result.success {
            return Err(ResourceError::PackageManager {
                package: name.to_string(),
                exit_code: result.code.unwrap_or(-1),
                stderr: result.stderr.trim().to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn remove_package(&self, name: &str) -> Result<()> {
        let result = self.executor.run_unchecked_with_env(
            "apt-get",
            &["remove", "-y", name],
            &[("DEBIAN_FRONTEND", "noninteractive")],
        )?;
        if !result.success {
            return Err(ResourceError::PackageManager {
                package: name.to_string(),
                exit_code: result.code.unwrap_or(-1),
                stderr: result.stderr.trim().to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn access_control_available(&self) -> bool {
        self.executor.which("aa-status") && self.executor.which("aa-complain")
    }

    fn in_complain_mode(&self, profile_name: &str) -> Result<bool> {
        let result = self.executor.run_unchecked("aa-status", &[])?;
        if !result.success {
            return Err(exec_failure("aa-status", &result).into());
        }
        Ok(parse_complain_profiles(&result.stdout)
            .iter()
            .any(|p| p == profile_name))
    }

    fn set_complain_mode(&self, profile_path: &Path) -> Result<()> {
        let path = profile_path.to_string_lossy();
        let result = self.executor.run_unchecked("aa-complain", &[&path])?;
        if !result.success {
            return Err(ResourceError::AccessControl {
                profile: path.to_string(),
                reason: failure_reason("aa-complain", &result),
            }
            .into());
        }
        Ok(())
    }

    fn path_facts(&self, path: &Path) -> Result<Option<PathFacts>> {
        let meta = match std::fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading metadata: {}", path.display()));
            }
        };
        let kind = if meta.file_type().is_symlink() {
            PathKind::Symlink
        } else if meta.is_dir() {
            PathKind::Directory
        } else {
            PathKind::File
        };
        Ok(Some(PathFacts {
            kind,
            mode: meta.permissions().mode() & 0o7777,
            uid: meta.uid(),
            gid: meta.gid(),
        }))
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).map_err(|e| ResourceError::filesystem(path, e))?;
        Ok(())
    }

    fn create_empty_file(&self, path: &Path) -> Result<()> {
        std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|e| ResourceError::filesystem(path, e))?;
        Ok(())
    }

    fn set_owner(&self, path: &Path, ids: OwnerIds) -> Result<()> {
        chown_if_needed(path, ids).map_err(|e| ResourceError::filesystem(path, format!("{e:#}")))?;
        Ok(())
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
            .map_err(|e| ResourceError::filesystem(path, e))?;
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Option<String>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    fn write_file_atomic(
        &self,
        path: &Path,
        contents: &str,
        mode: u32,
        ids: OwnerIds,
    ) -> Result<()> {
        atomic_write(path, contents.as_bytes(), |staged| {
            std::fs::set_permissions(staged, std::fs::Permissions::from_mode(mode))
                .with_context(|| format!("chmod {mode:o} {}", staged.display()))?;
            chown_if_needed(staged, ids)
        })
        .map_err(|e| ResourceError::write(path, format!("{e:#}")))?;
        Ok(())
    }

    fn read_link(&self, path: &Path) -> Result<Option<PathBuf>> {
        match std::fs::symlink_metadata(path) {
            Ok(meta) if meta.file_type().is_symlink() => std::fs::read_link(path)
                .map(Some)
                .with_context(|| format!("reading link: {}", path.display())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading metadata: {}", path.display())),
        }
    }

    fn create_symlink(&self, source: &Path, link: &Path) -> Result<()> {
        remove_any(link).map_err(|e| ResourceError::filesystem(link, format!("{e:#}")))?;
        std::os::unix::fs::symlink(source, link).map_err(|e| ResourceError::filesystem(link, e))?;
        Ok(())
    }

    fn remove_path(&self, path: &Path) -> Result<()> {
        remove_any(path).map_err(|e| ResourceError::filesystem(path, format!("{e:#}")))?;
        Ok(())
    }
}
