//! Typed error variants for resource operations.
//!
//! This module provides [`ResourceError`], the failure signals a convergence
//! step can raise.  Resource code returns these variants wrapped in
//! [`anyhow::Error`]; callers that care about the kind use
//! [`anyhow::Error::downcast_ref`].

use thiserror::Error;

/// Errors that arise from resource checks, apply, and remove operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The system group could not be created.
    #[error("failed to create group '{group}': {reason}")]
    GroupCreateFailed {
        /// Group name.
        group: String,
        /// Human-readable cause.
        reason: String,
    },

    /// The system user could not be created.
    #[error("failed to create user '{user}': {reason}")]
    UserCreateFailed {
        /// User name.
        user: String,
        /// Human-readable cause.
        reason: String,
    },

    /// A filesystem operation (mkdir, chown, chmod, symlink, remove) failed.
    #[error("filesystem error at {path}: {reason}")]
    Filesystem {
        /// Path the operation targeted.
        path: String,
        /// Human-readable cause.
        reason: String,
    },

    /// The package manager exited non-zero.
    #[error("package manager failed for '{package}' (exit {exit_code}): {stderr}")]
    PackageManager {
        /// Package being installed or removed.
        package: String,
        /// Exit code returned by the package manager.
        exit_code: i32,
        /// Captured standard error output.
        stderr: String,
    },

    /// Writing file content failed.
    #[error("failed to write {path}: {reason}")]
    Write {
        /// Path of the file being written.
        path: String,
        /// Human-readable cause.
        reason: String,
    },

    /// The access-control subsystem rejected a mode change.
    #[error("access-control change failed for '{profile}': {reason}")]
    AccessControl {
        /// Profile path.
        profile: String,
        /// Human-readable cause.
        reason: String,
    },

    /// A command invoked by a resource failed with a non-zero exit code.
    #[error("command '{program}' failed (exit {exit_code}): {stderr}")]
    ExecutionFailed {
        /// Name of the program that was invoked.
        program: String,
        /// Exit code returned by the process.
        exit_code: i32,
        /// Captured standard error output.
        stderr: String,
    },
}

impl ResourceError {
    /// Build a [`ResourceError::Filesystem`] from a path and any displayable cause.
    pub fn filesystem(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Self::Filesystem {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`ResourceError::Write`] from a path and any displayable cause.
    pub fn write(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn package_manager_display() {
        let e = ResourceError::PackageManager {
            package: "msmtp".to_string(),
            exit_code: 100,
            stderr: "Unable to locate package".to_string(),
        };
        assert!(e.to_string().contains("msmtp"));
        assert!(e.to_string().contains("exit 100"));
        assert!(e.to_string().contains("Unable to locate package"));
    }

    #[test]
    fn group_create_failed_display() {
        let e = ResourceError::GroupCreateFailed {
            group: "msmtp".to_string(),
            reason: "permission denied".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "failed to create group 'msmtp': permission denied"
        );
    }

    #[test]
    fn filesystem_helper_includes_path() {
        let e = ResourceError::filesystem(Path::new("/var/log/msmtp"), "parent missing");
        assert_eq!(
            e.to_string(),
            "filesystem error at /var/log/msmtp: parent missing"
        );
    }

    #[test]
    fn write_helper_includes_path() {
        let e = ResourceError::write(Path::new("/etc/msmtprc"), "disk full");
        assert!(e.to_string().contains("/etc/msmtprc"));
        assert!(e.to_string().contains("disk full"));
    }

    #[test]
    fn downcast_from_anyhow() {
        let err: anyhow::Error = ResourceError::AccessControl {
            profile: "/etc/apparmor.d/usr.bin.msmtp".to_string(),
            reason: "aa-complain exited 1".to_string(),
        }
        .into();
        assert!(matches!(
            err.downcast_ref::<ResourceError>(),
            Some(ResourceError::AccessControl { .. })
        ));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn resource_error_is_send_sync() {
        assert_send_sync::<ResourceError>();
    }
}
