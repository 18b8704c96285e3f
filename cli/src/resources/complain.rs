//! Access-control complain-mode resource.
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::host::HostEnvironment;

/// An AppArmor profile that should be loaded in complain mode.
///
/// There is no `remove`: switching a profile back to enforce mode is left to
/// the operator.
#[derive(Debug, Clone)]
pub struct ComplainModeResource {
    /// Profile file, passed to `aa-complain`.
    pub profile_path: PathBuf,
    /// Profile name as listed by `aa-status`.
    pub profile_name: String,
    host: Arc<dyn HostEnvironment>,
}

impl ComplainModeResource {
    /// Create a new complain-mode resource.
    #[must_use]
    pub fn new(
        profile_path: PathBuf,
        profile_name: impl Into<String>,
        host: Arc<dyn HostEnvironment>,
    ) -> Self {
        Self {
            profile_path,
            profile_name: profile_name.into(),
            host,
        }
    }
}

impl Applicable for ComplainModeResource {
    fn description(&self) -> String {
        format!("complain mode for {}", self.profile_name)
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.host.set_complain_mode(&self.profile_path)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for ComplainModeResource {
    fn current_state(&self) -> Result<ResourceState> {
        if !self.host.access_control_available() {
            return Ok(ResourceState::Invalid {
                reason: "access-control tooling not installed".to_string(),
            });
        }
        if self.host.path_facts(&self.profile_path)?.is_none() {
            return Ok(ResourceState::Invalid {
                reason: format!("profile {} not found", self.profile_path.display()),
            });
        }
        // `aa-status` refuses to report to non-root callers.
        if !self.host.is_privileged()? {
            return Ok(ResourceState::Invalid {
                reason: "complain-mode status unavailable without privileges".to_string(),
            });
        }
        if self.host.in_complain_mode(&self.profile_name)? {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::exec::Executor;
    use crate::host::memory::{MemoryHost, Operation};
    use crate::host::system::SystemHost;
    use crate::resources::error::ResourceError;
    use crate::resources::test_helpers::MockExecutor;

    fn resource(host: &Arc<MemoryHost>) -> ComplainModeResource {
        ComplainModeResource::new(
            PathBuf::from("/etc/apparmor.d/usr.bin.msmtp"),
            "/usr/bin/msmtp",
            Arc::clone(host) as Arc<dyn HostEnvironment>,
        )
    }

    #[test]
    fn not_applicable_without_tooling() {
        let host = Arc::new(
            MemoryHost::debian()
                .with_installed_package("msmtp")
                .without_access_control(),
        );
        assert!(matches!(
            resource(&host).current_state().unwrap(),
            ResourceState::Invalid { reason } if reason.contains("tooling")
        ));
    }

    #[test]
    fn not_applicable_without_profile() {
        let host = Arc::new(MemoryHost::debian());
        assert!(matches!(
            resource(&host).current_state().unwrap(),
            ResourceState::Invalid { reason } if reason.contains("not found")
        ));
    }

    #[test]
    fn not_applicable_without_privileges() {
        let host = Arc::new(
            MemoryHost::debian()
                .with_installed_package("msmtp")
                .unprivileged(),
        );
        assert!(matches!(
            resource(&host).current_state().unwrap(),
            ResourceState::Invalid { reason } if reason.contains("without privileges")
        ));
    }

    #[test]
    fn unprivileged_system_host_never_runs_aa_status() {
        let dir = tempfile::tempdir().unwrap();
        let profile = dir.path().join("usr.bin.msmtp");
        std::fs::write(&profile, "profile msmtp {}\n").unwrap();

        let mock = Arc::new(
            MockExecutor::with_exits(vec![(0, "1000\n"), (0, "1000\n")]).with_which(true),
        );
        let host = Arc::new(SystemHost::new(Arc::clone(&mock) as Arc<dyn Executor>));
        let complain = ComplainModeResource::new(profile, "/usr/bin/msmtp", host);

        assert!(matches!(
            complain.current_state().unwrap(),
            ResourceState::Invalid { .. }
        ));
        assert!(!complain.needs_change().unwrap());
        assert!(mock.calls().iter().all(|call| !call.starts_with("aa-status")));
    }

    #[test]
    fn apply_switches_mode_once() {
        let host = Arc::new(MemoryHost::debian().with_installed_package("msmtp"));
        let complain = resource(&host);
        assert_eq!(complain.current_state().unwrap(), ResourceState::Missing);
        complain.apply().unwrap();
        assert_eq!(complain.current_state().unwrap(), ResourceState::Correct);
        assert!(!complain.needs_change().unwrap());
    }

    #[test]
    fn rejection_is_access_control_error() {
        let host = Arc::new(MemoryHost::debian().with_installed_package("msmtp"));
        host.fail_on(Operation::SetComplainMode);
        let err = resource(&host).apply().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResourceError>(),
            Some(ResourceError::AccessControl { .. })
        ));
    }

    #[test]
    fn remove_is_unsupported() {
        let host = Arc::new(MemoryHost::debian());
        assert!(resource(&host).remove().is_err());
    }
}
