//! Package installation resource.
use anyhow::Result;
use std::sync::Arc;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::host::HostEnvironment;

/// A system package that should be installed.
#[derive(Debug, Clone)]
pub struct PackageResource {
    /// Package name.
    pub name: String,
    host: Arc<dyn HostEnvironment>,
}

impl PackageResource {
    /// Create a new package resource.
    #[must_use]
    pub fn new(name: impl Into<String>, host: Arc<dyn HostEnvironment>) -> Self {
        Self {
            name: name.into(),
            host,
        }
    }
}

impl Applicable for PackageResource {
    fn description(&self) -> String {
        format!("package {}", self.name)
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.host.install_package(&self.name)?;
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        if !self.host.package_installed(&self.name)? {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        self.host.remove_package(&self.name)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for PackageResource {
    fn current_state(&self) -> Result<ResourceState> {
        if self.host.package_installed(&self.name)? {
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
    use crate::host::memory::{MemoryHost, Operation};
    use crate::resources::error::ResourceError;

    fn resource(host: &Arc<MemoryHost>) -> PackageResource {
        PackageResource::new("msmtp", Arc::clone(host) as Arc<dyn HostEnvironment>)
    }

    #[test]
    fn installed_package_is_correct() {
        let host = Arc::new(MemoryHost::debian().with_installed_package("msmtp"));
        assert_eq!(resource(&host).current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn apply_installs() {
        let host = Arc::new(MemoryHost::debian());
        let package = resource(&host);
        assert!(package.needs_change().unwrap());
        assert_eq!(package.apply().unwrap(), ResourceChange::Applied);
        assert!(!package.needs_change().unwrap());
    }

    #[test]
    fn manager_exit_code_propagates() {
        let host = Arc::new(MemoryHost::debian());
        host.fail_on(Operation::InstallPackage);
        let err = resource(&host).apply().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResourceError>(),
            Some(ResourceError::PackageManager { exit_code: 100, .. })
        ));
    }

    #[test]
    fn remove_uninstalls_when_present() {
        let host = Arc::new(MemoryHost::debian().with_installed_package("msmtp"));
        let package = resource(&host);
        assert_eq!(package.remove().unwrap(), ResourceChange::Applied);
        assert_eq!(package.remove().unwrap(), ResourceChange::AlreadyCorrect);
    }
}
