//! System user resource.
use anyhow::Result;
use std::sync::Arc;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::host::HostEnvironment;

/// A login-less system user whose primary group is `group`.
#[derive(Debug, Clone)]
pub struct SystemUserResource {
    /// User name.
    pub name: String,
    /// Primary group name.
    pub group: String,
    host: Arc<dyn HostEnvironment>,
}

impl SystemUserResource {
    /// Create a new system user resource.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        group: impl Into<String>,
        host: Arc<dyn HostEnvironment>,
    ) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            host,
        }
    }
}

impl Applicable for SystemUserResource {
    fn description(&self) -> String {
        format!("system user {}", self.name)
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.host.create_system_user(&self.name, &self.group)?;
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        if !self.host.user_exists(&self.name)? {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        self.host.delete_user(&self.name)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for SystemUserResource {
    fn current_state(&self) -> Result<ResourceState> {
        if self.host.user_exists(&self.name)? {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }
}
