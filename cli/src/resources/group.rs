//! System group resource.
use anyhow::Result;
use std::sync::Arc;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::host::HostEnvironment;

/// A system group that should exist.
#[derive(Debug, Clone)]
pub struct GroupResource {
    /// Group name.
    pub name: String,
    host: Arc<dyn HostEnvironment>,
}

impl GroupResource {
    /// Create a new group resource.
    #[must_use]
    pub fn new(name: impl Into<String>, host: Arc<dyn HostEnvironment>) -> Self {
        Self {
            name: name.into(),
            host,
        }
    }
}

impl Applicable for GroupResource {
    fn description(&self) -> String {
        format!("group {}", self.name)
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.host.create_group(&self.name)?;
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        if !self.host.group_exists(&self.name)? {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        self.host.delete_group(&self.name)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for GroupResource {
    fn current_state(&self) -> Result<ResourceState> {
        if self.host.group_exists(&self.name)? {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Missing)
        }
    }
}
