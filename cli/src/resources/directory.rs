//! Directory resource with owner and mode.
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::error::ResourceError;
use super::helpers::metadata;
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::host::{HostEnvironment, Ownership, PathKind};

/// A directory that should exist with the given owner and mode.
#[derive(Debug, Clone)]
pub struct DirectoryResource {
    /// Directory path.
    pub path: PathBuf,
    /// Desired owner.
    pub owner: Ownership,
    /// Desired permission bits, including setgid.
    pub mode: u32,
    host: Arc<dyn HostEnvironment>,
}

impl DirectoryResource {
    /// Create a new directory resource.
    #[must_use]
    pub const fn new(
        path: PathBuf,
        owner: Ownership,
        mode: u32,
        host: Arc<dyn HostEnvironment>,
    ) -> Self {
        Self {
            path,
            owner,
            mode,
            host,
        }
    }
}

impl Applicable for DirectoryResource {
    fn description(&self) -> String {
        format!(
            "directory {} ({:04o} {})",
            self.path.display(),
            self.mode,
            self.owner
        )
    }

    fn apply(&self) -> Result<ResourceChange> {
        let ids = metadata::resolve_ids(self.host.as_ref(), &self.owner, &self.path)?;
        if self.host.path_facts(&self.path)?.is_none() {
            self.host.create_dir(&self.path)?;
        }
        metadata::converge(self.host.as_ref(), &self.path, ids, self.mode)?;
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        if self.host.path_facts(&self.path)?.is_none() {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        self.host.remove_path(&self.path)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for DirectoryResource {
    fn current_state(&self) -> Result<ResourceState> {
        let Some(facts) = self.host.path_facts(&self.path)? else {
            return Ok(ResourceState::Missing);
        };
        if facts.kind != PathKind::Directory {
            return Err(
                ResourceError::filesystem(&self.path, "exists and is not a directory").into(),
            );
        }
        let ids = self.host.lookup_ids(&self.owner)?;
        Ok(
            match metadata::drift(&facts, ids, &self.owner, self.mode) {
                None => ResourceState::Correct,
                Some(current) => ResourceState::Incorrect { current },
            },
        )
    }
}
