//! Symlink resource.
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::error::ResourceError;
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::host::{HostEnvironment, PathKind};

/// A symlink at `link` that should point to `source`.
#[derive(Debug, Clone)]
pub struct SymlinkResource {
    /// What the symlink points to.
    pub source: PathBuf,
    /// Where the symlink lives.
    pub link: PathBuf,
    host: Arc<dyn HostEnvironment>,
}

impl SymlinkResource {
    /// Create a new symlink resource.
    #[must_use]
    pub const fn new(source: PathBuf, link: PathBuf, host: Arc<dyn HostEnvironment>) -> Self {
        Self { source, link, host }
    }
}

impl Applicable for SymlinkResource {
    fn description(&self) -> String {
        format!("{} -> {}", self.link.display(), self.source.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.host.create_symlink(&self.source, &self.link)?;
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        if !self.needs_removal()? {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        self.host.remove_path(&self.link)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for SymlinkResource {
    fn current_state(&self) -> Result<ResourceState> {
        if self.host.path_facts(&self.source)?.is_none() {
            return Ok(ResourceState::Invalid {
                reason: format!("{} is not installed", self.source.display()),
            });
        }

        match self.host.path_facts(&self.link)?.map(|f| f.kind) {
            None => Ok(ResourceState::Missing),
            Some(PathKind::Directory) => {
                Err(ResourceError::filesystem(&self.link, "is a real directory").into())
            }
            Some(PathKind::File) => Ok(ResourceState::Incorrect {
                current: "target is a regular file".to_string(),
            }),
            Some(PathKind::Symlink) => match self.host.read_link(&self.link)? {
                Some(existing) if existing == self.source => Ok(ResourceState::Correct),
                Some(existing) => Ok(ResourceState::Incorrect {
                    current: format!("points to {}", existing.display()),
                }),
                None => Ok(ResourceState::Missing),
            },
        }
    }

    /// Only a link that still points at `source` is ours to remove, even
    /// when `source` itself has already gone.
    fn needs_removal(&self) -> Result<bool> {
        Ok(self
            .host
            .read_link(&self.link)?
            .is_some_and(|existing| existing == self.source))
    }
}
