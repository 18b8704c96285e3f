//! Rendered file resource: full content written atomically.
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::error::ResourceError;
use super::helpers::metadata;
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::host::{HostEnvironment, Ownership, PathKind};

/// When a [`RenderedFileResource`] is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewritePolicy {
    /// Rewrite on every run, whatever is on disk.
    Always,
    /// Rewrite only when content, owner, or mode differ.
    WhenChanged,
}

/// A file whose entire content is generated.
///
/// The content is staged and renamed into place with its final owner and
/// mode already set, so readers never see a partial or wrongly-permissioned
/// file.  The content may carry credentials and is left out of `Debug`.
#[derive(Clone)]
pub struct RenderedFileResource {
    /// Destination path.
    pub path: PathBuf,
    /// Full file content.
    content: String,
    /// Desired owner.
    pub owner: Ownership,
    /// Desired permission bits.
    pub mode: u32,
    /// Rewrite policy.
    pub policy: RewritePolicy,
    host: Arc<dyn HostEnvironment>,
}

impl RenderedFileResource {
    /// Create a new rendered file resource.
    #[must_use]
    pub const fn new(
        path: PathBuf,
        content: String,
        owner: Ownership,
        mode: u32,
        policy: RewritePolicy,
        host: Arc<dyn HostEnvironment>,
    ) -> Self {
        Self {
            path,
            content,
            owner,
            mode,
            policy,
            host,
        }
    }
}

impl std::fmt::Debug for RenderedFileResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedFileResource")
            .field("path", &self.path)
            .field("content", &format_args!("<{} bytes>", self.content.len()))
            .field("owner", &self.owner)
            .field("mode", &format_args!("{:04o}", self.mode))
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Applicable for RenderedFileResource {
    fn description(&self) -> String {
        self.path.display().to_string()
    }

    fn apply(&self) -> Result<ResourceChange> {
        let ids = metadata::resolve_ids(self.host.as_ref(), &self.owner, &self.path)?;
        self.host
            .write_file_atomic(&self.path, &self.content, self.mode, ids)?;
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

impl Resource for RenderedFileResource {
    fn current_state(&self) -> Result<ResourceState> {
        let Some(facts) = self.host.path_facts(&self.path)? else {
            return Ok(ResourceState::Missing);
        };
        if facts.kind == PathKind::Directory {
            return Err(ResourceError::write(&self.path, "is a directory").into());
        }
        if facts.kind == PathKind::Symlink {
            return Ok(ResourceState::Incorrect {
                current: "target is a symlink".to_string(),
            });
        }
        if self.host.read_file(&self.path)?.as_deref() != Some(self.content.as_str()) {
            return Ok(ResourceState::Incorrect {
                current: "content differs".to_string(),
            });
        }
        let ids = self.host.lookup_ids(&self.owner)?;
        Ok(
            match metadata::drift(&facts, ids, &self.owner, self.mode) {
                None => ResourceState::Correct,
                Some(current) => ResourceState::Incorrect { current },
            },
        )
    }

    fn needs_change(&self) -> Result<bool> {
        Ok(match self.current_state()? {
            ResourceState::Invalid { .. } => false,
            ResourceState::Correct => self.policy == RewritePolicy::Always,
            ResourceState::Missing | ResourceState::Incorrect { .. } => true,
        })
    }
}
