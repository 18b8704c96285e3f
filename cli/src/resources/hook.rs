//! Hook-script marker line resource.
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use super::error::ResourceError;
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::host::{HostEnvironment, OwnerIds, PathKind};

/// A single marker line that should be present in a shell script.
///
/// When the script does not exist it is created from `header` (if any)
/// followed by the marker, with `create_mode` and owned by root.  When it
/// exists, the marker is added while every other line is preserved, and the
/// file keeps its owner and mode.
#[derive(Debug, Clone)]
pub struct HookLineResource {
    /// Script path.
    pub path: PathBuf,
    /// Exact line to ensure.
    pub marker: String,
    /// First line written when the script has to be created.
    pub header: Option<String>,
    /// Permission bits used when the script has to be created.
    pub create_mode: u32,
    host: Arc<dyn HostEnvironment>,
}

impl HookLineResource {
    /// Create a new hook line resource.
    #[must_use]
    pub fn new(
        path: PathBuf,
        marker: impl Into<String>,
        header: Option<String>,
        create_mode: u32,
        host: Arc<dyn HostEnvironment>,
    ) -> Self {
        Self {
            path,
            marker: marker.into(),
            header,
            create_mode,
            host,
        }
    }

    fn initial_content(&self) -> String {
        self.header.as_ref().map_or_else(
            || format!("{}\n", self.marker),
            |header| format!("{header}\n{}\n", self.marker),
        )
    }

    /// Whether `content` is nothing but what this resource writes on creation,
    /// minus the marker.
    fn only_header_left(&self, content: &str) -> bool {
        let mut lines = content.lines().filter(|l| !l.trim().is_empty());
        match (&self.header, lines.next()) {
            (_, None) => true,
            (Some(header), Some(first)) => first.trim() == header && lines.next().is_none(),
            (None, Some(_)) => false,
        }
    }

    /// Owner and mode of the existing script, so rewriting it preserves both.
    fn existing_metadata(&self) -> Result<(OwnerIds, u32)> {
        let facts = self
            .host
            .path_facts(&self.path)?
            .ok_or_else(|| ResourceError::write(&self.path, "script vanished"))?;
        Ok((
            OwnerIds {
                uid: facts.uid,
                gid: facts.gid,
            },
            facts.mode,
        ))
    }
}

/// Insert `marker` as a line of `existing`.
///
/// If the last non-blank line is `exit 0` the marker goes immediately before
/// it, otherwise it is appended.  Output always ends with a newline.
#[must_use]
pub fn insert_marker(existing: &str, marker: &str) -> String {
    let mut lines: Vec<&str> = existing.lines().collect();
    let exit_line = lines
        .iter()
        .rposition(|l| !l.trim().is_empty())
        .filter(|&i| lines.get(i).is_some_and(|l| l.trim() == "exit 0"));
    match exit_line {
        Some(i) => lines.insert(i, marker),
        None => lines.push(marker),
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Remove every line of `existing` equal to `marker` (ignoring surrounding
/// whitespace).
#[must_use]
pub fn strip_marker(existing: &str, marker: &str) -> String {
    let kept: Vec<&str> = existing.lines().filter(|l| l.trim() != marker).collect();
    if kept.is_empty() {
        return String::new();
    }
    let mut out = kept.join("\n");
    out.push('\n');
    out
}

fn has_marker(content: &str, marker: &str) -> bool {
    content.lines().any(|l| l.trim() == marker)
}

impl Applicable for HookLineResource {
    fn description(&self) -> String {
        format!("hook line in {}", self.path.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        match self.host.read_file(&self.path)? {
            None => {
                let root = OwnerIds { uid: 0, gid: 0 };
                self.host.write_file_atomic(
                    &self.path,
                    &self.initial_content(),
                    self.create_mode,
                    root,
                )?;
            }
            Some(existing) => {
                if has_marker(&existing, &self.marker) {
                    return Ok(ResourceChange::AlreadyCorrect);
                }
                let (ids, mode) = self.existing_metadata()?;
                self.host.write_file_atomic(
                    &self.path,
                    &insert_marker(&existing, &self.marker),
                    mode,
                    ids,
                )?;
            }
        }
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        let Some(existing) = self.host.read_file(&self.path)? else {
            return Ok(ResourceChange::AlreadyCorrect);
        };
        if !has_marker(&existing, &self.marker) {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        let stripped = strip_marker(&existing, &self.marker);
        if self.only_header_left(&stripped) {
            self.host.remove_path(&self.path)?;
        } else {
            let (ids, mode) = self.existing_metadata()?;
            self.host
                .write_file_atomic(&self.path, &stripped, mode, ids)?;
        }
        Ok(ResourceChange::Applied)
    }
}

impl Resource for HookLineResource {
    fn current_state(&self) -> Result<ResourceState> {
        if self
            .host
            .path_facts(&self.path)?
            .is_some_and(|f| f.kind == PathKind::Directory)
        {
            return Err(ResourceError::write(&self.path, "is a directory").into());
        }
        match self.host.read_file(&self.path)? {
            None => Ok(ResourceState::Missing),
            Some(content) if has_marker(&content, &self.marker) => Ok(ResourceState::Correct),
            Some(_) => Ok(ResourceState::Incorrect {
                current: "marker line absent".to_string(),
            }),
        }
    }

    fn needs_removal(&self) -> Result<bool> {
        Ok(self.current_state()? == ResourceState::Correct)
    }
}
