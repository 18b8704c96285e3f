//! Owner and permission convergence shared by path-based resources.
use anyhow::Result;
use std::path::Path;

use crate::host::{HostEnvironment, OwnerIds, Ownership, PathFacts};
use crate::resources::error::ResourceError;

/// Describe how `facts` differ from the desired owner and mode, or `None`
/// when they already match.
///
/// `ids` is `None` while the desired owner does not exist on the host yet
/// (for example during a dry run before the group step has applied).
#[must_use]
pub fn drift(
    facts: &PathFacts,
    ids: Option<OwnerIds>,
    owner: &Ownership,
    mode: u32,
) -> Option<String> {
    let mut parts = Vec::new();
    if facts.mode != mode {
        parts.push(format!("mode {:04o}", facts.mode));
    }
    match ids {
        Some(ids) if facts.owned_by(ids) => {}
        Some(_) => parts.push(format!("owner {}:{}", facts.uid, facts.gid)),
        None => parts.push(format!("owner {owner} not yet created")),
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// Resolve `owner` to ids, failing with a filesystem error naming `path`.
///
/// # Errors
///
/// Returns [`ResourceError::Filesystem`] if the user or group is unknown.
pub fn resolve_ids(
    host: &dyn HostEnvironment,
    owner: &Ownership,
    path: &Path,
) -> Result<OwnerIds> {
    host.lookup_ids(owner)?.ok_or_else(|| {
        ResourceError::filesystem(path, format!("owner {owner} does not exist")).into()
    })
}

/// Bring the owner and mode of an existing `path` in line, touching only what
/// differs.  Ownership is changed first so the mode bits are not cleared by a
/// later `chown`.
///
/// # Errors
///
/// Returns [`ResourceError::Filesystem`] if the path vanished or a change
/// fails.
pub fn converge(host: &dyn HostEnvironment, path: &Path, ids: OwnerIds, mode: u32) -> Result<()> {
    let facts = host
        .path_facts(path)?
        .ok_or_else(|| ResourceError::filesystem(path, "No such file or directory"))?;
    if !facts.owned_by(ids) {
        host.set_owner(path, ids)?;
    }
    if facts.mode != mode {
        host.set_mode(path, mode)?;
    }
    Ok(())
}
