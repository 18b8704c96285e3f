//! Host state access.
//!
//! Every convergence step observes and mutates the machine exclusively
//! through [`HostEnvironment`].  Production code uses
//! [`system::SystemHost`]; tests and rehearsals use the in-memory
//! [`memory::MemoryHost`].
//!
//! Facts returned here are never cached: each call re-queries the host,
//! because earlier steps mutate what later steps observe.
pub mod memory;
pub mod system;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Kind of filesystem entry, observed without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link (the link itself, not its target).
    Symlink,
}

/// Observed state of one filesystem path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathFacts {
    /// Entry kind.
    pub kind: PathKind,
    /// Permission bits including setuid/setgid/sticky (`mode & 0o7777`).
    pub mode: u32,
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
}

impl PathFacts {
    /// Whether the entry has the given ids.
    #[must_use]
    pub const fn owned_by(&self, ids: OwnerIds) -> bool {
        self.uid == ids.uid && self.gid == ids.gid
    }
}

/// Desired owner of a path, by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    /// User name.
    pub user: String,
    /// Group name.
    pub group: String,
}

impl Ownership {
    /// Build an ownership from user and group names.
    #[must_use]
    pub fn new(user: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            group: group.into(),
        }
    }

    /// `root:root`.
    #[must_use]
    pub fn root() -> Self {
        Self::new("root", "root")
    }
}

impl std::fmt::Display for Ownership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.user, self.group)
    }
}

/// Numeric ids an [`Ownership`] resolves to on a particular host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerIds {
    /// User id.
    pub uid: u32,
    /// Group id.
    pub gid: u32,
}

/// Capability interface over the host subsystems the provisioner touches:
/// the account tables, the package database, the access-control subsystem,
/// and the filesystem.
///
/// Mutating methods return [`ResourceError`](crate::resources::error::ResourceError)
/// values wrapped in [`anyhow::Error`] so the provisioner can report the
/// failure kind.
pub trait HostEnvironment: Send + Sync + std::fmt::Debug {
    /// Whether the current process may mutate system state (effective uid 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the privilege level cannot be determined.
    fn is_privileged(&self) -> Result<bool>;

    /// Whether a group with this name exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the group database cannot be queried.
    fn group_exists(&self, name: &str) -> Result<bool>;

    /// Create a system group.
    ///
    /// # Errors
    ///
    /// Returns `GroupCreateFailed` if the group cannot be created.
    fn create_group(&self, name: &str) -> Result<()>;

    /// Delete a group.
    ///
    /// # Errors
    ///
    /// Returns an error if the group cannot be deleted.
    fn delete_group(&self, name: &str) -> Result<()>;

    /// Whether a user with this name exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the user database cannot be queried.
    fn user_exists(&self, name: &str) -> Result<bool>;

    /// Create a login-less system user whose primary group is `group`.
    ///
    /// # Errors
    ///
    /// Returns `UserCreateFailed` if the user cannot be created.
    fn create_system_user(&self, name: &str, group: &str) -> Result<()>;

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the user cannot be deleted.
    fn delete_user(&self, name: &str) -> Result<()>;

    /// Resolve user and group names to ids, or `None` if either is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the account databases cannot be queried.
    fn lookup_ids(&self, owner: &Ownership) -> Result<Option<OwnerIds>>;

    /// Whether the package is installed according to the package database.
    ///
    /// # Errors
    ///
    /// Returns an error if the package database cannot be queried.
    fn package_installed(&self, name: &str) -> Result<bool>;

    /// Install a package.
    ///
    /// # Errors
    ///
    /// Returns `PackageManager` with the manager's exit code on failure.
    fn install_package(&self, name: &str) -> Result<()>;

    /// Remove a package.
    ///
    /// # Errors
    ///
    /// Returns `PackageManager` with the manager's exit code on failure.
    fn remove_package(&self, name: &str) -> Result<()>;

    /// Whether the access-control tooling is present on this host.
    fn access_control_available(&self) -> bool;

    /// Whether the named profile is currently loaded in complain mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the access-control status cannot be read.
    fn in_complain_mode(&self, profile_name: &str) -> Result<bool>;

    /// Switch the profile at `profile_path` to complain mode.
    ///
    /// # Errors
    ///
    /// Returns `AccessControl` if the mode change is rejected.
    fn set_complain_mode(&self, profile_path: &Path) -> Result<()>;

    /// Observe `path` without following symlinks; `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the path exists but cannot be inspected.
    fn path_facts(&self, path: &Path) -> Result<Option<PathFacts>>;

    /// Create a directory and any missing ancestors.
    ///
    /// # Errors
    ///
    /// Returns `Filesystem` if the directory cannot be created.
    fn create_dir(&self, path: &Path) -> Result<()>;

    /// Create an empty regular file; the parent directory must exist.
    ///
    /// # Errors
    ///
    /// Returns `Filesystem` if the file cannot be created.
    fn create_empty_file(&self, path: &Path) -> Result<()>;

    /// Change the owner of `path`.
    ///
    /// # Errors
    ///
    /// Returns `Filesystem` if ownership cannot be changed.
    fn set_owner(&self, path: &Path, ids: OwnerIds) -> Result<()>;

    /// Change the permission bits of `path`.
    ///
    /// # Errors
    ///
    /// Returns `Filesystem` if the mode cannot be changed.
    fn set_mode(&self, path: &Path, mode: u32) -> Result<()>;

    /// Read a text file; `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    fn read_file(&self, path: &Path) -> Result<Option<String>>;

    /// Replace the content of `path` atomically: the data is staged in a
    /// sibling temporary file that already carries `mode` and `ids`, then
    /// renamed over the target.  A failure at any point leaves the previous
    /// file untouched.
    ///
    /// # Errors
    ///
    /// Returns `Write` if staging or the rename fails.
    fn write_file_atomic(
        &self,
        path: &Path,
        contents: &str,
        mode: u32,
        ids: OwnerIds,
    ) -> Result<()>;

    /// Read a symlink target; `None` if `path` is absent or not a symlink.
    ///
    /// # Errors
    ///
    /// Returns an error if the link exists but cannot be read.
    fn read_link(&self, path: &Path) -> Result<Option<PathBuf>>;

    /// Create (or replace) a symlink at `link` pointing to `source`.
    ///
    /// # Errors
    ///
    /// Returns `Filesystem` if the link cannot be created.
    fn create_symlink(&self, source: &Path, link: &Path) -> Result<()>;

    /// Remove a file, symlink, or directory tree.
    ///
    /// # Errors
    ///
    /// Returns `Filesystem` if the path cannot be removed.
    fn remove_path(&self, path: &Path) -> Result<()>;
}

/// Convert an AppArmor profile file name into the profile name it defines
/// (`usr.bin.msmtp` → `/usr/bin/msmtp`).
#[must_use]
pub fn profile_name_from_path(profile_path: &Path) -> Option<String> {
    let file = profile_path.file_name()?.to_string_lossy();
    Some(format!("/{}", file.replace('.', "/")))
}
