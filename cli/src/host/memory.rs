//! In-memory host used by tests and by rehearsal runs.
//!
//! [`MemoryHost`] models the account tables, the package database, the
//! access-control subsystem and a filesystem tree behind one mutex.  Every
//! successful mutation is appended to a journal so tests can assert exactly
//! how many changes a run made, and any [`Operation`] can be made to fail on
//! demand.
use anyhow::{Result, anyhow};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::{HostEnvironment, OwnerIds, Ownership, PathFacts, PathKind, profile_name_from_path};
use crate::resources::error::ResourceError;

/// Ids handed out to system accounts count down from here.
const FIRST_SYSTEM_ID: u32 = 999;

/// A host mutation kind, used both for the journal and for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Operation {
    /// `create_group`
    CreateGroup,
    /// `delete_group`
    DeleteGroup,
    /// `create_system_user`
    CreateUser,
    /// `delete_user`
    DeleteUser,
    /// `install_package`
    InstallPackage,
    /// `remove_package`
    RemovePackage,
    /// `set_complain_mode`
    SetComplainMode,
    /// `create_dir`
    CreateDir,
    /// `create_empty_file`
    CreateFile,
    /// `set_owner`
    SetOwner,
    /// `set_mode`
    SetMode,
    /// `write_file_atomic`
    WriteFile,
    /// `create_symlink`
    CreateSymlink,
    /// `remove_path`
    RemovePath,
}

/// One journal entry: what was done, and to what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    /// Operation kind.
    pub op: Operation,
    /// Account, package, or path the operation targeted.
    pub target: String,
}

/// Content of a filesystem node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Regular file with text content.
    File(String),
    /// Directory.
    Directory,
    /// Symbolic link to the given path.
    Symlink(PathBuf),
}

/// A filesystem node with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Node content.
    pub kind: NodeKind,
    /// Permission bits.
    pub mode: u32,
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
}

impl Node {
    const fn dir(mode: u32) -> Self {
        Self {
            kind: NodeKind::Directory,
            mode,
            uid: 0,
            gid: 0,
        }
    }

    fn file(content: &str, mode: u32) -> Self {
        Self {
            kind: NodeKind::File(content.to_string()),
            mode,
            uid: 0,
            gid: 0,
        }
    }
}

/// Comparable view of the host, excluding the journal and id allocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HostSnapshot {
    /// Group name to gid.
    pub groups: BTreeMap<String, u32>,
    /// User name to `(uid, primary gid)`.
    pub users: BTreeMap<String, (u32, u32)>,
    /// Installed package names.
    pub packages: BTreeSet<String>,
    /// Profiles in complain mode.
    pub complain: BTreeSet<String>,
    /// Filesystem tree.
    pub nodes: BTreeMap<PathBuf, Node>,
}

#[derive(Debug)]
struct Inner {
    snapshot: HostSnapshot,
    package_files: BTreeMap<String, Vec<(PathBuf, u32)>>,
    access_control: bool,
    privileged: bool,
    next_id: u32,
    fail_on: BTreeSet<Operation>,
    journal: Vec<Mutation>,
}

/// Fake host with journaled mutations and injectable failures.
#[derive(Debug)]
pub struct MemoryHost {
    inner: Mutex<Inner>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// An empty, privileged host that only knows `root:root` and `/`.
    #[must_use]
    pub fn new() -> Self {
        let mut snapshot = HostSnapshot::default();
        snapshot.groups.insert("root".to_string(), 0);
        snapshot.users.insert("root".to_string(), (0, 0));
        snapshot
            .nodes
            .insert(PathBuf::from("/"), Node::dir(0o755));
        Self {
            inner: Mutex::new(Inner {
                snapshot,
                package_files: BTreeMap::new(),
                access_control: true,
                privileged: true,
                next_id: FIRST_SYSTEM_ID,
                fail_on: BTreeSet::new(),
                journal: Vec::new(),
            }),
        }
    }

    /// A host laid out like a stock Debian system where the `msmtp` package
    /// ships the mail client binary and its AppArmor profile.
    #[must_use]
    pub fn debian() -> Self {
        let mut host = Self::new();
        for dir in [
            "/etc/apparmor.d",
            "/etc/profile.d",
            "/etc/ssl/certs",
            "/usr/bin",
            "/usr/local/bin",
            "/usr/sbin",
            "/var/log",
        ] {
            host = host.with_dir(dir);
        }
        host.with_package_file("msmtp", "/usr/bin/msmtp", 0o755)
            .with_package_file("msmtp", "/etc/apparmor.d/usr.bin.msmtp", 0o644)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("memory host state poisoned"))
    }

    fn with_inner(self, f: impl FnOnce(&mut Inner)) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            f(&mut inner);
        }
        self
    }

    /// Add a directory (and its ancestors) owned by root, mode 755.
    #[must_use]
    pub fn with_dir(self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        self.with_inner(|inner| insert_dir_all(&mut inner.snapshot.nodes, &path))
    }

    /// Add a regular file owned by root; missing ancestors are created.
    #[must_use]
    pub fn with_file(self, path: impl AsRef<Path>, content: &str, mode: u32) -> Self {
        let path = path.as_ref().to_path_buf();
        self.with_inner(|inner| {
            if let Some(parent) = path.parent() {
                insert_dir_all(&mut inner.snapshot.nodes, parent);
            }
            inner.snapshot.nodes.insert(path, Node::file(content, mode));
        })
    }

    /// Add a symlink at `link` pointing to `source`.
    #[must_use]
    pub fn with_symlink(self, link: impl AsRef<Path>, source: impl AsRef<Path>) -> Self {
        let link = link.as_ref().to_path_buf();
        let source = source.as_ref().to_path_buf();
        self.with_inner(|inner| {
            inner.snapshot.nodes.insert(
                link,
                Node {
                    kind: NodeKind::Symlink(source),
                    mode: 0o777,
                    uid: 0,
                    gid: 0,
                },
            );
        })
    }

    /// Declare that installing `package` places a file at `path`.
    #[must_use]
    pub fn with_package_file(self, package: &str, path: impl AsRef<Path>, mode: u32) -> Self {
        let path = path.as_ref().to_path_buf();
        self.with_inner(|inner| {
            inner
                .package_files
                .entry(package.to_string())
                .or_default()
                .push((path, mode));
        })
    }

    /// Mark a package as already installed, placing its files.
    #[must_use]
    pub fn with_installed_package(self, package: &str) -> Self {
        self.with_inner(|inner| install_files(inner, package))
    }

    /// Add an existing group.
    #[must_use]
    pub fn with_group(self, name: &str) -> Self {
        self.with_inner(|inner| {
            let gid = allocate_id(inner);
            inner.snapshot.groups.insert(name.to_string(), gid);
        })
    }

    /// Remove the access-control tooling.
    #[must_use]
    pub fn without_access_control(self) -> Self {
        self.with_inner(|inner| inner.access_control = false)
    }

    /// Run as an ordinary user.
    #[must_use]
    pub fn unprivileged(self) -> Self {
        self.with_inner(|inner| inner.privileged = false)
    }

    /// Make every subsequent call of `op` fail.
    pub fn fail_on(&self, op: Operation) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_on.insert(op);
        }
    }

    /// Stop injecting failures.
    pub fn clear_failures(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_on.clear();
        }
    }

    /// All successful mutations so far, in order.
    #[must_use]
    pub fn mutations(&self) -> Vec<Mutation> {
        self.inner
            .lock()
            .map_or_else(|_| Vec::new(), |inner| inner.journal.clone())
    }

    /// Number of successful mutations so far.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.inner.lock().map_or(0, |inner| inner.journal.len())
    }

    /// Comparable copy of the current host state.
    #[must_use]
    pub fn snapshot(&self) -> HostSnapshot {
        self.inner
            .lock()
            .map_or_else(|_| HostSnapshot::default(), |inner| inner.snapshot.clone())
    }

    /// Content of a regular file, if present.
    #[must_use]
    pub fn file_contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let inner = self.inner.lock().ok()?;
        match &inner.snapshot.nodes.get(path.as_ref())?.kind {
            NodeKind::File(content) => Some(content.clone()),
            _ => None,
        }
    }

    /// Metadata of a node, if present.
    #[must_use]
    pub fn node(&self, path: impl AsRef<Path>) -> Option<Node> {
        let inner = self.inner.lock().ok()?;
        inner.snapshot.nodes.get(path.as_ref()).cloned()
    }
}

fn allocate_id(inner: &mut Inner) -> u32 {
    let id = inner.next_id;
    inner.next_id = inner.next_id.saturating_sub(1);
    id
}

fn insert_dir_all(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
    for ancestor in path.ancestors() {
        if ancestor.as_os_str().is_empty() {
            continue;
        }
        nodes
            .entry(ancestor.to_path_buf())
            .or_insert_with(|| Node::dir(0o755));
    }
}

fn install_files(inner: &mut Inner, package: &str) {
    let files = inner.package_files.get(package).cloned().unwrap_or_default();
    for (path, mode) in files {
        if let Some(parent) = path.parent() {
            insert_dir_all(&mut inner.snapshot.nodes, parent);
        }
        inner
            .snapshot
            .nodes
            .insert(path, Node::file("", mode));
    }
    inner.snapshot.packages.insert(package.to_string());
}

fn parent_is_dir(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> bool {
    path.parent().is_none_or(|parent| {
        parent.as_os_str().is_empty()
            || nodes
                .get(parent)
                .is_some_and(|n| n.kind == NodeKind::Directory)
    })
}

/// The error a failing call of `op` on `target` raises.
fn injected(op: Operation, target: &str) -> anyhow::Error {
    const REASON: &str = "injected failure";
    let err = match op {
        Operation::CreateGroup => ResourceError::GroupCreateFailed {
            group: target.to_string(),
            reason: REASON.to_string(),
        },
        Operation::CreateUser => ResourceError::UserCreateFailed {
            user: target.to_string(),
            reason: REASON.to_string(),
        },
        Operation::InstallPackage | Operation::RemovePackage => ResourceError::PackageManager {
            package: target.to_string(),
            exit_code: 100,
            stderr: REASON.to_string(),
        },
        Operation::SetComplainMode => ResourceError::AccessControl {
            profile: target.to_string(),
            reason: REASON.to_string(),
        },
        Operation::WriteFile => ResourceError::write(Path::new(target), REASON),
        Operation::DeleteGroup | Operation::DeleteUser => ResourceError::ExecutionFailed {
            program: if op == Operation::DeleteGroup {
                "groupdel"
            } else {
                "userdel"
            }
            .to_string(),
            exit_code: 1,
            stderr: REASON.to_string(),
        },
        Operation::CreateDir
        | Operation::CreateFile
        | Operation::SetOwner
        | Operation::SetMode
        | Operation::CreateSymlink
        | Operation::RemovePath => ResourceError::filesystem(Path::new(target), REASON),
    };
    err.into()
}

impl Inner {
    fn check(&self, op: Operation, target: &str) -> Result<()> {
        if self.fail_on.contains(&op) {
            return Err(injected(op, target));
        }
        Ok(())
    }

    fn record(&mut self, op: Operation, target: impl Into<String>) {
        self.journal.push(Mutation {
            op,
            target: target.into(),
        });
    }

    /// Follow symlinks from `path` to a non-link node.
    fn resolve(&self, path: &Path) -> Option<(&PathBuf, &Node)> {
        let mut current = path.to_path_buf();
        for _ in 0..8 {
            let (key, node) = self.snapshot.nodes.get_key_value(&current)?;
            match &node.kind {
                NodeKind::Symlink(target) => current.clone_from(target),
                _ => return Some((key, node)),
            }
        }
        None
    }

    fn node_mut(&mut self, path: &Path) -> Result<&mut Node> {
        self.snapshot
            .nodes
            .get_mut(path)
            .ok_or_else(|| ResourceError::filesystem(path, "No such file or directory").into())
    }
}

impl HostEnvironment for MemoryHost {
    fn is_privileged(&self) -> Result<bool> {
        Ok(self.lock()?.privileged)
    }

    fn group_exists(&self, name: &str) -> Result<bool> {
        Ok(self.lock()?.snapshot.groups.contains_key(name))
    }

    fn create_group(&self, name: &str) -> Result<()> {
        let mut inner = self.lock()?;
        inner.check(Operation::CreateGroup, name)?;
        if inner.snapshot.groups.contains_key(name) {
            return Err(ResourceError::GroupCreateFailed {
                group: name.to_string(),
                reason: "group already exists".to_string(),
            }
            .into());
        }
        let gid = allocate_id(&mut inner);
        inner.snapshot.groups.insert(name.to_string(), gid);
        inner.record(Operation::CreateGroup, name);
        Ok(())
    }

    fn delete_group(&self, name: &str) -> Result<()> {
        let mut inner = self.lock()?;
        inner.check(Operation::DeleteGroup, name)?;
        let Some(&gid) = inner.snapshot.groups.get(name) else {
            return Err(ResourceError::ExecutionFailed {
                program: "groupdel".to_string(),
                exit_code: 6,
                stderr: format!("group '{name}' does not exist"),
            }
            .into());
        };
        if inner.snapshot.users.values().any(|&(_, g)| g == gid) {
            return Err(ResourceError::ExecutionFailed {
                program: "groupdel".to_string(),
                exit_code: 8,
                stderr: format!("cannot remove the primary group of a user: {name}"),
            }
            .into());
        }
        inner.snapshot.groups.remove(name);
        inner.record(Operation::DeleteGroup, name);
        Ok(())
    }

    fn user_exists(&self, name: &str) -> Result<bool> {
        Ok(self.lock()?.snapshot.users.contains_key(name))
    }

    fn create_system_user(&self, name: &str, group: &str) -> Result<()> {
        let mut inner = self.lock()?;
        inner.check(Operation::CreateUser, name)?;
        let Some(&gid) = inner.snapshot.groups.get(group) else {
            return Err(ResourceError::UserCreateFailed {
                user: name.to_string(),
                reason: format!("group '{group}' does not exist"),
            }
            .into());
        };
        if inner.snapshot.users.contains_key(name) {
            return Err(ResourceError::UserCreateFailed {
                user: name.to_string(),
                reason: "user already exists".to_string(),
            }
            .into());
        }
        let uid = allocate_id(&mut inner);
        inner.snapshot.users.insert(name.to_string(), (uid, gid));
        inner.record(Operation::CreateUser, name);
        Ok(())
    }

    fn delete_user(&self, name: &str) -> Result<()> {
        let mut inner = self.lock()?;
        inner.check(Operation::DeleteUser, name)?;
        if inner.snapshot.users.remove(name).is_none() {
            return Err(ResourceError::ExecutionFailed {
                program: "userdel".to_string(),
                exit_code: 6,
                stderr: format!("user '{name}' does not exist"),
            }
            .into());
        }
        inner.record(Operation::DeleteUser, name);
        Ok(())
    }

    fn lookup_ids(&self, owner: &Ownership) -> Result<Option<OwnerIds>> {
        let inner = self.lock()?;
        let uid = inner.snapshot.users.get(&owner.user).map(|&(uid, _)| uid);
        let gid = inner.snapshot.groups.get(&owner.group).copied();
        Ok(uid.zip(gid).map(|(uid, gid)| OwnerIds { uid, gid }))
    }

    fn package_installed(&self, name: &str) -> Result<bool> {
        Ok(self.lock()?.snapshot.packages.contains(name))
    }

    fn install_package(&self, name: &str) -> Result<()> {
        let mut inner = self.lock()?;
        inner.check(Operation::InstallPackage, name)?;
        install_files(&mut inner, name);
        inner.record(Operation::InstallPackage, name);
        Ok(())
    }

    fn remove_package(&self, name: &str) -> Result<()> {
        let mut inner = self.lock()?;
        inner.check(Operation::RemovePackage, name)?;
        let files = inner.package_files.get(name).cloned().unwrap_or_default();
        for (path, _) in files {
            inner.snapshot.nodes.remove(&path);
        }
        inner.snapshot.packages.remove(name);
        inner.record(Operation::RemovePackage, name);
        Ok(())
    }

    fn access_control_available(&self) -> bool {
        self.inner.lock().is_ok_and(|inner| inner.access_control)
    }

    fn in_complain_mode(&self, profile_name: &str) -> Result<bool> {
        Ok(self.lock()?.snapshot.complain.contains(profile_name))
    }

    fn set_complain_mode(&self, profile_path: &Path) -> Result<()> {
        let display = profile_path.display().to_string();
        let mut inner = self.lock()?;
        inner.check(Operation::SetComplainMode, &display)?;
        if !inner.access_control {
            return Err(ResourceError::AccessControl {
                profile: display,
                reason: "aa-complain: command not found".to_string(),
            }
            .into());
        }
        if !inner.snapshot.nodes.contains_key(profile_path) {
            return Err(ResourceError::AccessControl {
                profile: display,
                reason: "profile not found".to_string(),
            }
            .into());
        }
        let name = profile_name_from_path(profile_path)
            .ok_or_else(|| anyhow!("cannot derive profile name from {display}"))?;
        inner.snapshot.complain.insert(name);
        inner.record(Operation::SetComplainMode, display);
        Ok(())
    }

    fn path_facts(&self, path: &Path) -> Result<Option<PathFacts>> {
        let inner = self.lock()?;
        Ok(inner.snapshot.nodes.get(path).map(|node| PathFacts {
            kind: match node.kind {
                NodeKind::File(_) => PathKind::File,
                NodeKind::Directory => PathKind::Directory,
                NodeKind::Symlink(_) => PathKind::Symlink,
            },
            mode: node.mode,
            uid: node.uid,
            gid: node.gid,
        }))
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        let mut inner = self.lock()?;
        let display = path.display().to_string();
        inner.check(Operation::CreateDir, &display)?;
        if let Some(existing) = inner.snapshot.nodes.get(path)
            && existing.kind != NodeKind::Directory
        {
            return Err(ResourceError::filesystem(path, "File exists").into());
        }
        insert_dir_all(&mut inner.snapshot.nodes, path);
        inner.record(Operation::CreateDir, display);
        Ok(())
    }

    fn create_empty_file(&self, path: &Path) -> Result<()> {
        let mut inner = self.lock()?;
        let display = path.display().to_string();
        inner.check(Operation::CreateFile, &display)?;
        if !parent_is_dir(&inner.snapshot.nodes, path) {
            return Err(ResourceError::filesystem(path, "No such file or directory").into());
        }
        inner
            .snapshot
            .nodes
            .entry(path.to_path_buf())
            .or_insert_with(|| Node::file("", 0o644));
        inner.record(Operation::CreateFile, display);
        Ok(())
    }

    fn set_owner(&self, path: &Path, ids: OwnerIds) -> Result<()> {
        let mut inner = self.lock()?;
        let display = path.display().to_string();
        inner.check(Operation::SetOwner, &display)?;
        let node = inner.node_mut(path)?;
        node.uid = ids.uid;
        node.gid = ids.gid;
        inner.record(Operation::SetOwner, display);
        Ok(())
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        let mut inner = self.lock()?;
        let display = path.display().to_string();
        inner.check(Operation::SetMode, &display)?;
        inner.node_mut(path)?.mode = mode;
        inner.record(Operation::SetMode, display);
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Option<String>> {
        let inner = self.lock()?;
        match inner.resolve(path) {
            None => Ok(None),
            Some((_, node)) => match &node.kind {
                NodeKind::File(content) => Ok(Some(content.clone())),
                _ => Err(anyhow!("reading {}: Is a directory", path.display())),
            },
        }
    }

    fn write_file_atomic(
        &self,
        path: &Path,
        contents: &str,
        mode: u32,
        ids: OwnerIds,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        let display = path.display().to_string();
        inner.check(Operation::WriteFile, &display)?;
        if !parent_is_dir(&inner.snapshot.nodes, path) {
            return Err(ResourceError::write(path, "No such file or directory").into());
        }
        inner.snapshot.nodes.insert(
            path.to_path_buf(),
            Node {
                kind: NodeKind::File(contents.to_string()),
                mode,
                uid: ids.uid,
                gid: ids.gid,
            },
        );
        inner.record(Operation::WriteFile, display);
        Ok(())
    }

    fn read_link(&self, path: &Path) -> Result<Option<PathBuf>> {
        let inner = self.lock()?;
        Ok(match inner.snapshot.nodes.get(path).map(|n| &n.kind) {
            Some(NodeKind::Symlink(target)) => Some(target.clone()),
            _ => None,
        })
    }

    fn create_symlink(&self, source: &Path, link: &Path) -> Result<()> {
        let mut inner = self.lock()?;
        let display = link.display().to_string();
        inner.check(Operation::CreateSymlink, &display)?;
        if !parent_is_dir(&inner.snapshot.nodes, link) {
            return Err(ResourceError::filesystem(link, "No such file or directory").into());
        }
        if inner
            .snapshot
            .nodes
            .get(link)
            .is_some_and(|n| n.kind == NodeKind::Directory)
        {
            return Err(ResourceError::filesystem(link, "Is a directory").into());
        }
        inner.snapshot.nodes.insert(
            link.to_path_buf(),
            Node {
                kind: NodeKind::Symlink(source.to_path_buf()),
                mode: 0o777,
                uid: 0,
                gid: 0,
            },
        );
        inner.record(Operation::CreateSymlink, display);
        Ok(())
    }

    fn remove_path(&self, path: &Path) -> Result<()> {
        let mut inner = self.lock()?;
        let display = path.display().to_string();
        inner.check(Operation::RemovePath, &display)?;
        if !inner.snapshot.nodes.contains_key(path) {
            return Ok(());
        }
        inner
            .snapshot
            .nodes
            .retain(|p, _| !p.starts_with(path));
        inner.record(Operation::RemovePath, display);
        Ok(())
    }
}
