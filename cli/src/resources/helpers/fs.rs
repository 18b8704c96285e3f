//! File-system resource helpers.
use anyhow::{Context as _, Result};
use std::io::Write as _;
use std::path::Path;

/// Write `contents` to `path` so that readers only ever observe the old file
/// or the complete new one.
///
/// The data is staged in a uniquely named sibling temporary file (same
/// directory, so the final rename never crosses a filesystem boundary),
/// flushed to disk, handed to `prepare` for permission and ownership fixes,
/// and only then renamed over `path`.  If any stage fails, the temporary file
/// is deleted on drop and `path` is left exactly as it was.
///
/// # Errors
///
/// Returns an error if the parent directory is missing, the temporary file
/// cannot be written, `prepare` fails, or the rename fails.
pub fn atomic_write(
    path: &Path,
    contents: &[u8],
    prepare: impl FnOnce(&Path) -> Result<()>,
) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut staged = tempfile::Builder::new()
        .prefix(".ssh-alert-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .with_context(|| format!("staging temp file in {}", parent.display()))?;
    staged
        .write_all(contents)
        .with_context(|| format!("writing {}", staged.path().display()))?;
    staged
        .as_file()
        .sync_all()
        .with_context(|| format!("syncing {}", staged.path().display()))?;

    prepare(staged.path())?;

    staged
        .persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("renaming staged file onto {}", path.display()))?;
    Ok(())
}

/// Remove a file, symlink (including broken ones), or directory tree.
///
/// Does nothing if `path` does not exist.
///
/// # Errors
///
/// Returns an error if the path exists but cannot be removed.
pub fn remove_any(path: &Path) -> Result<()> {
    let Ok(meta) = path.symlink_metadata() else {
        return Ok(());
    };
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
            .with_context(|| format!("remove directory: {}", path.display()))?;
    } else {
        std::fs::remove_file(path).with_context(|| format!("remove: {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn staged_leftovers(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with(".ssh-alert-"))
            .collect()
    }

    #[test]
    fn writes_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("msmtprc");
        atomic_write(&target, b"defaults\n", |_| Ok(())).unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "defaults\n");
        assert!(staged_leftovers(dir.path()).is_empty());
    }

    #[test]
    fn replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("msmtprc");
        std::fs::write(&target, "old").unwrap();
        atomic_write(&target, b"new", |_| Ok(())).unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn failure_before_rename_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("msmtprc");
        std::fs::write(&target, "account default : gmail\n").unwrap();

        let result = atomic_write(&target, b"trunc", |staged| {
            assert!(staged.exists(), "staged file should exist before rename");
            anyhow::bail!("simulated crash between write and rename")
        });

        assert!(result.is_err());
        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            "account default : gmail\n"
        );
        assert!(
            staged_leftovers(dir.path()).is_empty(),
            "staged file should be cleaned up"
        );
    }

    #[cfg(unix)]
    #[test]
    fn prepare_sees_mode_before_rename() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("script");
        atomic_write(&target, b"#!/bin/sh\n", |staged| {
            std::fs::set_permissions(staged, std::fs::Permissions::from_mode(0o755))?;
            Ok(())
        })
        .unwrap();
        let mode = std::fs::metadata(&target).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o755);
    }

    #[test]
    fn missing_parent_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing").join("msmtprc");
        assert!(atomic_write(&target, b"x", |_| Ok(())).is_err());
    }

    #[test]
    fn remove_any_handles_files_dirs_and_absent_paths() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        let tree = dir.path().join("d");
        std::fs::write(&file, "x").unwrap();
        std::fs::create_dir_all(tree.join("nested")).unwrap();
        std::fs::write(tree.join("nested/log"), "x").unwrap();

        remove_any(&file).unwrap();
        remove_any(&tree).unwrap();
        remove_any(&dir.path().join("absent")).unwrap();

        assert!(!file.exists());
        assert!(!tree.exists());
    }

    #[cfg(unix)]
    #[test]
    fn remove_any_removes_broken_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("sendmail");
        std::os::unix::fs::symlink(dir.path().join("nowhere"), &link).unwrap();
        remove_any(&link).unwrap();
        assert!(link.symlink_metadata().is_err());
    }
}
