//! Materializing trees onto the filesystem.

use crate::{RepoError, Result};
use mygit_storage::{parse_tree, FileMode, ObjectId, ObjectKind, ObjectStore};
use std::fs;
use std::path::Path;

/// Writes the contents of a tree under `root`.
///
/// Blobs land with permissions derived from their mode; sub-trees become
/// directories and recurse. The full object closure must already be in the
/// store.
pub fn materialize(store: &ObjectStore, tree_id: &ObjectId, root: &Path) -> Result<()> {
    let tree = store.get(tree_id)?;
    if tree.kind != ObjectKind::Tree {
        return Err(RepoError::WrongKind {
            oid: tree_id.to_hex(),
            expected: "tree",
        });
    }

    fs::create_dir_all(root)?;

    for entry in parse_tree(&tree.data)? {
        let path = root.join(&entry.name);
        match entry.mode {
            FileMode::Directory => materialize(store, &entry.oid, &path)?,
            FileMode::Regular | FileMode::Executable => {
                let blob = get_blob(store, &entry.oid)?;
                fs::write(&path, &blob)?;
                if entry.mode == FileMode::Executable {
                    set_executable(&path)?;
                }
            }
            FileMode::Symlink => {
                let target = get_blob(store, &entry.oid)?;
                write_symlink(&target, &path)?;
            }
        }
    }

    Ok(())
}

fn get_blob(store: &ObjectStore, id: &ObjectId) -> Result<Vec<u8>> {
    let object = store.get(id)?;
    if object.kind != ObjectKind::Blob {
        return Err(RepoError::WrongKind {
            oid: id.to_hex(),
            expected: "blob",
        });
    }
    Ok(object.data.to_vec())
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn write_symlink(target: &[u8], path: &Path) -> Result<()> {
    use std::os::unix::ffi::OsStrExt;
    let target = std::ffi::OsStr::from_bytes(target);
    std::os::unix::fs::symlink(target, path)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_symlink(target: &[u8], path: &Path) -> Result<()> {
    // No symlinks; fall back to a regular file holding the target path.
    fs::write(path, target)?;
    Ok(())
}
