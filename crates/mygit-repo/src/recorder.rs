//! Recording the working tree into the object database.
//!
//! A recursive walk that hashes files as blobs and directories as trees,
//! skipping `.git`. With `write` set, every object visited is stored; the
//! root tree entry comes back either way.

use crate::{RepoError, Result};
use mygit_storage::{encode_tree, FileMode, GitObject, ObjectKind, ObjectStore, TreeEntry};
use std::fs;
use std::path::Path;

/// Records a single path, file or directory, as a tree entry.
pub fn record_path(store: &ObjectStore, path: &Path, write: bool) -> Result<TreeEntry> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        record_directory(store, path, write)
    } else {
        record_file(store, path, write)
    }
}

/// Hashes a file (or symlink) as a blob, choosing the mode from its
/// metadata.
pub fn record_file(store: &ObjectStore, path: &Path, write: bool) -> Result<TreeEntry> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        return Err(RepoError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("unable to hash a directory: {}", path.display()),
        )));
    }

    let (mode, content) = if metadata.file_type().is_symlink() {
        let target = fs::read_link(path)?;
        (
            FileMode::Symlink,
            target.to_string_lossy().into_owned().into_bytes(),
        )
    } else {
        (file_mode(&metadata), fs::read(path)?)
    };

    let blob = GitObject::blob(content);
    if write {
        store.put(&blob)?;
    }

    Ok(TreeEntry::new(mode, file_name(path)?, blob.id)?)
}

/// Walks a directory into a tree object.
pub fn record_directory(store: &ObjectStore, path: &Path, write: bool) -> Result<TreeEntry> {
    let mut children = Vec::new();

    for dir_entry in fs::read_dir(path)? {
        let dir_entry = dir_entry?;
        if dir_entry.file_name() == ".git" {
            continue;
        }
        children.push(record_path(store, &dir_entry.path(), write)?);
    }

    let payload = encode_tree(&children)?;
    let tree = GitObject::new(ObjectKind::Tree, payload);
    if write {
        store.put(&tree)?;
    }

    Ok(TreeEntry {
        mode: FileMode::Directory,
        name: file_name(path)?,
        oid: tree.id,
    })
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> FileMode {
    use std::os::unix::fs::PermissionsExt;
    if metadata.permissions().mode() & 0o111 != 0 {
        FileMode::Executable
    } else {
        FileMode::Regular
    }
}

#[cfg(not(unix))]
fn file_mode(_metadata: &fs::Metadata) -> FileMode {
    FileMode::Regular
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            RepoError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("path has no file name: {}", path.display()),
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mygit_storage::parse_tree;
    use tempfile::TempDir;

    fn store() -> (TempDir, ObjectStore) {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::new(dir.path().join("objects"));
        (dir, store)
    }

    #[test]
    fn single_file_tree() {
        let (dir, store) = store();
        let work = dir.path().join("work");
        fs::create_dir(&work).unwrap();
        fs::write(work.join("f"), b"hello").unwrap();

        let root = record_directory(&store, &work, true).unwrap();
        let tree = store.get(&root.oid).unwrap();
        let entries = parse_tree(&tree.data).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mode, FileMode::Regular);
        assert_eq!(entries[0].name, "f");
        assert_eq!(
            entries[0].oid.to_hex(),
            "b6fc4c620b67d95f953a5c1c1230aaab5db5a1b0"
        );
    }

    #[test]
    fn git_dir_skipped_and_children_sorted() {
        let (dir, store) = store();
        let work = dir.path().join("work");
        fs::create_dir_all(work.join(".git")).unwrap();
        fs::write(work.join(".git").join("HEAD"), b"x").unwrap();
        fs::write(work.join("zeta"), b"z").unwrap();
        fs::write(work.join("alpha"), b"a").unwrap();
        fs::create_dir(work.join("mid")).unwrap();
        fs::write(work.join("mid").join("inner"), b"i").unwrap();

        let root = record_directory(&store, &work, true).unwrap();
        let entries = parse_tree(&store.get(&root.oid).unwrap().data).unwrap();

        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        assert_eq!(entries[1].mode, FileMode::Directory);
    }

    #[test]
    fn without_write_nothing_is_stored() {
        let (dir, store) = store();
        let work = dir.path().join("work");
        fs::create_dir(&work).unwrap();
        fs::write(work.join("f"), b"hello").unwrap();

        let root = record_directory(&store, &work, false).unwrap();
        assert!(!store.contains(&root.oid));
    }

    #[test]
    fn recording_is_deterministic() {
        let (dir, store) = store();
        let work = dir.path().join("work");
        fs::create_dir(&work).unwrap();
        fs::write(work.join("a"), b"1").unwrap();
        fs::write(work.join("b"), b"2").unwrap();

        let first = record_directory(&store, &work, false).unwrap();
        let second = record_directory(&store, &work, true).unwrap();
        assert_eq!(first.oid, second.oid);
    }

    #[cfg(unix)]
    #[test]
    fn executable_bit_recorded() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, store) = store();
        let work = dir.path().join("work");
        fs::create_dir(&work).unwrap();
        let script = work.join("run.sh");
        fs::write(&script, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let root = record_directory(&store, &work, true).unwrap();
        let entries = parse_tree(&store.get(&root.oid).unwrap().data).unwrap();
        assert_eq!(entries[0].mode, FileMode::Executable);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_records_target_as_blob() {
        let (dir, store) = store();
        let work = dir.path().join("work");
        fs::create_dir(&work).unwrap();
        fs::write(work.join("real"), b"data").unwrap();
        std::os::unix::fs::symlink("real", work.join("link")).unwrap();

        let root = record_directory(&store, &work, true).unwrap();
        let entries = parse_tree(&store.get(&root.oid).unwrap().data).unwrap();

        let link = entries.iter().find(|e| e.name == "link").unwrap();
        assert_eq!(link.mode, FileMode::Symlink);
        assert_eq!(store.get(&link.oid).unwrap().data.as_ref(), b"real");
    }
}
