//! Reference files under `.git`.

use crate::{ObjectId, Result, StorageError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Branch refs/heads/<branch> a fresh repository's HEAD points at.
pub const DEFAULT_BRANCH: &str = "main";

/// Symbolic ref chains longer than this are treated as cycles.
const MAX_SYMBOLIC_HOPS: usize = 5;

/// A git reference: either an object id or a pointer to another ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ref {
    /// Direct reference to an object.
    Direct(ObjectId),
    /// Symbolic reference, e.g. HEAD -> refs/heads/main.
    Symbolic(String),
}

/// Reference store over the files of a `.git` directory.
#[derive(Debug, Clone)]
pub struct RefStore {
    git_dir: PathBuf,
}

impl RefStore {
    /// Creates a store over the given `.git` directory.
    pub fn new(git_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.git_dir.join(name)
    }

    /// Reads a ref file without following symbolic indirection.
    pub fn read(&self, name: &str) -> Result<Ref> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(StorageError::RefNotFound(name.to_string()));
        }

        let contents = fs::read_to_string(&path)?;
        let contents = contents.trim_end_matches('\n');

        if let Some(target) = contents.strip_prefix("ref: ") {
            return Ok(Ref::Symbolic(target.to_string()));
        }
        Ok(Ref::Direct(ObjectId::from_hex(contents)?))
    }

    /// Resolves a ref to an object id, following at most
    /// [`MAX_SYMBOLIC_HOPS`] symbolic hops.
    pub fn resolve(&self, name: &str) -> Result<ObjectId> {
        let mut current = name.to_string();
        for _ in 0..MAX_SYMBOLIC_HOPS {
            match self.read(&current)? {
                Ref::Direct(id) => return Ok(id),
                Ref::Symbolic(target) => current = target,
            }
        }
        Err(StorageError::RefDepthExceeded(name.to_string()))
    }

    /// Writes `<oid>\n` to the ref file, creating parent directories.
    pub fn update(&self, name: &str, id: &ObjectId) -> Result<()> {
        self.write_contents(name, format!("{}\n", id.to_hex()).as_bytes())
    }

    /// Writes a symbolic ref: `ref: <target>\n`.
    pub fn set_symbolic(&self, name: &str, target: &str) -> Result<()> {
        self.write_contents(name, format!("ref: {target}\n").as_bytes())
    }

    fn write_contents(&self, name: &str, contents: &[u8]) -> Result<()> {
        let path = self.path_for(name);
        let dir = path
            .parent()
            .ok_or_else(|| StorageError::RefNotFound(name.to_string()))?;
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(contents)?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Resolves HEAD to a commit id.
    pub fn head_oid(&self) -> Result<ObjectId> {
        self.resolve("HEAD")
    }

    /// Returns the ref name HEAD points at, when HEAD is symbolic.
    pub fn head_target(&self) -> Result<Option<String>> {
        match self.read("HEAD")? {
            Ref::Symbolic(target) => Ok(Some(target)),
            Ref::Direct(_) => Ok(None),
        }
    }

    /// Returns the current branch name, when HEAD points under refs/heads.
    pub fn current_branch(&self) -> Result<Option<String>> {
        Ok(self
            .head_target()?
            .and_then(|t| t.strip_prefix("refs/heads/").map(str::to_string)))
    }
}

/// Returns true when `path` looks like a `.git` directory with refs.
pub fn is_git_dir(path: &Path) -> bool {
    path.join("objects").is_dir() && path.join("refs").is_dir() && path.join("HEAD").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, RefStore) {
        let dir = TempDir::new().unwrap();
        let store = RefStore::new(dir.path());
        (dir, store)
    }

    fn oid(fill: u8) -> ObjectId {
        ObjectId::from_bytes([fill; 20])
    }

    #[test]
    fn update_and_read_direct() {
        let (_dir, refs) = store();
        refs.update("refs/heads/main", &oid(1)).unwrap();

        assert_eq!(refs.read("refs/heads/main").unwrap(), Ref::Direct(oid(1)));
        assert_eq!(refs.resolve("refs/heads/main").unwrap(), oid(1));
    }

    #[test]
    fn ref_file_contents() {
        let (dir, refs) = store();
        refs.update("refs/heads/main", &oid(1)).unwrap();

        let contents = std::fs::read_to_string(dir.path().join("refs/heads/main")).unwrap();
        assert_eq!(contents, format!("{}\n", oid(1)));
    }

    #[test]
    fn symbolic_head_resolves_through_branch() {
        let (_dir, refs) = store();
        refs.set_symbolic("HEAD", "refs/heads/main").unwrap();
        refs.update("refs/heads/main", &oid(2)).unwrap();

        assert_eq!(refs.head_oid().unwrap(), oid(2));
        assert_eq!(refs.current_branch().unwrap().as_deref(), Some("main"));
    }

    #[test]
    fn symbolic_file_contents() {
        let (dir, refs) = store();
        refs.set_symbolic("HEAD", "refs/heads/main").unwrap();

        let contents = std::fs::read_to_string(dir.path().join("HEAD")).unwrap();
        assert_eq!(contents, "ref: refs/heads/main\n");
    }

    #[test]
    fn missing_ref_is_not_found() {
        let (_dir, refs) = store();
        let err = refs.resolve("refs/heads/nope").unwrap_err();
        assert!(matches!(err, StorageError::RefNotFound(_)));
    }

    #[test]
    fn cyclic_symbolic_chain_bounded() {
        let (_dir, refs) = store();
        refs.set_symbolic("refs/a", "refs/b").unwrap();
        refs.set_symbolic("refs/b", "refs/a").unwrap();

        let err = refs.resolve("refs/a").unwrap_err();
        assert!(matches!(err, StorageError::RefDepthExceeded(_)));
    }

    #[test]
    fn dangling_symbolic_is_not_found() {
        let (_dir, refs) = store();
        refs.set_symbolic("HEAD", "refs/heads/main").unwrap();

        let err = refs.head_oid().unwrap_err();
        assert!(matches!(err, StorageError::RefNotFound(_)));
    }

    #[test]
    fn update_overwrites() {
        let (_dir, refs) = store();
        refs.update("refs/heads/main", &oid(1)).unwrap();
        refs.update("refs/heads/main", &oid(2)).unwrap();

        assert_eq!(refs.resolve("refs/heads/main").unwrap(), oid(2));
    }

    #[test]
    fn current_branch_none_for_non_heads_target() {
        let (_dir, refs) = store();
        refs.set_symbolic("HEAD", "refs/remotes/origin/main").unwrap();

        assert_eq!(refs.current_branch().unwrap(), None);
    }
}
