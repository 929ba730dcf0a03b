//! The repository handle.
//!
//! All commands operate through a [`Repository`] carrying the absolute
//! work-dir and `.git` paths, so operations compose and tests can run in
//! parallel against separate directories.

use crate::identity::{resolve_author, resolve_committer, Environment};
use crate::recorder::record_directory;
use crate::{RepoError, Result};
use mygit_storage::{
    is_git_dir, Commit, GitObject, ObjectId, ObjectKind, ObjectStore, RefStore, StorageError,
    DEFAULT_BRANCH,
};
use std::fs;
use std::path::{Path, PathBuf};

/// A git repository on disk.
#[derive(Debug, Clone)]
pub struct Repository {
    work_dir: PathBuf,
    git_dir: PathBuf,
    objects: ObjectStore,
    refs: RefStore,
}

impl Repository {
    fn from_work_dir(work_dir: PathBuf) -> Self {
        let git_dir = work_dir.join(".git");
        let objects = ObjectStore::new(git_dir.join("objects"));
        let refs = RefStore::new(&git_dir);
        Self {
            work_dir,
            git_dir,
            objects,
            refs,
        }
    }

    /// Initializes a repository skeleton in `dir`.
    ///
    /// Creates `.git/{objects,refs}` and points HEAD at the default branch.
    /// Returns the repository and whether a repository already existed.
    pub fn init(dir: impl AsRef<Path>) -> Result<(Self, bool)> {
        let work_dir = fs::canonicalize(dir.as_ref())?;
        let repo = Self::from_work_dir(work_dir);

        let existed = is_git_dir(&repo.git_dir);
        fs::create_dir_all(repo.git_dir.join("objects"))?;
        fs::create_dir_all(repo.git_dir.join("refs"))?;
        repo.refs
            .set_symbolic("HEAD", &format!("refs/heads/{DEFAULT_BRANCH}"))?;

        tracing::info!(path = %repo.git_dir.display(), existed, "initialized repository");
        Ok((repo, existed))
    }

    /// Opens an existing repository rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let work_dir = fs::canonicalize(dir.as_ref())?;
        let repo = Self::from_work_dir(work_dir);

        if !is_git_dir(&repo.git_dir) {
            return Err(RepoError::NotARepository(
                repo.work_dir.display().to_string(),
            ));
        }
        Ok(repo)
    }

    /// Returns the working directory.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Returns the `.git` directory.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Returns the object store.
    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    /// Returns the ref store.
    pub fn refs(&self) -> &RefStore {
        &self.refs
    }

    /// Resolves HEAD to a commit id.
    pub fn head_oid(&self) -> Result<ObjectId> {
        Ok(self.refs.head_oid()?)
    }

    /// Fetches an object and checks its kind.
    pub fn get_kind(&self, id: &ObjectId, expected: ObjectKind) -> Result<GitObject> {
        let object = self.objects.get(id)?;
        if object.kind != expected {
            return Err(RepoError::WrongKind {
                oid: id.to_hex(),
                expected: expected.as_str(),
            });
        }
        Ok(object)
    }

    /// Builds and stores a commit for an existing tree.
    ///
    /// Validates that `tree` names a tree and every parent a commit,
    /// resolves identity from `env`, and appends the terminating newline
    /// `-m` style messages carry.
    pub fn commit_tree(
        &self,
        tree: ObjectId,
        parents: &[ObjectId],
        message: &[u8],
        env: &dyn Environment,
    ) -> Result<ObjectId> {
        self.get_kind(&tree, ObjectKind::Tree)?;
        for parent in parents {
            self.get_kind(parent, ObjectKind::Commit)?;
        }

        let author = resolve_author(env)?;
        let committer = resolve_committer(env, &author)?;

        let mut message = message.to_vec();
        if !message.ends_with(b"\n") {
            message.push(b'\n');
        }

        let commit = Commit {
            tree,
            parents: parents.to_vec(),
            author,
            committer,
            message,
        };
        let object = GitObject::new(ObjectKind::Commit, commit.encode());
        self.objects.put(&object)?;

        tracing::debug!(id = %object.id, %tree, "commit created");
        Ok(object.id)
    }

    /// Records the working tree and commits it with HEAD as the parent.
    ///
    /// The first commit on a branch has no parent. The branch HEAD points
    /// at is updated to the new commit; a detached HEAD is updated in
    /// place.
    pub fn commit(&self, message: &[u8], env: &dyn Environment) -> Result<ObjectId> {
        let parents = match self.refs.head_oid() {
            Ok(head) => vec![head],
            Err(StorageError::RefNotFound(_)) => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let root = record_directory(&self.objects, &self.work_dir, true)?;
        let commit_id = self.commit_tree(root.oid, &parents, message, env)?;

        match self.refs.head_target()? {
            Some(branch_ref) => self.refs.update(&branch_ref, &commit_id)?,
            None => self.refs.update("HEAD", &commit_id)?,
        }

        Ok(commit_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::testutil::FixedEnvironment;
    use mygit_storage::Ref;
    use tempfile::TempDir;

    fn fixed_env() -> FixedEnvironment {
        FixedEnvironment::new()
            .with_var("GIT_AUTHOR_NAME", "Alice")
            .with_var("GIT_AUTHOR_EMAIL", "alice@example.com")
            .with_var("GIT_AUTHOR_DATE", "1234567890 +0000")
    }

    #[test]
    fn init_creates_skeleton() {
        let dir = TempDir::new().unwrap();
        let (repo, existed) = Repository::init(dir.path()).unwrap();

        assert!(!existed);
        assert!(repo.git_dir().join("objects").is_dir());
        assert!(repo.git_dir().join("refs").is_dir());
        let head = std::fs::read_to_string(repo.git_dir().join("HEAD")).unwrap();
        assert_eq!(head, "ref: refs/heads/main\n");
    }

    #[test]
    fn reinit_reports_existing() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let (_, existed) = Repository::init(dir.path()).unwrap();
        assert!(existed);
    }

    #[test]
    fn open_requires_git_dir() {
        let dir = TempDir::new().unwrap();
        let err = Repository::open(dir.path()).unwrap_err();
        assert!(matches!(err, RepoError::NotARepository(_)));
    }

    #[test]
    fn commit_tree_validates_kinds() {
        let dir = TempDir::new().unwrap();
        let (repo, _) = Repository::init(dir.path()).unwrap();

        let blob = GitObject::blob(b"not a tree".to_vec());
        repo.objects().put(&blob).unwrap();

        let err = repo
            .commit_tree(blob.id, &[], b"msg", &fixed_env())
            .unwrap_err();
        assert!(matches!(err, RepoError::WrongKind { expected: "tree", .. }));
    }

    #[test]
    fn commit_tree_is_deterministic_under_fixed_env() {
        let dir = TempDir::new().unwrap();
        let (repo, _) = Repository::init(dir.path()).unwrap();

        let tree = GitObject::new(ObjectKind::Tree, Vec::new());
        repo.objects().put(&tree).unwrap();

        let a = repo.commit_tree(tree.id, &[], b"x", &fixed_env()).unwrap();
        let b = repo.commit_tree(tree.id, &[], b"x", &fixed_env()).unwrap();
        assert_eq!(a, b);

        let stored = repo.get_kind(&a, ObjectKind::Commit).unwrap();
        let parsed = Commit::parse(&stored.data).unwrap();
        assert_eq!(parsed.tree, tree.id);
        assert_eq!(parsed.message, b"x\n");
        assert_eq!(parsed.author.name, "Alice");
    }

    #[test]
    fn first_commit_has_no_parent_and_updates_branch() {
        let dir = TempDir::new().unwrap();
        let (repo, _) = Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("f"), b"hello").unwrap();

        let first = repo.commit(b"first", &fixed_env()).unwrap();

        let head_ref = repo.refs().read("refs/heads/main").unwrap();
        assert_eq!(head_ref, Ref::Direct(first));

        let commit = Commit::parse(&repo.objects().get(&first).unwrap().data).unwrap();
        assert!(commit.parents.is_empty());
    }

    #[test]
    fn second_commit_chains_to_first() {
        let dir = TempDir::new().unwrap();
        let (repo, _) = Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("f"), b"one").unwrap();

        let first = repo.commit(b"first", &fixed_env()).unwrap();
        std::fs::write(dir.path().join("f"), b"two").unwrap();
        let second = repo.commit(b"second", &fixed_env()).unwrap();

        let commit = Commit::parse(&repo.objects().get(&second).unwrap().data).unwrap();
        assert_eq!(commit.parents, vec![first]);
        assert_eq!(repo.head_oid().unwrap(), second);
    }
}
