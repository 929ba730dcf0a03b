//! Clone orchestration.
//!
//! Sequences discovery, negotiation, pack parsing, delta resolution, ref
//! writing, and checkout. Objects are always on disk before any ref names
//! them, and refs before the working tree is written.

use crate::checkout::materialize;
use crate::{RepoError, Repository, Result};
use mygit_storage::{Commit, ObjectKind, DEFAULT_BRANCH};
use mygit_transport::{discover_refs, fetch_pack, DeltaResolver, PackParser, RemoteRefs};
use std::fs;
use std::path::Path;

/// Derives a target directory name from the remote URL.
pub fn default_directory(url: &str) -> String {
    let name = mygit_transport::sanitize_url(url)
        .rsplit('/')
        .next()
        .unwrap_or("")
        .trim_end_matches(".git");
    if name.is_empty() {
        "repo".to_string()
    } else {
        name.to_string()
    }
}

/// Clones `url` into `dir`, leaving a checked-out working tree.
pub fn clone(url: &str, dir: &Path) -> Result<Repository> {
    fs::create_dir_all(dir)?;
    let (repo, _) = Repository::init(dir)?;

    let remote = discover_refs(url)?;
    if remote.refs.is_empty() {
        return Err(RepoError::NoRemoteRefs);
    }

    fetch_objects(&repo, url, &remote)?;
    write_remote_refs(&repo, &remote)?;
    checkout_head(&repo, &remote)?;

    Ok(repo)
}

/// Negotiates and ingests the packfile.
///
/// The pack is spooled to a temp file under `objects/pack` and removed
/// again whether or not parsing succeeds; a failed clone leaves only
/// whole, verified loose objects behind.
fn fetch_objects(repo: &Repository, url: &str, remote: &RemoteRefs) -> Result<()> {
    let pack_dir = repo.objects().root().join("pack");
    fs::create_dir_all(&pack_dir)?;

    let first = &remote.refs[0];
    let pack_path = pack_dir.join(format!("tmp_pack_{}", &first.id.to_hex()[..5]));

    let result: Result<()> = (|| {
        let mut pack_file = fs::File::create(&pack_path)?;
        fetch_pack(url, &remote.refs, &mut pack_file)?;

        let pack = fs::read(&pack_path)?;
        let parsed = PackParser::new(&pack).parse(repo.objects())?;
        tracing::info!(objects = parsed.object_count, "received pack");

        if !parsed.deltas.is_empty() {
            tracing::info!(deltas = parsed.deltas.len(), "resolving deltas");
            DeltaResolver::new(parsed.deltas).resolve(repo.objects())?;
        }
        Ok(())
    })();

    if pack_path.is_file() {
        let _ = fs::remove_file(&pack_path);
    }
    result
}

/// Records what the remote advertised.
///
/// Every advertised ref is written under its own name, branches are
/// mirrored under `refs/remotes/origin/`, and the local default branch is
/// pointed at the first advertised ref so HEAD resolves.
fn write_remote_refs(repo: &Repository, remote: &RemoteRefs) -> Result<()> {
    let refs = repo.refs();

    for reference in &remote.refs {
        if reference.name == "HEAD" {
            continue;
        }
        refs.update(&reference.name, &reference.id)?;
        if let Some(branch) = reference.name.strip_prefix("refs/heads/") {
            refs.update(&format!("refs/remotes/origin/{branch}"), &reference.id)?;
        }
    }

    refs.update(&format!("refs/heads/{DEFAULT_BRANCH}"), &remote.refs[0].id)?;
    refs.set_symbolic(
        "refs/remotes/origin/HEAD",
        &format!("refs/remotes/origin/{DEFAULT_BRANCH}"),
    )?;
    Ok(())
}

/// Checks out the first advertised ref into the working directory.
fn checkout_head(repo: &Repository, remote: &RemoteRefs) -> Result<()> {
    let head = &remote.refs[0];
    let object = repo.get_kind(&head.id, ObjectKind::Commit)?;
    let commit = Commit::parse(&object.data)?;

    materialize(repo.objects(), &commit.tree, repo.work_dir())?;
    tracing::info!(head = %head.id, "checked out {}", head.name);
    Ok(())
}
