//! CLI command implementations.

use mygit_repo::{Repository, SystemEnvironment};
use mygit_storage::{parse_tree, ObjectId, ObjectKind};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Repo(#[from] mygit_repo::RepoError),

    #[error(transparent)]
    Storage(#[from] mygit_storage::StorageError),

    #[error(transparent)]
    Transport(#[from] mygit_transport::TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

fn open_current() -> Result<Repository> {
    Ok(Repository::open(".")?)
}

fn parse_oid(hex: &str) -> Result<ObjectId> {
    ObjectId::from_hex(hex).map_err(|_| CliError::Usage(format!("not an object id: {hex}")))
}

/// Initialize the repository skeleton in the current directory.
pub fn init() -> Result<()> {
    let (repo, existed) = Repository::init(".")?;

    if existed {
        println!(
            "Reinitialized existing Git repository in {}",
            repo.work_dir().display()
        );
    } else {
        println!(
            "Initialized empty Git repository in {}/.git/",
            repo.work_dir().display()
        );
    }
    Ok(())
}

/// Print an object's payload to stdout.
pub fn cat_file(pretty: bool, oid: &str) -> Result<()> {
    if !pretty {
        return Err(CliError::Usage(
            "cat-file requires the -p flag".to_string(),
        ));
    }

    let repo = open_current()?;
    let object = repo.objects().get(&parse_oid(oid)?)?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&object.data)?;
    stdout.flush()?;
    Ok(())
}

/// Hash a file as a blob, optionally storing it.
pub fn hash_object(write: bool, path: &str) -> Result<()> {
    // Hashing alone needs no repository; only -w touches the store.
    let store = if write {
        open_current()?.objects().clone()
    } else {
        mygit_storage::ObjectStore::new(Path::new(".git").join("objects"))
    };

    let entry = mygit_repo::record_file(&store, Path::new(path), write)?;
    println!("{}", entry.oid);
    Ok(())
}

/// List the entries of a tree object.
pub fn ls_tree(name_only: bool, oid: &str) -> Result<()> {
    let repo = open_current()?;
    let tree = repo.get_kind(&parse_oid(oid)?, ObjectKind::Tree)?;

    for entry in parse_tree(&tree.data)? {
        if name_only {
            println!("{}", entry.name);
        } else {
            println!(
                "{} {} {}\t{}",
                entry.mode.as_str(),
                entry.mode.kind_str(),
                entry.oid,
                entry.name
            );
        }
    }
    Ok(())
}

/// Record the working directory and print the root tree id.
pub fn write_tree() -> Result<()> {
    let repo = open_current()?;
    let root = mygit_repo::record_directory(repo.objects(), repo.work_dir(), true)?;
    println!("{}", root.oid);
    Ok(())
}

/// Build a commit for an existing tree and print its id.
pub fn commit_tree(tree: &str, parent: Option<&str>, message: &str) -> Result<()> {
    let repo = open_current()?;

    let parents = match parent {
        Some(hex) => vec![parse_oid(hex)?],
        None => Vec::new(),
    };

    let id = repo.commit_tree(
        parse_oid(tree)?,
        &parents,
        message.as_bytes(),
        &SystemEnvironment,
    )?;
    println!("{id}");
    Ok(())
}

/// Record the working directory and commit it on the current branch.
pub fn commit(message: &str, allow_empty_message: bool) -> Result<()> {
    if message.is_empty() && !allow_empty_message {
        return Err(CliError::Usage(
            "aborting commit due to empty commit message".to_string(),
        ));
    }

    let repo = open_current()?;
    let id = repo.commit(message.as_bytes(), &SystemEnvironment)?;

    let subject = message.lines().next().unwrap_or("");
    println!("[{id}] {subject}");
    Ok(())
}

/// Print history starting from an id, or HEAD.
pub fn log(oid: Option<&str>) -> Result<()> {
    let repo = open_current()?;
    let start = match oid {
        Some(hex) => parse_oid(hex)?,
        None => repo.head_oid()?,
    };

    for entry in mygit_repo::history(&repo, start)? {
        println!("{}", mygit_repo::format_entry(&entry));
    }
    Ok(())
}

/// Print the refs advertised by a remote.
pub fn ls_remote(url: &str) -> Result<()> {
    let remote = mygit_transport::discover_refs(url)?;
    for reference in &remote.refs {
        println!("{}\t{}", reference.id, reference.name);
    }
    Ok(())
}

/// Clone a remote repository.
pub fn clone(url: &str, dir: Option<&str>) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir.to_string(),
        None => mygit_repo::default_directory(url),
    };

    println!("Cloning into '{dir}'...");
    mygit_repo::clone(url, Path::new(&dir))?;
    Ok(())
}
