//! # mygit-storage
//!
//! The content-addressed object database: loose-object codec and store,
//! tree and commit payload codecs, and reference files.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod commit;
mod error;
mod object;
mod refs;
mod store;
mod tree;

pub use commit::{Commit, Signature};
pub use error::{Result, StorageError};
pub use object::{GitObject, ObjectId, ObjectKind};
pub use refs::{is_git_dir, Ref, RefStore, DEFAULT_BRANCH};
pub use store::ObjectStore;
pub use tree::{encode_tree, parse_tree, FileMode, TreeEntry};
