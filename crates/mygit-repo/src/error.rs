//! Repository error types.

use thiserror::Error;

/// Errors from high-level repository operations.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The directory is not a git repository.
    #[error("not a git repository: {0}")]
    NotARepository(String),

    /// An object was not of the kind an operation requires.
    #[error("object {oid} is not a {expected}")]
    WrongKind {
        /// Hex id of the offending object.
        oid: String,
        /// The kind the operation needed.
        expected: &'static str,
    },

    /// Commit identity could not be resolved from the environment.
    #[error("identity unresolved: {0}")]
    MissingIdentity(String),

    /// The remote advertised no refs to clone.
    #[error("remote repository advertised no refs")]
    NoRemoteRefs,

    /// Storage error.
    #[error(transparent)]
    Storage(#[from] mygit_storage::StorageError),

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] mygit_transport::TransportError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepoError>;
