//! Storage error types.

use thiserror::Error;

/// Errors that can occur while reading or writing the object database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Object not found in the database.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// Reference not found.
    #[error("reference not found: {0}")]
    RefNotFound(String),

    /// Loose object header is not `<kind> <size>\0`.
    #[error("corrupt object header: {0}")]
    CorruptHeader(String),

    /// Declared size is not a decimal number.
    #[error("bad object size: {0}")]
    BadSize(String),

    /// Inflated payload is shorter or longer than the declared size.
    #[error("object payload length {actual} does not match declared size {expected}")]
    ShortPayload {
        /// Size declared in the object header.
        expected: usize,
        /// Actual inflated payload length.
        actual: usize,
    },

    /// Object content does not hash to the id used to locate it.
    #[error("corrupt object {0}: hash mismatch")]
    CorruptObject(String),

    /// Invalid object id or kind.
    #[error("invalid object: {0}")]
    InvalidObject(String),

    /// Tree payload that cannot be decoded.
    #[error("bad tree: {0}")]
    BadTree(String),

    /// Commit payload that cannot be decoded.
    #[error("bad commit: {0}")]
    BadCommit(String),

    /// Tree entry mode outside the known set.
    #[error("unknown file mode: {0}")]
    UnknownMode(String),

    /// Symbolic ref chain longer than the hop limit.
    #[error("symbolic ref chain too deep at {0}")]
    RefDepthExceeded(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
