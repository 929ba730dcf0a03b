//! Transport error types.

use thiserror::Error;

/// Errors that can occur while talking to a remote or parsing a pack.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Malformed pkt-line framing.
    #[error("invalid pkt-line: {0}")]
    InvalidPktLine(String),

    /// Protocol violation: bad status, advertisement, or NAK.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Malformed pack file.
    #[error("invalid pack file: {0}")]
    InvalidPack(String),

    /// Pack file version outside the supported set.
    #[error("unsupported pack version: {0}")]
    UnsupportedVersion(u32),

    /// OFS_DELTA entries are not supported.
    #[error("unsupported delta: {0}")]
    UnsupportedDelta(String),

    /// Pack trailer checksum mismatch.
    #[error("pack checksum mismatch")]
    BadChecksum,

    /// Malformed delta instruction stream.
    #[error("bad delta: {0}")]
    BadDelta(String),

    /// Deltas whose bases never became available.
    #[error("{0} deltas left unresolved: base objects missing from pack and store")]
    UnresolvableDeltas(usize),

    /// Storage error.
    #[error(transparent)]
    Storage(#[from] mygit_storage::StorageError),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
