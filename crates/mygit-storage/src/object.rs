//! Git object types and the loose-object codec.

use crate::{Result, StorageError};
use bytes::Bytes;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use sha1::{Digest, Sha1};
use std::fmt;
use std::io::{Read, Write};

/// A 20-byte SHA-1 object identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 20]);

impl ObjectId {
    /// Creates an ObjectId from raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an ObjectId from a 40-character lowercase hex string.
    pub fn from_hex(hex: &str) -> Result<Self> {
        if hex.len() != 40 {
            return Err(StorageError::InvalidObject(format!(
                "invalid object id length: {}",
                hex.len()
            )));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(hex, &mut bytes)
            .map_err(|e| StorageError::InvalidObject(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns the hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Computes the SHA-1 hash of a payload with its git object header.
    pub fn hash_object(kind: ObjectKind, data: &[u8]) -> Self {
        let header = format!("{} {}\0", kind.as_str(), data.len());
        let mut hasher = Sha1::new();
        hasher.update(header.as_bytes());
        hasher.update(data);
        let result = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Git object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// File content.
    Blob,
    /// Directory listing.
    Tree,
    /// Commit object.
    Commit,
    /// Annotated tag.
    Tag,
}

impl ObjectKind {
    /// Returns the string representation used in loose-object headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }

    /// Parses an object kind from its header string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            "tag" => Ok(Self::Tag),
            _ => Err(StorageError::InvalidObject(format!(
                "unknown object kind: {}",
                s
            ))),
        }
    }

    /// Returns the type code used in pack file entry headers.
    pub fn pack_code(&self) -> u8 {
        match self {
            Self::Commit => 1,
            Self::Tree => 2,
            Self::Blob => 3,
            Self::Tag => 4,
        }
    }

    /// Parses an object kind from a pack file type code.
    ///
    /// Codes 6 (OFS_DELTA) and 7 (REF_DELTA) are not concrete kinds and are
    /// handled by the pack parser before this is called.
    pub fn from_pack_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::Commit),
            2 => Ok(Self::Tree),
            3 => Ok(Self::Blob),
            4 => Ok(Self::Tag),
            _ => Err(StorageError::InvalidObject(format!(
                "unknown pack type code: {}",
                code
            ))),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A git object (blob, tree, commit, or tag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitObject {
    /// The object's identifier (SHA-1 of header + payload).
    pub id: ObjectId,
    /// The kind of object.
    pub kind: ObjectKind,
    /// The raw payload, uncompressed, without the header.
    pub data: Bytes,
}

impl GitObject {
    /// Creates a new git object, computing its id from the payload.
    pub fn new(kind: ObjectKind, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let id = ObjectId::hash_object(kind, &data);
        Self { id, kind, data }
    }

    /// Creates a blob object from file content.
    pub fn blob(content: impl Into<Bytes>) -> Self {
        Self::new(ObjectKind::Blob, content)
    }

    /// Returns the payload size.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Serializes to the loose on-disk form: zlib(`<kind> <size>\0<payload>`).
    pub fn compress(&self) -> Result<Vec<u8>> {
        let header = format!("{} {}\0", self.kind.as_str(), self.data.len());
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(header.as_bytes())?;
        encoder.write_all(&self.data)?;
        Ok(encoder.finish()?)
    }

    /// Deserializes from the loose on-disk form.
    pub fn decompress(compressed: &[u8]) -> Result<Self> {
        let inflated = inflate(compressed)?;
        parse_loose(&inflated)
    }

    /// Deserializes and verifies that the content hashes to `expected`.
    ///
    /// The hash covers the full inflated stream, header included, so a
    /// truncated or tampered file is rejected before the payload is used.
    pub fn decompress_verified(compressed: &[u8], expected: &ObjectId) -> Result<Self> {
        let inflated = inflate(compressed)?;

        let mut hasher = Sha1::new();
        hasher.update(&inflated);
        if hasher.finalize().as_slice() != expected.as_bytes() {
            return Err(StorageError::CorruptObject(expected.to_hex()));
        }

        parse_loose(&inflated)
    }
}

fn inflate(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut inflated = Vec::new();
    decoder.read_to_end(&mut inflated)?;
    Ok(inflated)
}

/// Parses `<kind> <size>\0<payload>` into an object.
fn parse_loose(inflated: &[u8]) -> Result<GitObject> {
    let nul = inflated
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| StorageError::CorruptHeader("missing NUL".to_string()))?;

    let header = std::str::from_utf8(&inflated[..nul])
        .map_err(|_| StorageError::CorruptHeader("header is not UTF-8".to_string()))?;

    let mut parts = header.split(' ');
    let (kind_str, size_str) = match (parts.next(), parts.next(), parts.next()) {
        (Some(kind), Some(size), None) => (kind, size),
        _ => return Err(StorageError::CorruptHeader(header.to_string())),
    };

    let kind = ObjectKind::parse(kind_str)?;
    let size: usize = size_str
        .parse()
        .map_err(|_| StorageError::BadSize(size_str.to_string()))?;

    let payload = &inflated[nul + 1..];
    if payload.len() != size {
        return Err(StorageError::ShortPayload {
            expected: size,
            actual: payload.len(),
        });
    }

    Ok(GitObject::new(kind, payload.to_vec()))
}
