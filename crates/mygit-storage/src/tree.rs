//! Tree payload codec.
//!
//! A tree payload is a concatenation of entries sorted by name in byte
//! order, each entry being `"<mode> <name>\0"` followed by the 20-byte
//! binary child id.

use crate::{ObjectId, Result, StorageError};

/// File modes git records in tree entries, as their literal ASCII forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// `100644` — regular file.
    Regular,
    /// `100755` — executable file.
    Executable,
    /// `120000` — symbolic link.
    Symlink,
    /// `40000` — sub-tree. Note: no leading zero on the wire.
    Directory,
}

impl FileMode {
    /// Returns the literal mode string used in tree payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "100644",
            Self::Executable => "100755",
            Self::Symlink => "120000",
            Self::Directory => "40000",
        }
    }

    /// Parses a literal mode string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "100644" => Ok(Self::Regular),
            "100755" => Ok(Self::Executable),
            "120000" => Ok(Self::Symlink),
            "40000" => Ok(Self::Directory),
            _ => Err(StorageError::UnknownMode(s.to_string())),
        }
    }

    /// Returns true for the sub-tree mode.
    pub fn is_tree(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Returns the kind string shown by `ls-tree`.
    pub fn kind_str(&self) -> &'static str {
        if self.is_tree() {
            "tree"
        } else {
            "blob"
        }
    }
}

/// A single entry in a tree object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Entry mode.
    pub mode: FileMode,
    /// Path component. Never empty, never contains `/`, never `.git`.
    pub name: String,
    /// Id of the referenced blob or sub-tree.
    pub oid: ObjectId,
}

impl TreeEntry {
    /// Creates an entry, validating the name.
    pub fn new(mode: FileMode, name: impl Into<String>, oid: ObjectId) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self { mode, name, oid })
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StorageError::BadTree("empty entry name".to_string()));
    }
    if name.contains('/') {
        return Err(StorageError::BadTree(format!(
            "entry name contains '/': {name}"
        )));
    }
    if name == "." || name == ".." || name == ".git" {
        return Err(StorageError::BadTree(format!(
            "forbidden entry name: {name}"
        )));
    }
    Ok(())
}

/// Decodes a tree payload into its entries.
pub fn parse_tree(payload: &[u8]) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    let mut rest = payload;

    while !rest.is_empty() {
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| StorageError::BadTree("entry header missing NUL".to_string()))?;

        let header = std::str::from_utf8(&rest[..nul])
            .map_err(|_| StorageError::BadTree("entry header is not UTF-8".to_string()))?;
        let (mode_str, name) = header
            .split_once(' ')
            .ok_or_else(|| StorageError::BadTree(format!("malformed entry header: {header}")))?;

        let mode = FileMode::parse(mode_str)?;

        let oid_start = nul + 1;
        let oid_end = oid_start + 20;
        if rest.len() < oid_end {
            return Err(StorageError::BadTree("truncated entry id".to_string()));
        }
        let mut oid_bytes = [0u8; 20];
        oid_bytes.copy_from_slice(&rest[oid_start..oid_end]);

        entries.push(TreeEntry::new(mode, name, ObjectId::from_bytes(oid_bytes))?);
        rest = &rest[oid_end..];
    }

    Ok(entries)
}

/// Encodes entries into a tree payload.
///
/// Entries are sorted by name in byte order before emission; duplicate names
/// are rejected.
pub fn encode_tree(entries: &[TreeEntry]) -> Result<Vec<u8>> {
    let mut sorted: Vec<&TreeEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));

    for pair in sorted.windows(2) {
        if pair[0].name == pair[1].name {
            return Err(StorageError::BadTree(format!(
                "duplicate entry name: {}",
                pair[0].name
            )));
        }
    }

    let mut payload = Vec::new();
    for entry in sorted {
        payload.extend_from_slice(entry.mode.as_str().as_bytes());
        payload.push(b' ');
        payload.extend_from_slice(entry.name.as_bytes());
        payload.push(0);
        payload.extend_from_slice(entry.oid.as_bytes());
    }
    Ok(payload)
}
