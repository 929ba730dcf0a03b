//! Commit payload codec.

use crate::{ObjectId, Result, StorageError};
use std::fmt;

/// An author or committer line: `<name> <<email>> <unix-seconds> <tz>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Personal name. Never contains `<`.
    pub name: String,
    /// Email address. Never contains `>`.
    pub email: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// Signed four-digit offset, e.g. `+0200`.
    pub tz: String,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <{}> {} {}",
            self.name, self.email, self.timestamp, self.tz
        )
    }
}

/// A parsed commit object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Id of the root tree.
    pub tree: ObjectId,
    /// Parent commit ids, in order.
    pub parents: Vec<ObjectId>,
    /// Author signature.
    pub author: Signature,
    /// Committer signature.
    pub committer: Signature,
    /// Free-form message, bytes preserved verbatim.
    pub message: Vec<u8>,
}

impl Commit {
    /// Serializes to the commit payload format.
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(format!("tree {}\n", self.tree).as_bytes());
        for parent in &self.parents {
            payload.extend_from_slice(format!("parent {}\n", parent).as_bytes());
        }
        payload.extend_from_slice(format!("author {}\n", self.author).as_bytes());
        payload.extend_from_slice(format!("committer {}\n", self.committer).as_bytes());
        payload.push(b'\n');
        payload.extend_from_slice(&self.message);
        payload
    }

    /// Parses a commit payload.
    ///
    /// Strict line-oriented form: `tree`, zero or more `parent`, exactly one
    /// `author`, exactly one `committer`, then headers we do not understand
    /// (gpgsig, mergetag, encoding) are skipped up to the blank line that
    /// starts the message.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut lines = HeaderLines::new(payload);

        let tree_line = lines.next_header()?;
        let tree_hex = tree_line
            .strip_prefix("tree ")
            .ok_or_else(|| bad("first header is not tree"))?;
        let tree = ObjectId::from_hex(tree_hex).map_err(|_| bad("malformed tree id"))?;

        let mut parents = Vec::new();
        let mut line = lines.next_header()?;
        while let Some(parent_hex) = line.strip_prefix("parent ") {
            parents.push(ObjectId::from_hex(parent_hex).map_err(|_| bad("malformed parent id"))?);
            line = lines.next_header()?;
        }

        let author = match line.strip_prefix("author ") {
            Some(rest) => parse_signature(rest)?,
            None => return Err(bad("missing author")),
        };

        let committer_line = lines.next_header()?;
        let committer = match committer_line.strip_prefix("committer ") {
            Some(rest) => parse_signature(rest)?,
            None => return Err(bad("missing committer")),
        };

        // Extra headers (and their indented continuation lines) are skipped.
        loop {
            match lines.peek()? {
                None => break,
                Some(extra) if extra.starts_with("author ") || extra.starts_with("committer ") => {
                    return Err(bad("duplicate signature header"));
                }
                Some(_) => {
                    lines.next_header()?;
                }
            }
        }

        Ok(Self {
            tree,
            parents,
            author,
            committer,
            message: lines.into_message()?,
        })
    }
}

fn bad(reason: &str) -> StorageError {
    StorageError::BadCommit(reason.to_string())
}

/// Parses the part of a signature line after the role keyword.
fn parse_signature(rest: &str) -> Result<Signature> {
    let lt = rest.find('<').ok_or_else(|| bad("signature missing <"))?;
    if lt < 2 || !rest[..lt].ends_with(' ') {
        return Err(bad("signature missing name"));
    }
    let name = &rest[..lt - 1];

    let after_lt = &rest[lt + 1..];
    let gt = after_lt
        .find('>')
        .ok_or_else(|| bad("signature missing >"))?;
    let email = &after_lt[..gt];

    let tail = after_lt[gt + 1..]
        .strip_prefix(' ')
        .ok_or_else(|| bad("signature missing timestamp"))?;
    let (ts_str, tz) = tail
        .split_once(' ')
        .ok_or_else(|| bad("signature missing timezone"))?;

    if ts_str.is_empty() || !ts_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad("signature timestamp is not decimal"));
    }
    let timestamp: i64 = ts_str
        .parse()
        .map_err(|_| bad("signature timestamp out of range"))?;

    let digits = tz.strip_prefix(['+', '-']).unwrap_or(tz);
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad("signature timezone is not a four-digit offset"));
    }

    Ok(Signature {
        name: name.to_string(),
        email: email.to_string(),
        timestamp,
        tz: tz.to_string(),
    })
}

/// Iterates the header section of a commit payload, then yields the message.
struct HeaderLines<'a> {
    rest: &'a [u8],
}

impl<'a> HeaderLines<'a> {
    fn new(payload: &'a [u8]) -> Self {
        Self { rest: payload }
    }

    /// Returns the next header line without consuming it, or `None` at the
    /// blank separator line.
    fn peek(&self) -> Result<Option<&'a str>> {
        let nl = self
            .rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| bad("unterminated header line"))?;
        if nl == 0 {
            return Ok(None);
        }
        let line = std::str::from_utf8(&self.rest[..nl])
            .map_err(|_| bad("header line is not UTF-8"))?;
        Ok(Some(line))
    }

    fn next_header(&mut self) -> Result<&'a str> {
        match self.peek()? {
            Some(line) => {
                self.rest = &self.rest[line.len() + 1..];
                Ok(line)
            }
            None => Err(bad("unexpected end of headers")),
        }
    }

    /// Consumes the blank separator and returns the remaining message bytes.
    fn into_message(self) -> Result<Vec<u8>> {
        match self.rest.first() {
            Some(b'\n') => Ok(self.rest[1..].to_vec()),
            _ => Err(bad("missing blank line before message")),
        }
    }
}
