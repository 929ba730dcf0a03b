//! Commit history walking.

use crate::{Repository, Result};
use chrono::{DateTime, FixedOffset};
use mygit_storage::{Commit, ObjectId, ObjectKind};
use std::collections::HashSet;

/// A commit together with its id, as yielded by the history walk.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// The commit id.
    pub id: ObjectId,
    /// The parsed commit.
    pub commit: Commit,
}

/// Walks history breadth-first from `start`, yielding each commit once.
pub fn history(repo: &Repository, start: ObjectId) -> Result<Vec<LogEntry>> {
    let mut queue = vec![start];
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut entries = Vec::new();

    let mut cursor = 0;
    while cursor < queue.len() {
        let id = queue[cursor];
        cursor += 1;

        if !seen.insert(id) {
            continue;
        }

        let object = repo.get_kind(&id, ObjectKind::Commit)?;
        let commit = Commit::parse(&object.data)?;
        queue.extend(commit.parents.iter().copied());
        entries.push(LogEntry { id, commit });
    }

    Ok(entries)
}

/// Renders one history entry in the `log` output format.
pub fn format_entry(entry: &LogEntry) -> String {
    let author = &entry.commit.author;
    let message = String::from_utf8_lossy(&entry.commit.message);
    let message = message.trim_end_matches('\n').replace('\n', "\n\t");

    format!(
        "commit {}\nAuthor:\t{} <{}>\nDate: \t{} {}\n\n\t{}\n",
        entry.id,
        author.name,
        author.email,
        format_date(author.timestamp, &author.tz),
        author.tz,
        message,
    )
}

/// Formats unix seconds in the author's offset, `Mon Jan  2 15:04:05 2006`
/// style.
fn format_date(timestamp: i64, tz: &str) -> String {
    let offset = offset_seconds(tz).and_then(FixedOffset::east_opt);
    match (DateTime::from_timestamp(timestamp, 0), offset) {
        (Some(utc), Some(offset)) => utc
            .with_timezone(&offset)
            .format("%a %b %e %H:%M:%S %Y")
            .to_string(),
        _ => timestamp.to_string(),
    }
}

fn offset_seconds(tz: &str) -> Option<i32> {
    let (sign, digits) = match tz.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, tz.strip_prefix('+').unwrap_or(tz)),
    };
    if digits.len() != 4 {
        return None;
    }
    let hours = digits[..2].parse::<i32>().ok()?;
    let minutes = digits[2..].parse::<i32>().ok()?;
    Some(sign * (hours * 3600 + minutes * 60))
}
