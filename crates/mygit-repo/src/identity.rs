//! Commit identity resolution.
//!
//! Names, emails, and dates come from the `GIT_AUTHOR_*` /
//! `GIT_COMMITTER_*` environment variables, falling back to the OS username
//! and the current wall time. Reads go through the [`Environment`] trait so
//! commit ids are reproducible in tests.
//!
//! See: https://git-scm.com/book/en/v2/Git-Internals-Environment-Variables

use crate::{RepoError, Result};
use mygit_storage::Signature;

/// Source of environment variables, the OS username, and the clock.
pub trait Environment {
    /// Looks up an environment variable; empty values count as unset.
    fn var(&self, key: &str) -> Option<String>;

    /// Returns the OS username, when one is known.
    fn username(&self) -> Option<String>;

    /// Returns the current time as unix seconds plus a `±HHMM` offset.
    fn now(&self) -> (i64, String);
}

/// The real process environment and wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }

    fn username(&self) -> Option<String> {
        ["USER", "USERNAME", "LOGNAME"]
            .iter()
            .find_map(|key| self.var(key))
    }

    fn now(&self) -> (i64, String) {
        let now = chrono::Local::now();
        (now.timestamp(), now.format("%z").to_string())
    }
}

/// Resolves the author signature.
pub fn resolve_author(env: &dyn Environment) -> Result<Signature> {
    resolve_role(env, "GIT_AUTHOR_NAME", "GIT_AUTHOR_EMAIL", "GIT_AUTHOR_DATE")
}

/// Resolves the committer signature, defaulting to the author's fields.
pub fn resolve_committer(env: &dyn Environment, author: &Signature) -> Result<Signature> {
    let name = env
        .var("GIT_COMMITTER_NAME")
        .unwrap_or_else(|| author.name.clone());
    let email = env
        .var("GIT_COMMITTER_EMAIL")
        .unwrap_or_else(|| author.email.clone());
    let (timestamp, tz) = match env.var("GIT_COMMITTER_DATE") {
        Some(date) => parse_date(&date)?,
        None => (author.timestamp, author.tz.clone()),
    };

    Ok(Signature {
        name,
        email,
        timestamp,
        tz,
    })
}

fn resolve_role(
    env: &dyn Environment,
    name_key: &str,
    email_key: &str,
    date_key: &str,
) -> Result<Signature> {
    let name = env
        .var(name_key)
        .or_else(|| env.username())
        .ok_or_else(|| RepoError::MissingIdentity(format!("{name_key} not set")))?;
    let email = env
        .var(email_key)
        .or_else(|| env.username())
        .ok_or_else(|| RepoError::MissingIdentity(format!("{email_key} not set")))?;
    let (timestamp, tz) = match env.var(date_key) {
        Some(date) => parse_date(&date)?,
        None => env.now(),
    };

    Ok(Signature {
        name,
        email,
        timestamp,
        tz,
    })
}

/// Parses the `"<unix-seconds> <±HHMM>"` date format.
fn parse_date(value: &str) -> Result<(i64, String)> {
    let malformed = || RepoError::MissingIdentity(format!("malformed date: {value}"));

    let (secs_str, tz) = value.split_once(' ').ok_or_else(malformed)?;
    let secs: i64 = secs_str.parse().map_err(|_| malformed())?;

    let digits = tz.strip_prefix(['+', '-']).unwrap_or(tz);
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    Ok((secs, tz.to_string()))
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::Environment;
    use std::collections::HashMap;

    /// Deterministic environment for tests.
    pub struct FixedEnvironment {
        pub vars: HashMap<String, String>,
        pub username: Option<String>,
        pub now: (i64, String),
    }

    impl FixedEnvironment {
        pub fn new() -> Self {
            Self {
                vars: HashMap::new(),
                username: Some("tester".to_string()),
                now: (1234567890, "+0000".to_string()),
            }
        }

        pub fn with_var(mut self, key: &str, value: &str) -> Self {
            self.vars.insert(key.to_string(), value.to_string());
            self
        }
    }

    impl Environment for FixedEnvironment {
        fn var(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }

        fn username(&self) -> Option<String> {
            self.username.clone()
        }

        fn now(&self) -> (i64, String) {
            self.now.clone()
        }
    }
}
