use std::{
    fmt::{Display, Formatter},
    path::PathBuf,
};

use regex_lite::Regex;
use thiserror::Error;

use crate::git::cache::LOCKS_DIR;

pub const DEFAULT_REVISION: &str = "HEAD";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecompositionError {
    #[error("Repository specification `{spec}` does not match `[<remote><sep>]<repo-name>[@<revision>]`")]
    Malformed { spec: String },
    #[error("Invalid repository name `{repo_name}` in `{spec}`: {reason}")]
    InvalidRepoName {
        spec: String,
        repo_name: String,
        reason: &'static str,
    },
    #[error("Invalid revision `{revision}` in `{spec}`: {reason}")]
    InvalidRevision {
        spec: String,
        revision: String,
        reason: &'static str,
    },
    #[error("Repository specification `{spec}` has no remote and no default remote is configured")]
    MissingRemote { spec: String },
}

/// A decomposed repository specification, e.g. `git@github.com:org/repo@v1.2`.
///
/// The remote locator is kept verbatim and is only ever handed to git.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositorySpec {
    pub remote_url: String,
    pub separator: String,
    pub repo_name: String,
    pub revision: String,
}

impl RepositorySpec {
    /// Splits `spec` into its parts, taking the remote from `default_remote`
    /// when the string does not carry one.
    ///
    /// A leading remote locator is recognised in three shapes, tried in order:
    /// `<scheme>://[<user>@]<host>[:<port>]<sep>`, scp-like `[<user>@]<host>:`
    /// and `[<user>@]<host>/` where the host has a dot in it or is `localhost`.
    /// Anything else is read as a bare repository name.
    pub fn decompose(
        spec: &str,
        default_remote: Option<&str>,
    ) -> Result<RepositorySpec, DecompositionError> {
        let spec = spec.trim();
        let malformed = || DecompositionError::Malformed {
            spec: spec.to_string(),
        };

        let (remote, rest) = match split_remote(spec) {
            Some((remote_url, separator, rest)) => (Some((remote_url, separator)), rest),
            None => (None, spec),
        };

        let re = Regex::new(r"^(?P<name>[A-Za-z0-9_.\-/]+)(?:@(?P<revision>\S+))?$").unwrap();
        let captures = re.captures(rest).ok_or_else(malformed)?;
        let repo_name = captures
            .name("name")
            .map(|m| m.as_str().to_string())
            .ok_or_else(malformed)?;
        let revision = captures
            .name("revision")
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| DEFAULT_REVISION.to_string());

        validate_repo_name(spec, &repo_name)?;
        validate_revision(spec, &revision)?;

        let (remote_url, separator) = match remote {
            Some(remote) => remote,
            None => default_remote
                .map(str::trim)
                .filter(|remote| !remote.is_empty())
                .map(split_default_remote)
                .ok_or_else(|| DecompositionError::MissingRemote {
                    spec: spec.to_string(),
                })?,
        };

        Ok(RepositorySpec {
            remote_url,
            separator,
            repo_name,
            revision,
        })
    }

    /// The locator passed to `git ls-remote` and `git clone`.
    pub fn url(&self) -> String {
        format!("{}{}{}", self.remote_url, self.separator, self.repo_name)
    }

    /// The repository name as a relative path inside the cache.
    pub fn to_path(&self) -> PathBuf {
        self.repo_name.split('/').collect()
    }
}

impl Display for RepositorySpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.url(), self.revision)
    }
}

fn split_remote(spec: &str) -> Option<(String, String, &str)> {
    let patterns = [
        // scheme://[user@]host[:port]
        r"^(?P<remote>[A-Za-z][A-Za-z0-9+.\-]*://(?:[A-Za-z0-9_.\-~%]+@)?[A-Za-z0-9_.\-]*(?::[0-9]+)?)(?P<sep>[:/]{1,2})(?P<rest>.*)$",
        // [user@]host:
        r"^(?P<remote>(?:[A-Za-z0-9_.\-]+@)?[A-Za-z0-9_.\-]+)(?P<sep>:[:/]?)(?P<rest>.*)$",
        // [user@]host.tld/
        r"^(?P<remote>(?:[A-Za-z0-9_.\-]+@)?(?:[A-Za-z0-9_\-]+(?:\.[A-Za-z0-9_\-]+)+|localhost))(?P<sep>//?)(?P<rest>.*)$",
    ];

    patterns.iter().find_map(|pattern| {
        let re = Regex::new(pattern).unwrap();
        let captures = re.captures(spec)?;
        let remote = captures.name("remote")?.as_str();
        let separator = captures.name("sep")?.as_str();
        let rest = captures.name("rest")?.as_str();
        Some((remote.to_string(), separator.to_string(), rest))
    })
}

// At most two trailing separator characters belong to the separator.
fn split_default_remote(remote: &str) -> (String, String) {
    let trailing = remote
        .chars()
        .rev()
        .take_while(|c| *c == ':' || *c == '/')
        .take(2)
        .count();
    let (remote_url, separator) = remote.split_at(remote.len() - trailing);
    let separator = if separator.is_empty() { "/" } else { separator };
    (remote_url.to_string(), separator.to_string())
}

fn validate_repo_name(spec: &str, repo_name: &str) -> Result<(), DecompositionError> {
    let invalid = |reason| DecompositionError::InvalidRepoName {
        spec: spec.to_string(),
        repo_name: repo_name.to_string(),
        reason,
    };
    if repo_name.split('/').next() == Some(LOCKS_DIR) {
        return Err(invalid("reserved for lock files"));
    }
    for segment in repo_name.split('/') {
        match segment {
            "" => return Err(invalid("empty path segment")),
            "." | ".." => return Err(invalid("relative path segment")),
            _ => {}
        }
    }
    Ok(())
}

// Revisions that match no ref are handed to git and used as a path segment.
fn validate_revision(spec: &str, revision: &str) -> Result<(), DecompositionError> {
    let invalid = |reason| DecompositionError::InvalidRevision {
        spec: spec.to_string(),
        revision: revision.to_string(),
        reason,
    };
    if revision.starts_with('-') {
        return Err(invalid("must not start with `-`"));
    }
    if revision
        .split('/')
        .any(|segment| segment == "." || segment == "..")
    {
        return Err(invalid("relative path segment"));
    }
    Ok(())
}
