use std::{
    collections::{BTreeMap, HashMap},
    fmt::{Display, Formatter},
};

use log::trace;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Malformed ref listing at line {line_number}: expected `<commit>\\t<refname>`, got `{line}`")]
pub struct ListingParseError {
    pub line_number: usize,
    pub line: String,
}

/// Refs advertised by a remote, as printed by `git ls-remote`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefMap {
    ref_to_commit: BTreeMap<String, String>,
    commit_to_ref: HashMap<String, String>,
}

/// The outcome of divining a revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedRevision {
    /// A ref pointing at `commit`, for display only.
    pub ref_name: Option<String>,
    pub commit: String,
}

impl RefMap {
    /// Parses newline separated `<commit>\t<refname>` pairs. Blank lines are
    /// skipped, anything else without a tab is an error.
    pub fn parse(listing: &str) -> Result<RefMap, ListingParseError> {
        let mut refs = RefMap::default();
        for (index, line) in listing.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            match line.split_once('\t') {
                Some((commit, ref_name)) if !commit.is_empty() && !ref_name.is_empty() => {
                    refs.insert(ref_name, commit);
                }
                _ => {
                    return Err(ListingParseError {
                        line_number: index + 1,
                        line: line.to_string(),
                    })
                }
            }
        }
        Ok(refs)
    }

    pub fn insert(&mut self, ref_name: &str, commit: &str) {
        self.ref_to_commit
            .insert(ref_name.to_string(), commit.to_string());
        self.commit_to_ref
            .insert(commit.to_string(), ref_name.to_string());
    }

    pub fn commit(&self, ref_name: &str) -> Option<&str> {
        self.ref_to_commit.get(ref_name).map(String::as_str)
    }

    pub fn ref_name(&self, commit: &str) -> Option<&str> {
        self.commit_to_ref.get(commit).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ref_to_commit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ref_to_commit.is_empty()
    }

    /// Maps `revision` to a commit.
    ///
    /// Branches win over tags, tags over any other ref with that exact name
    /// (e.g. `HEAD`). A revision matching nothing is taken to be a commit id.
    /// For tags the peeled `^{}` entry is used when the remote advertises one,
    /// so annotated tags resolve to the commit they point at.
    pub fn divine(&self, revision: &str) -> ResolvedRevision {
        let candidates = [
            format!("refs/heads/{revision}"),
            format!("refs/tags/{revision}^{{}}"),
            format!("refs/tags/{revision}"),
            revision.to_string(),
        ];

        let commit = candidates
            .iter()
            .find_map(|candidate| {
                let commit = self.commit(candidate)?;
                trace!("Revision {} matched {} -> {}", revision, candidate, commit);
                Some(commit.to_string())
            })
            .unwrap_or_else(|| {
                trace!("Revision {} matched no ref, using it as a commit", revision);
                revision.to_string()
            });

        ResolvedRevision {
            ref_name: self.ref_name(&commit).map(str::to_string),
            commit,
        }
    }
}

impl Display for ResolvedRevision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.ref_name {
            Some(ref_name) => write!(f, "{} ({})", self.commit, ref_name),
            None => write!(f, "{}", self.commit),
        }
    }
}
