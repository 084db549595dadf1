mod git;

use thiserror::Error;

use crate::model::{ListingParseError, ResolvedRevision};

pub trait RevisionResolver {
    /// Turns a symbolic `revision` of the repository at `remote` into a commit.
    fn divine(&self, remote: &str, revision: &str) -> Result<ResolvedRevision, ResolveError>;
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Could not list refs of {remote}: {message}")]
    RemoteQuery { remote: String, message: String },
    #[error("Unexpected ref listing from {remote}: {source}")]
    Parse {
        remote: String,
        source: ListingParseError,
    },
}
