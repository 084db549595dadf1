mod git;

use std::path::{Path, PathBuf};

pub use crate::git::cache::{CacheEntry, CacheError, GimportGitCache};

use crate::model::{RepositorySpec, ResolvedRevision};

pub trait RepositoryCache {
    /// Returns the path of a clean working copy of exactly `resolved.commit`.
    fn materialize(
        &self,
        spec: &RepositorySpec,
        resolved: &ResolvedRevision,
    ) -> Result<PathBuf, CacheError>;

    /// Root directory that all entries live under.
    fn location(&self) -> &Path;
}
