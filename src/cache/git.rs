use std::path::{Path, PathBuf};

use crate::{
    git::cache::{CacheEntry, CacheError, GimportGitCache},
    model::{RepositorySpec, ResolvedRevision},
};

use super::RepositoryCache;

impl RepositoryCache for GimportGitCache {
    fn materialize(
        &self,
        spec: &RepositorySpec,
        resolved: &ResolvedRevision,
    ) -> Result<PathBuf, CacheError> {
        self.checkout(spec, resolved).map(CacheEntry::into_path)
    }

    fn location(&self) -> &Path {
        GimportGitCache::location(self)
    }
}
