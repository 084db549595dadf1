use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::{
    cache::{CacheEntry, CacheError, GimportGitCache, RepositoryCache},
    loader::{self, ContentLoader, LoadError, Symbols},
    model::{DecompositionError, RepositorySpec, ResolvedRevision},
    reclaim::{reclaim, ReclaimWarning},
    resolver::{ResolveError, RevisionResolver},
};

mod builder;

pub use builder::GimportBuilder;

pub struct Gimport {
    cache: GimportGitCache,
    loader: Box<dyn ContentLoader>,
    default_remote: Option<String>,
    dry_run: bool,
}

/// Per-import options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Keep the working copy in the cache after loading. Defaults to `true`.
    pub persist: bool,
    /// Only return these symbols; every one of them must exist.
    pub imports: Option<Vec<String>>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            persist: true,
            imports: None,
        }
    }
}

#[derive(Debug)]
pub struct Imported {
    pub spec: RepositorySpec,
    pub resolved: ResolvedRevision,
    /// Working copy the file was loaded from. Gone when not persisted.
    pub path: PathBuf,
    pub file: PathBuf,
    pub symbols: Symbols,
    pub reclaim_warning: Option<ReclaimWarning>,
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Error while decomposing repository specification: {0}")]
    Decomposition(#[from] DecompositionError),
    #[error("Error while resolving revision: {0}")]
    Resolve(#[from] ResolveError),
    #[error("Error while materializing cache entry: {0}")]
    Cache(#[from] CacheError),
    #[error("Error while loading file: {0}")]
    Load(#[from] LoadError),
}

impl Gimport {
    pub fn builder() -> GimportBuilder {
        GimportBuilder::default()
    }

    pub fn cache_location(&self) -> &Path {
        self.cache.location()
    }

    pub fn decompose(&self, repospec: &str) -> Result<RepositorySpec, DecompositionError> {
        RepositorySpec::decompose(repospec, self.default_remote.as_deref())
    }

    pub fn divine(&self, spec: &RepositorySpec) -> Result<ResolvedRevision, ResolveError> {
        self.cache.divine(&spec.url(), &spec.revision)
    }

    pub fn materialize(
        &self,
        spec: &RepositorySpec,
        resolved: &ResolvedRevision,
    ) -> Result<PathBuf, CacheError> {
        self.cache.materialize(spec, resolved)
    }

    /// Decomposes, resolves and materializes `repospec`, returning the
    /// checkout path.
    pub fn checkout(
        &self,
        repospec: &str,
    ) -> Result<(RepositorySpec, ResolvedRevision, PathBuf), ImportError> {
        let (spec, resolved, entry) = self.checkout_entry(repospec)?;
        Ok((spec, resolved, entry.into_path()))
    }

    fn checkout_entry(
        &self,
        repospec: &str,
    ) -> Result<(RepositorySpec, ResolvedRevision, CacheEntry), ImportError> {
        let spec = self.decompose(repospec)?;
        let resolved = self.divine(&spec)?;
        let entry = self.cache.checkout(&spec, &resolved)?;
        Ok((spec, resolved, entry))
    }

    /// Loads `file_path` from the revision of the repository named by
    /// `repospec`.
    ///
    /// The cache entry stays locked until the file is loaded and, with
    /// `persist` off, reclaimed. Reclaiming happens whether or not the load
    /// succeeded. Failing to reclaim is reported in
    /// [`Imported::reclaim_warning`] and never fails the import.
    ///
    /// In dry run mode nothing is loaded and the returned symbols are empty.
    pub fn import(
        &self,
        repospec: &str,
        file_path: impl AsRef<Path>,
        options: &ImportOptions,
    ) -> Result<Imported, ImportError> {
        let file_path = file_path.as_ref();
        loader::check_relative(file_path)?;

        let (spec, resolved, entry) = self.checkout_entry(repospec)?;
        let path = entry.path().to_path_buf();
        let file = path.join(file_path);

        if self.dry_run {
            info!("Dry run, skipping load of {}", file.display());
            return Ok(Imported {
                spec,
                resolved,
                path,
                file,
                symbols: Symbols::new(),
                reclaim_warning: None,
            });
        }

        let unit_name = loader::unit_name(file_path);
        let loaded = self.loader.load(&file, &unit_name);

        let reclaim_warning = if options.persist {
            None
        } else {
            reclaim(&path, self.cache.location())
        };
        drop(entry);

        let symbols = match &options.imports {
            Some(imports) => loader::select(loaded?, imports, &file)?,
            None => loaded?,
        };
        info!(
            "Imported {} symbol(s) from {} at {}",
            symbols.len(),
            file_path.display(),
            resolved
        );
        debug!("Loaded {} from {}", unit_name, file.display());

        Ok(Imported {
            spec,
            resolved,
            path,
            file,
            symbols,
            reclaim_warning,
        })
    }

    pub fn clear_cache(&self) -> Result<(), CacheError> {
        self.cache.clear()
    }
}
