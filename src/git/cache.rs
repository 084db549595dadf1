use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    flock::FileLock,
    git::repository::GitWorkingCopy,
    model::{RepositorySpec, ResolvedRevision},
    process::{CommandRunner, ProcessError},
};

/// Directory under the cache root holding the per-entry lock files.
pub(crate) const LOCKS_DIR: &str = ".locks";

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(300);

pub struct GimportGitCache {
    location: PathBuf,
    mirror: Option<PathBuf>,
    versioning: bool,
    lock_timeout: Duration,
    dry_run: bool,
    runner: Box<dyn CommandRunner>,
}

/// A checked out cache entry. Other processes cannot touch the entry until
/// this is dropped.
#[derive(Debug)]
pub struct CacheEntry {
    path: PathBuf,
    _lock: Option<FileLock>,
}

impl CacheEntry {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the lock and returns the path.
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache location {location} is not a directory")]
    BadLocation { location: String },
    #[error("Cache entry lock cannot be acquired: {0}")]
    Lock(#[from] crate::flock::Error),
    #[error("Failed to clone {url} into {}: {message}", target.display())]
    Clone {
        url: String,
        target: PathBuf,
        message: String,
    },
    #[error("Cannot clone into {}: it exists and is not a git working copy", target.display())]
    Collision { target: PathBuf },
    #[error("Failed to check out commit {commit} in {}: {message}", target.display())]
    Checkout {
        commit: String,
        target: PathBuf,
        message: String,
    },
    #[error("`{command}` failed in {}: {message}", target.display())]
    Git {
        command: String,
        target: PathBuf,
        message: String,
    },
    #[error("Error while running git: {0}")]
    Process(#[from] ProcessError),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

impl GimportGitCache {
    pub fn new(
        location: PathBuf,
        mirror: Option<PathBuf>,
        versioning: bool,
        runner: Box<dyn CommandRunner>,
    ) -> Result<GimportGitCache, CacheError> {
        if location.exists() && !location.is_dir() {
            return Err(CacheError::BadLocation {
                location: location.to_string_lossy().to_string(),
            });
        }

        Ok(GimportGitCache {
            location,
            mirror,
            versioning,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            dry_run: false,
            runner,
        })
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// In dry run mode nothing is created on disk and no locks are taken;
    /// the runner is expected to not execute anything either.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub(crate) fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        if self.location.exists() {
            info!(
                "Clearing gimport repository cache {}.",
                &self.location.display()
            );
            if !self.dry_run {
                std::fs::remove_dir_all(&self.location)?;
            }
        }
        Ok(())
    }

    /// `<cache>/<repo_name>`, or `<cache>/<repo_name>/<commit>` with versioning.
    pub fn entry_path(&self, spec: &RepositorySpec, commit: &str) -> PathBuf {
        let path = self.location.join(spec.to_path());
        if self.versioning {
            path.join(escape(commit))
        } else {
            path
        }
    }

    /// Brings the cache entry for `resolved` into a clean checkout of exactly
    /// that commit and returns it, still locked.
    ///
    /// Cloning happens only when the entry does not exist yet. Cleaning and
    /// checking out happen on every call, so a working copy dirtied by a
    /// previous consumer is restored before it is handed out again.
    pub fn checkout(
        &self,
        spec: &RepositorySpec,
        resolved: &ResolvedRevision,
    ) -> Result<CacheEntry, CacheError> {
        let commit = resolved.commit.as_str();
        let target = self.entry_path(spec, commit);

        let lock = if self.dry_run {
            None
        } else {
            Some(self.lock_entry(spec, commit)?)
        };

        let working_copy = if target.exists() {
            debug!("Found {} at {}", spec.repo_name, target.display());
            GitWorkingCopy::open(self.runner(), &target)?
        } else {
            self.clone_entry(spec, &target)?
        };

        if !working_copy.has_commit(commit)? {
            debug!("Commit {} is not in {}", commit, target.display());
            if let Err(error) = working_copy.fetch_commit(commit) {
                // Checkout below reports the commit that could not be found.
                warn!("Could not fetch {}: {}", commit, error);
            }
        }

        working_copy.clean()?;
        working_copy.checkout(commit)?;

        Ok(CacheEntry {
            path: target,
            _lock: lock,
        })
    }

    fn clone_entry(
        &self,
        spec: &RepositorySpec,
        target: &Path,
    ) -> Result<GitWorkingCopy<'_>, CacheError> {
        if !self.dry_run {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mirror = self.mirror_entry(spec);
        let url = spec.url();

        GitWorkingCopy::clone_remote(
            self.runner(),
            &url,
            target,
            mirror.as_deref(),
            &self.location,
        )
        .map_err(|error| {
            if !self.dry_run && target.exists() {
                debug!("Removing partial clone at {}", target.display());
                if let Err(remove_error) = std::fs::remove_dir_all(target) {
                    warn!(
                        "Could not remove partial clone at {}: {}",
                        target.display(),
                        remove_error
                    );
                }
            }
            error
        })
    }

    fn mirror_entry(&self, spec: &RepositorySpec) -> Option<PathBuf> {
        let mirror = self.mirror.as_ref()?.join(spec.to_path());
        if mirror.exists() {
            Some(mirror)
        } else {
            debug!("No mirror for {} at {}", spec.repo_name, mirror.display());
            None
        }
    }

    fn lock_entry(&self, spec: &RepositorySpec, commit: &str) -> Result<FileLock, CacheError> {
        let mut name = escape(&spec.repo_name);
        if self.versioning {
            name.push('@');
            name.push_str(&escape(commit));
        }
        name.push_str(".lock");

        let location = self.location.join(LOCKS_DIR).join(name);
        debug!("Acquiring a lock on {}", location.display());
        let lock = FileLock::new(&location, self.lock_timeout)?;
        Ok(lock)
    }
}

// Literal revisions end up in paths; keep each one a single path segment.
fn escape(segment: &str) -> String {
    match segment {
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        _ => segment.replace('%', "%25").replace('/', "%2F"),
    }
}
