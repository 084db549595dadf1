use std::{env, path::PathBuf, time::Duration};

use crate::{
    cache::{CacheError, GimportGitCache},
    git::cache::DEFAULT_LOCK_TIMEOUT,
    loader::{ContentLoader, TomlLoader},
    process::{CommandRunner, SystemRunner},
    Gimport,
};

const DEFAULT_CACHE_DIRECTORY: &str = ".gimport";

#[derive(Default)]
pub struct GimportBuilder {
    // All other paths are relative to `root`
    root: Option<PathBuf>,
    cache_directory_path: Option<PathBuf>,
    mirror_directory_path: Option<PathBuf>,
    default_remote: Option<String>,
    versioning: Option<bool>,
    git_timeout: Option<Duration>,
    lock_timeout: Option<Duration>,
    dry_run: bool,
    runner: Option<Box<dyn CommandRunner>>,
    loader: Option<Box<dyn ContentLoader>>,
}

impl GimportBuilder {
    /// Directory relative cache and mirror paths are resolved against.
    ///
    /// Defaults to the current directory.
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Location of the gimport cache directory.
    ///
    /// Defaults to `.gimport`.
    pub fn cache_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_directory_path = Some(path.into());
        self
    }

    /// Directory holding local copies of remotes, laid out like the cache
    /// (`<mirror>/<repo-name>`). Used to speed up clones only.
    pub fn mirror_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.mirror_directory_path = Some(path.into());
        self
    }

    /// Remote used when a repository specification does not name one,
    /// e.g. `git@github.com:`.
    pub fn default_remote(mut self, remote: impl Into<String>) -> Self {
        self.default_remote = Some(remote.into());
        self
    }

    /// Whether the resolved commit is part of the cache path, so several
    /// revisions of a repository can be cached side by side.
    ///
    /// Defaults to `true`.
    pub fn versioning(mut self, versioning: bool) -> Self {
        self.versioning = Some(versioning);
        self
    }

    /// Upper bound for every git invocation. Unbounded by default.
    pub fn git_timeout(mut self, timeout: Duration) -> Self {
        self.git_timeout = Some(timeout);
        self
    }

    /// How long to wait for another process working on the same cache entry.
    ///
    /// Defaults to 5 minutes.
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Log git commands instead of running them and leave the disk untouched.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Replaces the runner used for git commands.
    pub fn runner(mut self, runner: impl CommandRunner + 'static) -> Self {
        self.runner = Some(Box::new(runner));
        self
    }

    /// Replaces the loader turning files into symbols. Defaults to TOML.
    pub fn loader(mut self, loader: impl ContentLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    pub fn try_build(self) -> Result<Gimport, CacheError> {
        let Self {
            root,
            cache_directory_path,
            mirror_directory_path,
            default_remote,
            versioning,
            git_timeout,
            lock_timeout,
            dry_run,
            runner,
            loader,
        } = self;
        let root = match root {
            Some(root) => root,
            None => env::current_dir()?,
        };

        let cache_directory =
            root.join(cache_directory_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIRECTORY)));
        let mirror_directory = mirror_directory_path.map(|mirror| root.join(mirror));

        let runner = runner.unwrap_or_else(|| Box::new(SystemRunner::new(dry_run, git_timeout)));

        let cache = GimportGitCache::new(
            cache_directory,
            mirror_directory,
            versioning.unwrap_or(true),
            runner,
        )?
        .with_lock_timeout(lock_timeout.unwrap_or(DEFAULT_LOCK_TIMEOUT))
        .with_dry_run(dry_run);

        Ok(Gimport {
            cache,
            loader: loader.unwrap_or_else(|| Box::new(TomlLoader)),
            default_remote,
            dry_run,
        })
    }
}
