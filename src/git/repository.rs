use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::process::{CommandRunner, ProcessCommand, ProcessOutput};

use super::cache::CacheError;

/// A non-bare clone inside the cache.
pub struct GitWorkingCopy<'a> {
    runner: &'a dyn CommandRunner,
    path: PathBuf,
}

impl<'a> GitWorkingCopy<'a> {
    /// Opens an existing cache entry. A directory that is not a git working
    /// copy is a collision: something else already lives at that path.
    pub fn open(runner: &'a dyn CommandRunner, path: &Path) -> Result<Self, CacheError> {
        if !path.join(".git").exists() {
            return Err(CacheError::Collision {
                target: path.to_path_buf(),
            });
        }
        Ok(GitWorkingCopy {
            runner,
            path: path.to_path_buf(),
        })
    }

    /// Clones `url` into `target`, borrowing objects from `mirror` when given.
    ///
    /// The working tree is left empty; callers check out the wanted commit.
    pub fn clone_remote(
        runner: &'a dyn CommandRunner,
        url: &str,
        target: &Path,
        mirror: Option<&Path>,
        current_dir: &Path,
    ) -> Result<Self, CacheError> {
        let mut command = ProcessCommand::git().args(["clone", "--no-checkout"]);
        if let Some(mirror) = mirror {
            debug!("Using mirror {} for {}", mirror.display(), url);
            command = command
                .arg("--reference-if-able")
                .arg(mirror)
                .arg("--dissociate");
        }
        let command = command
            .arg("--")
            .arg(url)
            .arg(target)
            .current_dir(current_dir);

        info!("Cloning {} into {}", url, target.display());
        let clone_error = |message: String| CacheError::Clone {
            url: url.to_string(),
            target: target.to_path_buf(),
            message,
        };
        let output = runner
            .run(&command)
            .map_err(|error| clone_error(error.to_string()))?;
        if !output.success() {
            return Err(clone_error(describe_failure(&output)));
        }

        Ok(GitWorkingCopy {
            runner,
            path: target.to_path_buf(),
        })
    }

    pub fn has_commit(&self, commit: &str) -> Result<bool, CacheError> {
        let object = format!("{commit}^{{commit}}");
        let output = self.git(["cat-file", "-e", "--end-of-options", &object])?;
        Ok(output.success())
    }

    /// Fetches a single commit from origin, falling back to a fetch of all
    /// branches and tags when the server refuses to serve it by id.
    pub fn fetch_commit(&self, commit: &str) -> Result<(), CacheError> {
        let output = self.git(["fetch", "--end-of-options", "origin", commit])?;
        if output.success() {
            return Ok(());
        }
        warn!(
            "Failed to fetch a single commit {}, falling back to a full fetch: {}",
            commit,
            output.stderr.trim()
        );
        self.git_checked(["fetch", "--tags", "origin"])
    }

    /// Removes untracked and ignored files, including nested repositories.
    pub fn clean(&self) -> Result<(), CacheError> {
        self.git_checked(["clean", "-ffdx"])
    }

    /// Forces the working tree to `commit`, discarding local modifications.
    pub fn checkout(&self, commit: &str) -> Result<(), CacheError> {
        let checkout_error = |message: String| CacheError::Checkout {
            commit: commit.to_string(),
            target: self.path.clone(),
            message,
        };
        let output = self
            .run(["checkout", "--force", "--detach", "--end-of-options", commit])
            .map_err(|error| checkout_error(error.to_string()))?;
        if !output.success() {
            return Err(checkout_error(describe_failure(&output)));
        }
        debug!("Checked out {} in {}", commit, self.path.display());
        Ok(())
    }

    fn run<const N: usize>(
        &self,
        args: [&str; N],
    ) -> Result<ProcessOutput, crate::process::ProcessError> {
        self.runner.run(
            &ProcessCommand::git()
                .args(args)
                .current_dir(&self.path),
        )
    }

    fn git<const N: usize>(&self, args: [&str; N]) -> Result<ProcessOutput, CacheError> {
        Ok(self.run(args)?)
    }

    fn git_checked<const N: usize>(&self, args: [&str; N]) -> Result<(), CacheError> {
        let output = self.git(args)?;
        if output.success() {
            Ok(())
        } else {
            Err(CacheError::Git {
                command: format!("git {}", args.join(" ")),
                target: self.path.clone(),
                message: describe_failure(&output),
            })
        }
    }
}

pub(crate) fn describe_failure(output: &ProcessOutput) -> String {
    let stderr = output.stderr.trim();
    match output.exit_code {
        Some(code) if stderr.is_empty() => format!("exit code {code}"),
        Some(code) => format!("exit code {code}: {stderr}"),
        None if stderr.is_empty() => "terminated by a signal".to_string(),
        None => format!("terminated by a signal: {stderr}"),
    }
}
