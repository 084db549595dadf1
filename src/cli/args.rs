use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Loads TOML files from pinned revisions of remote git repositories.
#[derive(Debug, Parser)]
#[command(version)]
pub struct CliArgs {
    #[command(subcommand)]
    pub cmd: Command,
    /// Location of the gimport cache directory [default: .gimport]
    #[arg(short, long, global = true)]
    pub cache_dir: Option<PathBuf>,
    /// Directory with local copies of remotes, used as clone references
    #[arg(long, global = true)]
    pub mirror_dir: Option<PathBuf>,
    /// Remote used when a repository specification does not name one,
    /// e.g. `git@github.com:`
    #[arg(short, long, global = true)]
    pub remote: Option<String>,
    /// Share one working copy between all revisions of a repository
    #[arg(long, global = true)]
    pub no_versioning: bool,
    /// Timeout in seconds for every git command
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
    /// Print git commands instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,
    /// Configuration file [default: $HOME/.config/gimport/config.toml]
    #[arg(long, global = true, env = "GIMPORT_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Loads a TOML file from a repository revision and prints its symbols
    Import {
        /// Repository specification, e.g. `org/repo@v1.2.0`
        repospec: String,
        /// Path of the file inside the repository
        filepath: PathBuf,
        /// Only print these symbols
        #[arg(short, long, num_args = 1..)]
        imports: Option<Vec<String>>,
        /// Remove the working copy from the cache after loading
        #[arg(long)]
        no_persist: bool,
    },
    /// Prints the commit a repository specification resolves to
    Resolve { repospec: String },
    /// Checks a repository revision out into the cache and prints its path
    Checkout { repospec: String },
    /// Removes the cache directory
    ClearCache,
}
