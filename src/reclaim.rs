use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use thiserror::Error;

/// A cache entry, or one of its parents, that could not be removed.
#[derive(Error, Debug)]
#[error("Could not reclaim {}: {source}", path.display())]
pub struct ReclaimWarning {
    pub path: PathBuf,
    pub source: std::io::Error,
}

/// Removes the working copy at `path`, then every parent directory below
/// `cache_root` that is left empty.
///
/// Never fails: the walk stops at the first directory that still has other
/// entries in it, and any removal error is logged and handed back.
pub fn reclaim(path: &Path, cache_root: &Path) -> Option<ReclaimWarning> {
    info!("Removing {}", path.display());
    match std::fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(error) if error.kind() == ErrorKind::NotFound => {
            debug!("{} is already removed, nothing to do", path.display());
        }
        Err(source) => return Some(warning(path, source)),
    }

    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == cache_root || !dir.starts_with(cache_root) {
            break;
        }
        match std::fs::remove_dir(dir) {
            Ok(()) => debug!("Removed empty directory {}", dir.display()),
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(_) if has_entries(dir) => {
                debug!("{} is still in use, keeping it", dir.display());
                break;
            }
            Err(source) => return Some(warning(dir, source)),
        }
        current = dir.parent();
    }
    None
}

fn has_entries(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn warning(path: &Path, source: std::io::Error) -> ReclaimWarning {
    let warning = ReclaimWarning {
        path: path.to_path_buf(),
        source,
    };
    warn!("{}", warning);
    warning
}
