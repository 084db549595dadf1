use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use fs4::fs_std::FileExt;
use log::{debug, trace};
use thiserror::Error;

const RETRY_INTERVAL: Duration = Duration::from_millis(250);

/// An exclusive advisory lock, held until dropped.
#[derive(Debug)]
pub struct FileLock {
    _file: File,
    path: PathBuf,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Timed out after {}s waiting for the lock on {}", timeout.as_secs(), path.display())]
    Timeout { path: PathBuf, timeout: Duration },
    #[error("Could not lock {}: {source}", path.display())]
    IO {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl FileLock {
    /// Blocks until the lock is acquired or `timeout` expires.
    pub fn new(path: &Path, timeout: Duration) -> Result<Self, Error> {
        let io_error = |source| Error::IO {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(io_error)?;

        let start = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(true) => {
                    trace!("Acquired lock {}", path.display());
                    return Ok(Self {
                        _file: file,
                        path: path.to_path_buf(),
                    });
                }
                Ok(false) => {}
                Err(error) if error.raw_os_error() == fs4::lock_contended_error().raw_os_error() => {}
                Err(error) => return Err(io_error(error)),
            }
            if start.elapsed() >= timeout {
                return Err(Error::Timeout {
                    path: path.to_path_buf(),
                    timeout,
                });
            }
            debug!("Failed to acquire a lock on {}, retrying", path.display());
            std::thread::sleep(RETRY_INTERVAL);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        trace!("Releasing lock {}", self.path.display());
    }
}
