//! core::ops::lock
//!
//! Exclusive lock on the upstream working tree.
//!
//! # Architecture
//!
//! A reconstruction checks out, resets and rewrites the upstream tree, so
//! only one kexplode run may touch it at a time. The lock file lives in the
//! upstream repository's git directory:
//!
//! - `<git_dir>/kexplode.lock` - Lock file with OS-level exclusive lock
//!
//! # Invariants
//!
//! - Lock is held for the whole pipeline run
//! - Lock is automatically released on drop (RAII pattern)
//! - Lock acquisition is non-blocking (fails fast if locked)
//!
//! # Example
//!
//! ```ignore
//! use kexplode::core::ops::lock::WorkTreeLock;
//!
//! let lock = WorkTreeLock::acquire(git.git_dir())?;
//! // reconstruct ...
//! drop(lock);
//! ```

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::lock_path;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("upstream tree is locked by another kexplode process ({path})")]
    AlreadyLocked { path: PathBuf },

    /// Failed to create the lock file.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// An exclusive lock on the upstream working tree.
///
/// Released when dropped.
#[derive(Debug)]
pub struct WorkTreeLock {
    path: PathBuf,
    file: Option<File>,
}

impl WorkTreeLock {
    /// Acquire the lock for the repository whose git directory is `git_dir`.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another process holds the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(git_dir: &Path) -> Result<Self, LockError> {
        let path = lock_path(git_dir);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(LockError::AlreadyLocked { path })
            }
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock before the guard goes out of scope.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for WorkTreeLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}
