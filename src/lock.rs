//! Single-instance lock
//!
//! At most one check cycle may run system-wide. The lock is a
//! non-blocking exclusive flock on a well-known file, acquired once at
//! process entry and held for the life of the run. Contention is a
//! normal outcome under timer-driven invocation, not an error.

use crate::error::{Error, Result};
use nix::fcntl::{Flock, FlockArg};
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Held exclusive lock; released on drop
pub struct LockHandle {
    _lock: Flock<File>,
}

impl LockHandle {
    /// Try to acquire the lock without blocking.
    ///
    /// Returns `Ok(None)` when another instance already holds it.
    /// Failing to open the lock file at all is a startup error.
    pub fn acquire(path: &Path) -> Result<Option<LockHandle>> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::LockOpen {
                path: path.to_path_buf(),
                source: e,
            })?;

        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => Ok(Some(LockHandle { _lock: lock })),
            Err((_file, _errno)) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vigil.lock");

        let handle = LockHandle::acquire(&path).unwrap();
        assert!(handle.is_some());

        // Released on drop; a second acquisition then succeeds.
        drop(handle);
        assert!(LockHandle::acquire(&path).unwrap().is_some());
    }

    #[test]
    fn test_contention_is_none_not_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vigil.lock");

        let _held = LockHandle::acquire(&path).unwrap().unwrap();
        // flock is per-open-file, so a second open in the same process
        // still contends.
        assert!(LockHandle::acquire(&path).unwrap().is_none());
    }

    #[test]
    fn test_unwritable_path_is_error() {
        let result = LockHandle::acquire(Path::new("/no/such/dir/vigil.lock"));
        assert!(result.is_err());
    }
}
