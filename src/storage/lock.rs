//! Cross-process store lock
//!
//! A coarse-grained mutual-exclusion primitive backed by an advisory file
//! lock on a transient lock file at the store root. The lock is cooperative:
//! it only protects writers that go through this same mechanism.

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use log::debug;

/// Delay between acquisition attempts while another process holds the lock.
const RETRY_DELAY: Duration = Duration::from_millis(10);

/// Handle for acquiring the store-wide lock.
pub struct StoreLock {
    path: PathBuf,
}

/// Held store lock. Dropping it removes the lock file and releases the lock.
pub struct LockGuard {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Acquires the lock, blocking for as long as it takes.
    pub fn acquire(&self) -> LockGuard {
        loop {
            if let Some(guard) = self.try_acquire() {
                return guard;
            }
            thread::sleep(RETRY_DELAY);
        }
    }

    /// Acquires the lock, giving up after `timeout`.
    ///
    /// At least one attempt is always made, so a zero timeout degrades to a
    /// single non-blocking try.
    pub fn acquire_timeout(&self, timeout: Duration) -> Option<LockGuard> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(guard) = self.try_acquire() {
                return Some(guard);
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(RETRY_DELAY);
        }
    }

    fn try_acquire(&self) -> Option<LockGuard> {
        let file = match OpenOptions::new()
            .write(true)
            .create(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(err) => {
                debug!("failed to open lock file {}: {}", self.path.display(), err);
                return None;
            }
        };

        if let Err(err) = file.try_lock_exclusive() {
            debug!("store lock {} is busy: {}", self.path.display(), err);
            return None;
        }

        // The lock file is unlinked on release, so this descriptor may have
        // locked an inode that no longer backs the path. Hand the guard out
        // only if the path still names the file we locked.
        if !self.path_matches(&file) {
            debug!("lock file {} was replaced under us, retrying", self.path.display());
            return None;
        }

        Some(LockGuard {
            file,
            path: self.path.clone(),
        })
    }

    #[cfg(unix)]
    fn path_matches(&self, file: &File) -> bool {
        use std::os::unix::fs::MetadataExt;

        let held = match file.metadata() {
            Ok(meta) => meta,
            Err(_) => return false,
        };
        match fs::metadata(&self.path) {
            Ok(on_disk) => on_disk.dev() == held.dev() && on_disk.ino() == held.ino(),
            Err(_) => false,
        }
    }

    #[cfg(not(unix))]
    fn path_matches(&self, _file: &File) -> bool {
        true
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Remove the file first, while the lock is still held, so the path
        // can never name a file some other process has already locked.
        if let Err(err) = fs::remove_file(&self.path) {
            debug!("failed to remove lock file {}: {}", self.path.display(), err);
        }
        let _ = FileExt::unlock(&self.file);
    }
}
