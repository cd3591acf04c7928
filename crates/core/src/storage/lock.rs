use anyhow::Context;
use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};

/// Advisory exclusive lock on a file in the store directory.
///
/// Every process (and every handle within one process) that opens the same
/// path contends for the same lock. Dropping the guard releases it; so does
/// process exit.
#[derive(Debug, Clone)]
pub struct LockFile {
    path: PathBuf,
}

/// Held lock. Unlocks on drop.
#[derive(Debug)]
pub struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl LockFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> anyhow::Result<File> {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.path)
            .with_context(|| format!("failed to open lock file {}", self.path.display()))
    }

    /// Non-blocking attempt. `Ok(None)` means someone else holds the lock.
    pub fn try_acquire(&self) -> anyhow::Result<Option<LockGuard>> {
        let file = self.open()?;
        match file.try_lock() {
            Ok(()) => Ok(Some(LockGuard { file })),
            Err(TryLockError::WouldBlock) => Ok(None),
            Err(TryLockError::Error(e)) => {
                Err(e).with_context(|| format!("failed to lock {}", self.path.display()))
            }
        }
    }

    /// Waits for the lock on the blocking pool.
    pub async fn acquire(&self) -> anyhow::Result<LockGuard> {
        let lock = self.clone();
        tokio::task::spawn_blocking(move || {
            let file = lock.open()?;
            file.lock()
                .with_context(|| format!("failed to lock {}", lock.path.display()))?;
            Ok(LockGuard { file })
        })
        .await
        .context("lock task failed")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_handle_is_refused_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let a = LockFile::new(dir.path().join("run.lock"));
        let b = LockFile::new(dir.path().join("run.lock"));

        let held = a.try_acquire().unwrap().expect("first acquire");
        assert!(b.try_acquire().unwrap().is_none());

        drop(held);
        assert!(b.try_acquire().unwrap().is_some());
    }

    #[tokio::test]
    async fn acquire_waits_for_holder() {
        let dir = tempfile::tempdir().unwrap();
        let lock = LockFile::new(dir.path().join("store.lock"));
        let held = lock.try_acquire().unwrap().unwrap();

        let waiter = {
            let lock = lock.clone();
            tokio::spawn(async move { lock.acquire().await.map(|_| ()) })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(held);
        waiter.await.unwrap().unwrap();
        assert!(lock.path().exists());
    }
}
