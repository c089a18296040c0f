use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

pub const LOCK_FILE_NAME: &str = ".lock-duplicate";

/// Exclusive advisory lock on a bucket directory, released on drop.
/// The lock file itself is never removed.
pub struct BucketLock {
    file: File,
    path: PathBuf,
}

impl BucketLock {
    /// Block until the bucket's lock is held.
    pub fn acquire(bucket: &Path) -> io::Result<Self> {
        let path = bucket.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        FileExt::lock_exclusive(&file)?;
        trace!("Locked {}", path.display());
        Ok(Self { file, path })
    }
}

impl Drop for BucketLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_lock_is_exclusive_until_dropped() {
        let tmp = tempdir().unwrap();
        let bucket = tmp.path().to_path_buf();

        let guard = BucketLock::acquire(&bucket).unwrap();
        let contender = OpenOptions::new()
            .write(true)
            .open(bucket.join(LOCK_FILE_NAME))
            .unwrap();
        assert!(FileExt::try_lock_exclusive(&contender).is_err());

        drop(guard);
        assert!(FileExt::try_lock_exclusive(&contender).is_ok());
        FileExt::unlock(&contender).unwrap();
        assert!(bucket.join(LOCK_FILE_NAME).exists());
    }

    #[test]
    fn test_second_acquire_waits_for_release() {
        let tmp = tempdir().unwrap();
        let bucket = tmp.path().to_path_buf();
        let released = Arc::new(AtomicBool::new(false));

        let guard = BucketLock::acquire(&bucket).unwrap();
        let waiter = {
            let bucket = bucket.clone();
            let released = Arc::clone(&released);
            thread::spawn(move || {
                let _guard = BucketLock::acquire(&bucket).unwrap();
                released.load(Ordering::SeqCst)
            })
        };

        thread::sleep(Duration::from_millis(50));
        released.store(true, Ordering::SeqCst);
        drop(guard);

        assert!(waiter.join().unwrap());
    }
}
