use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const LOCK_FILE: &str = ".lock";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Exclusive advisory lock on a board directory.
///
/// Every mutating command holds one for the whole load, mutate, persist
/// sequence, so two `tb` processes never interleave read-modify-write
/// cycles on the same blob. Released on drop.
pub struct BoardLock {
    _file: File,
    path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open lock file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("board at {path} is locked by another tb process")]
    Busy { path: PathBuf },
}

impl BoardLock {
    /// Wait up to `timeout` for the lock.
    pub fn acquire(board_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = board_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Open {
                path: path.clone(),
                source,
            })?;

        let deadline = Instant::now() + timeout;
        while try_lock(&file).is_err() {
            if Instant::now() >= deadline {
                return Err(LockError::Busy {
                    path: board_dir.to_path_buf(),
                });
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        Ok(BoardLock { _file: file, path })
    }

    pub fn acquire_default(board_dir: &Path) -> Result<Self, LockError> {
        Self::acquire(board_dir, DEFAULT_TIMEOUT)
    }
}

impl Drop for BoardLock {
    fn drop(&mut self) {
        // flock is released with the descriptor
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_released_on_drop() {
        let tmp = TempDir::new().unwrap();
        let lock = BoardLock::acquire_default(tmp.path()).unwrap();
        assert!(tmp.path().join(LOCK_FILE).exists());
        drop(lock);
        assert!(!tmp.path().join(LOCK_FILE).exists());
        assert!(BoardLock::acquire_default(tmp.path()).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn second_lock_times_out() {
        let tmp = TempDir::new().unwrap();
        let _held = BoardLock::acquire_default(tmp.path()).unwrap();
        let second = BoardLock::acquire(tmp.path(), Duration::from_millis(50));
        assert!(matches!(second, Err(LockError::Busy { .. })));
    }
}
