//! Run lock: one replication run per host at a time.
//!
//! Cross-platform (fs2) advisory exclusive lock on `<commands_log>.lock`.
//! Две параллельные прогонки перемешали бы отправки и строки аудита,
//! поэтому вторая сразу получает ошибку (try_lock), а не ждёт.
//!
//! Lock is released on Drop.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

pub struct RunLock {
    file: std::fs::File,
    path: PathBuf,
}

impl RunLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// `commands_output.txt` -> `commands_output.txt.lock`
pub fn lock_path_for(log_path: &Path) -> PathBuf {
    let mut s: OsString = log_path.as_os_str().to_owned();
    s.push(".lock");
    PathBuf::from(s)
}

/// Try to take the run lock next to the audit log. Fails if another run holds it.
pub fn try_acquire_run_lock(log_path: &Path) -> Result<RunLock> {
    let path = lock_path_for(log_path);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&path)
        .with_context(|| format!("open lock file {}", path.display()))?;
    file.try_lock_exclusive().with_context(|| {
        format!(
            "another replication run holds {} (try_lock_exclusive failed)",
            path.display()
        )
    })?;
    Ok(RunLock { file, path })
}
