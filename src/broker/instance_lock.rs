//! Single-instance process lock. A PID lock file in the output directory;
//! the host identifier is used in place of a hard-coded process name when
//! checking whether an existing lock holder is still alive.

use crate::config::defaults::HOST_ID;
use anyhow::{bail, Context, Result};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct ProcessLock {
    lock_path: PathBuf,
    owned: bool,
}

impl ProcessLock {
    const LOCK_FILE_NAME: &'static str = ".shipnetsim-server.lock";

    /// Acquire the lock in `dir`. Fails if another live instance holds it,
    /// so a second launch exits non-zero without ever binding the broker.
    pub fn acquire<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create lock directory: {dir:?}"))?;

        let lock_path = dir.join(Self::LOCK_FILE_NAME);

        if lock_path.exists() {
            match Self::check_existing_lock(&lock_path) {
                Ok(Some(pid)) => {
                    bail!(
                        "another shipnetsim-server instance is already running (PID: {pid})\n\
                         \n\
                         To resolve this:\n\
                         1. Stop the other instance, or\n\
                         2. If no other instance is running, remove the stale lock file:\n\
                            rm {lock_path:?}"
                    );
                }
                Ok(None) => {
                    tracing::info!("removing stale lock file from a previous instance");
                    fs::remove_file(&lock_path).context("failed to remove stale lock file")?;
                }
                Err(err) => {
                    tracing::warn!(%err, "error checking existing lock, removing and proceeding");
                    let _ = fs::remove_file(&lock_path);
                }
            }
        }

        let pid = std::process::id();
        let mut file = File::create(&lock_path)
            .with_context(|| format!("failed to create lock file: {lock_path:?}"))?;
        writeln!(file, "{pid}").context("failed to write PID to lock file")?;

        tracing::debug!(pid, path = ?lock_path, "acquired process lock");
        Ok(Self {
            lock_path,
            owned: true,
        })
    }

    fn check_existing_lock(lock_path: &Path) -> Result<Option<u32>> {
        let mut file = File::open(lock_path).context("failed to open existing lock file")?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .context("failed to read lock file contents")?;
        let pid: u32 = contents
            .trim()
            .parse()
            .context("failed to parse PID from lock file")?;

        if Self::is_process_running(pid) {
            Ok(Some(pid))
        } else {
            Ok(None)
        }
    }

    #[cfg(unix)]
    fn is_process_running(pid: u32) -> bool {
        let proc_path = format!("/proc/{pid}/cmdline");
        if let Ok(cmdline) = fs::read_to_string(&proc_path) {
            cmdline.contains("shipnetsim") || cmdline.contains(HOST_ID)
        } else {
            false
        }
    }

    #[cfg(not(unix))]
    fn is_process_running(_pid: u32) -> bool {
        true
    }

    pub fn release(&mut self) {
        if self.owned {
            if let Err(err) = fs::remove_file(&self.lock_path) {
                tracing::warn!(%err, "failed to remove lock file");
            } else {
                tracing::debug!(path = ?self.lock_path, "released process lock");
            }
            self.owned = false;
        }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn acquires_and_writes_the_current_pid() {
        let dir = tempdir().unwrap();
        let lock = ProcessLock::acquire(dir.path()).unwrap();
        let contents = fs::read_to_string(lock.path()).unwrap();
        let pid: u32 = contents.trim().parse().unwrap();
        assert_eq!(pid, std::process::id());
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempdir().unwrap();
        let lock_path;
        {
            let lock = ProcessLock::acquire(dir.path()).unwrap();
            lock_path = lock.path().to_path_buf();
            assert!(lock_path.exists());
        }
        assert!(!lock_path.exists());
    }

    #[test]
    fn a_stale_lock_is_replaced() {
        let dir = tempdir().unwrap();
        let lock_path = dir.path().join(ProcessLock::LOCK_FILE_NAME);
        fs::write(&lock_path, "999999999\n").unwrap();
        let lock = ProcessLock::acquire(dir.path()).unwrap();
        assert!(lock.path().exists());
    }
}
