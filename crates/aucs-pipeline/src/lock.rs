//! Filesystem run lock (§5 "one run at a time per output directory via a
//! filesystem lock"; §6 `locks/` directory).

use crate::error::PipelineError;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Holds an exclusive lock file for the lifetime of a run; removed on
/// drop so a crashed process doesn't wedge the output directory forever
/// (matching restart-after-failure resumability, §4.11).
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Acquire the lock at `<output_dir>/locks/run.lock`, created
    /// exclusively (`O_EXCL`-equivalent via [`OpenOptions::create_new`])
    /// so a concurrent run fails immediately rather than racing.
    pub fn acquire(output_dir: &Path) -> Result<Self, PipelineError> {
        let locks_dir = output_dir.join("locks");
        std::fs::create_dir_all(&locks_dir).map_err(|e| PipelineError::ResourceExhaustion(format!("cannot create lock directory: {e}")))?;
        let path = locks_dir.join("run.lock");

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(PipelineError::ConcurrentRun(path.display().to_string())),
            Err(e) => Err(PipelineError::ResourceExhaustion(format!("cannot create lock file: {e}"))),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_rejected_while_first_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let first = RunLock::acquire(dir.path()).unwrap();
        let second = RunLock::acquire(dir.path());
        assert!(second.is_err());
        drop(first);
        let third = RunLock::acquire(dir.path());
        assert!(third.is_ok());
    }
}
