//! Truncate-on-open, write-once summary sink.

use crate::error::SimResult;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct SummarySink {
    path: PathBuf,
}

impl SummarySink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the file with `text` in one shot and close it.
    pub fn write_once(&self, text: &str) -> SimResult<()> {
        fs::write(&self.path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_once_truncates_prior_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shipSummary_1.txt");
        fs::write(&path, "stale content that should disappear").unwrap();
        let sink = SummarySink::new(path.clone());
        sink.write_once("fresh summary").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh summary");
    }
}
