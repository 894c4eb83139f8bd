//! Shared test harness utilities for pdf-support crates.

use std::path::{Path, PathBuf};

use pdf_support_config::Config;
use tempfile::TempDir;

/// Returns a configuration whose directories live under `root`.
pub fn test_config(root: &Path) -> Config {
    Config::with_directories(root.join("documents"), root.join("pdfkit"))
}

/// Temporary root directory paired with a configuration pointing into it.
/// The directory is deleted when the workspace is dropped.
pub struct TestWorkspace {
    dir: TempDir,
    config: Config,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temporary workspace");
        let config = test_config(dir.path());
        Self { dir, config }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.config.directories.support_directory_path.clone()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.config.directories.default_directory_path.clone()
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
