//! Scratch workspace coordinator.
//!
//! A [`ScratchCoordinator`] owns the resolved output and scratch directory
//! paths plus the support file registry derived from them. It holds no lock:
//! one setup → inject → render → teardown sequence should run at a time per
//! scratch directory. Callers generating documents concurrently either
//! serialize externally or give each request its own directory via
//! [`ScratchCoordinator::for_request`].

use std::path::{Path, PathBuf};

use pdf_support_config::Config;
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::{SupportError, SupportResult};
use crate::fs;
use crate::registry::{SupportFile, SupportFiles};

#[derive(Clone, Debug)]
pub struct ScratchCoordinator {
    output_directory: PathBuf,
    scratch_directory: PathBuf,
    files: SupportFiles,
}

impl ScratchCoordinator {
    /// Bind the coordinator to the directories of an already loaded config.
    pub fn new(config: &Config) -> Self {
        Self::from_paths(
            config.directories.default_directory_path.clone(),
            config.directories.support_directory_path.clone(),
        )
    }

    pub fn from_paths(output: impl Into<PathBuf>, scratch: impl Into<PathBuf>) -> Self {
        let scratch_directory = scratch.into();
        let files = SupportFiles::in_directory(&scratch_directory);
        Self {
            output_directory: output.into(),
            scratch_directory,
            files,
        }
    }

    /// Coordinator scoped to `<scratch>/<request_id>`, sharing the output
    /// directory. Distinct ids never touch each other's support files.
    pub fn for_request(&self, request_id: &str) -> SupportResult<Self> {
        validate_request_id(request_id)?;
        Ok(Self::from_paths(
            self.output_directory.clone(),
            self.scratch_directory.join(request_id),
        ))
    }

    pub fn output_directory_path(&self) -> &Path {
        &self.output_directory
    }

    pub fn scratch_directory_path(&self) -> &Path {
        &self.scratch_directory
    }

    pub fn named_file_paths(&self) -> &SupportFiles {
        &self.files
    }

    pub fn path(&self, kind: SupportFile) -> &Path {
        self.files.path(kind)
    }

    pub fn ensure_output_directory(&self) -> SupportResult<()> {
        fs::ensure_directory(&self.output_directory)
    }

    pub fn ensure_scratch_directory(&self) -> SupportResult<()> {
        fs::ensure_directory(&self.scratch_directory)
    }

    /// Remove the scratch directory and everything in it. Absence is fine.
    pub fn destroy_scratch_directory(&self) -> SupportResult<()> {
        fs::remove_directory(&self.scratch_directory).map(|_| ())
    }

    /// Ensure the scratch directory exists and truncate all three support
    /// files to empty.
    pub fn create_support_files(&self) -> SupportResult<()> {
        self.ensure_scratch_directory()?;
        for (_, path) in self.files.iter() {
            fs::create_empty(path)?;
        }
        Ok(())
    }

    /// Overwrite a single support file, creating the scratch directory first
    /// when needed.
    pub fn inject_support_file(
        &self,
        kind: SupportFile,
        content: impl AsRef<[u8]>,
    ) -> SupportResult<()> {
        self.ensure_scratch_directory()?;
        fs::overwrite(self.files.path(kind), content.as_ref())
    }

    /// Replace the contents of all three support files.
    ///
    /// All three files are first truncated to empty, then written in cover,
    /// header, footer order. Nothing is rolled back: if the header write
    /// fails, the cover already holds its new content and the footer is left
    /// empty. The returned error names the failing file. Use
    /// [`inject_content_atomic`](Self::inject_content_atomic) when that
    /// matters.
    #[instrument(skip_all, fields(scratch = %self.scratch_directory.display()))]
    pub fn inject_content(
        &self,
        cover: impl AsRef<[u8]>,
        header: impl AsRef<[u8]>,
        footer: impl AsRef<[u8]>,
    ) -> SupportResult<()> {
        self.create_support_files()?;
        fs::overwrite_all(&[
            (self.files.path(SupportFile::Cover), cover.as_ref()),
            (self.files.path(SupportFile::Header), header.as_ref()),
            (self.files.path(SupportFile::Footer), footer.as_ref()),
        ])?;
        info!("injected support file content");
        Ok(())
    }

    /// Stage all three payloads before touching any support file.
    ///
    /// A failure while staging leaves every support file as it was. Once all
    /// payloads are staged they are renamed into place one by one.
    #[instrument(skip_all, fields(scratch = %self.scratch_directory.display()))]
    pub fn inject_content_atomic(
        &self,
        cover: impl AsRef<[u8]>,
        header: impl AsRef<[u8]>,
        footer: impl AsRef<[u8]>,
    ) -> SupportResult<()> {
        self.ensure_scratch_directory()?;
        fs::write_staged(&[
            (self.files.path(SupportFile::Cover), cover.as_ref()),
            (self.files.path(SupportFile::Header), header.as_ref()),
            (self.files.path(SupportFile::Footer), footer.as_ref()),
        ])?;
        info!("injected support file content atomically");
        Ok(())
    }

    /// Delete every entry inside the scratch directory, including files the
    /// coordinator did not create. The directory itself stays. Fails when the
    /// scratch directory does not exist.
    pub fn clear_support_files(&self) -> SupportResult<usize> {
        let removed = fs::clear_directory(&self.scratch_directory)?;
        info!(
            scratch = %self.scratch_directory.display(),
            removed,
            "cleared scratch directory"
        );
        Ok(removed)
    }

    #[instrument(skip_all, fields(scratch = %self.scratch_directory.display()))]
    pub fn set_environment(&self) -> SupportResult<()> {
        self.create_support_files()?;
        info!("support environment ready");
        Ok(())
    }

    #[instrument(skip_all, fields(scratch = %self.scratch_directory.display()))]
    pub fn unset_environment(&self) -> SupportResult<()> {
        self.destroy_scratch_directory()?;
        info!("support environment removed");
        Ok(())
    }

    /// Snapshot of the paths handed to the renderer and whether they exist.
    pub fn describe(&self) -> SupportFilesReport {
        SupportFilesReport {
            output_directory: self.output_directory.clone(),
            scratch_directory: self.scratch_directory.clone(),
            scratch_exists: self.scratch_directory.is_dir(),
            files: self
                .files
                .iter()
                .map(|(name, path)| SupportFileEntry {
                    name,
                    path: path.to_path_buf(),
                    exists: path.is_file(),
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SupportFilesReport {
    pub output_directory: PathBuf,
    pub scratch_directory: PathBuf,
    pub scratch_exists: bool,
    pub files: Vec<SupportFileEntry>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SupportFileEntry {
    pub name: SupportFile,
    pub path: PathBuf,
    pub exists: bool,
}

fn validate_request_id(request_id: &str) -> SupportResult<()> {
    let valid = !request_id.is_empty()
        && request_id != "."
        && request_id != ".."
        && request_id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(SupportError::InvalidRequestId(request_id.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_resolves_default_directories() {
        let coordinator = ScratchCoordinator::new(&Config::default());

        assert_eq!(coordinator.scratch_directory_path(), Path::new("pdfkit"));
        assert_eq!(coordinator.output_directory_path(), Path::new("documents"));
        assert_eq!(
            coordinator.path(SupportFile::Footer),
            Path::new("pdfkit/footer_support_file.html")
        );
    }

    #[test]
    fn request_scope_nests_under_scratch() {
        let coordinator = ScratchCoordinator::from_paths("out", "scratch");
        let scoped = coordinator.for_request("job-42").unwrap();

        assert_eq!(scoped.scratch_directory_path(), Path::new("scratch/job-42"));
        assert_eq!(scoped.output_directory_path(), Path::new("out"));
        assert_eq!(
            scoped.path(SupportFile::Cover),
            Path::new("scratch/job-42/cover_support_file.html")
        );
    }

    #[test]
    fn request_ids_must_be_single_segments() {
        let coordinator = ScratchCoordinator::from_paths("out", "scratch");
        for bad in ["", ".", "..", "a/b", "../escape", "with space"] {
            assert!(
                matches!(
                    coordinator.for_request(bad),
                    Err(SupportError::InvalidRequestId(_))
                ),
                "accepted {bad:?}"
            );
        }
    }
}
