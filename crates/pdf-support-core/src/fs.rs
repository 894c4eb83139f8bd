use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use tempfile::{Builder, NamedTempFile};
use tracing::{debug, warn};

use crate::error::{IoAction, SupportError, SupportResult};

/// Create `path` and any missing parents. An existing directory is left alone.
pub fn ensure_directory(path: &Path) -> SupportResult<()> {
    if path.is_dir() {
        debug!(path = %path.display(), "directory already present");
        return Ok(());
    }
    fs::create_dir_all(path).map_err(SupportError::io(IoAction::CreateDirectory, path))?;
    debug!(path = %path.display(), "created directory");
    Ok(())
}

/// Recursively remove `path`. Returns `false` when there was nothing to remove.
pub fn remove_directory(path: &Path) -> SupportResult<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed directory");
            Ok(true)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "directory already absent");
            Ok(false)
        }
        Err(err) => Err(SupportError::io(IoAction::RemoveDirectory, path)(err)),
    }
}

/// Remove every entry directly inside `path`, keeping `path` itself.
/// A missing directory is an error.
pub fn clear_directory(path: &Path) -> SupportResult<usize> {
    let entries = fs::read_dir(path).map_err(SupportError::io(IoAction::ListDirectory, path))?;

    let mut removed = 0usize;
    for entry in entries {
        let entry = entry.map_err(SupportError::io(IoAction::ListDirectory, path))?;
        let entry_path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(SupportError::io(IoAction::RemoveEntry, &entry_path))?;

        // Symlinks are unlinked, never followed.
        let result = if file_type.is_dir() {
            fs::remove_dir_all(&entry_path)
        } else {
            fs::remove_file(&entry_path)
        };
        result.map_err(SupportError::io(IoAction::RemoveEntry, &entry_path))?;

        debug!(path = %entry_path.display(), "removed scratch entry");
        removed += 1;
    }

    Ok(removed)
}

/// Create an empty file at `path`, truncating any existing content.
pub fn create_empty(path: &Path) -> SupportResult<()> {
    File::create(path).map_err(SupportError::io(IoAction::CreateFile, path))?;
    Ok(())
}

/// Replace the full contents of `path` with `content`.
pub fn overwrite(path: &Path, content: &[u8]) -> SupportResult<()> {
    let mut file = File::create(path).map_err(SupportError::io(IoAction::WriteFile, path))?;
    file.write_all(content)
        .map_err(SupportError::io(IoAction::WriteFile, path))?;
    debug!(path = %path.display(), bytes = content.len(), "wrote support file");
    Ok(())
}

/// Overwrite each `(target, content)` pair in order, stopping at the first
/// failure. Targets written before the failure keep their new content.
pub fn overwrite_all(targets: &[(&Path, &[u8])]) -> SupportResult<()> {
    for (target, content) in targets {
        overwrite(target, content)?;
    }
    Ok(())
}

/// Write every `(target, content)` pair through temporary files in the
/// target's directory, then rename them into place.
///
/// If any staging write fails, all staged files are discarded and no target
/// is modified. Renames happen only after every payload is staged; a rename
/// failure part-way through leaves earlier targets committed.
pub fn write_staged(targets: &[(&Path, &[u8])]) -> SupportResult<()> {
    let mut staged: Vec<(NamedTempFile, &Path)> = Vec::with_capacity(targets.len());

    for (target, content) in targets {
        match stage(target, content) {
            Ok(tmp) => staged.push((tmp, *target)),
            Err(err) => {
                if !staged.is_empty() {
                    warn!(
                        target_path = %target.display(),
                        discarded = staged.len(),
                        "staging failed, discarding staged support files"
                    );
                }
                // Dropping the handles deletes the temporary files.
                drop(staged);
                return Err(err);
            }
        }
    }

    for (tmp, target) in staged {
        tmp.persist(target)
            .map_err(|err| SupportError::io(IoAction::CommitFile, target)(err.error))?;
        debug!(path = %target.display(), "committed staged support file");
    }

    Ok(())
}

fn stage(target: &Path, content: &[u8]) -> SupportResult<NamedTempFile> {
    let parent = target
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = Builder::new()
        .prefix(".pdf-support")
        .suffix(".staged")
        .tempfile_in(parent)
        .map_err(SupportError::io(IoAction::StageFile, target))?;

    tmp.as_file_mut()
        .write_all(content)
        .map_err(SupportError::io(IoAction::StageFile, target))?;
    tmp.as_file_mut()
        .sync_all()
        .map_err(SupportError::io(IoAction::StageFile, target))?;

    Ok(tmp)
}
