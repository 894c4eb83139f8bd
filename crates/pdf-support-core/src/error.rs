use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    Io = 1,
    InvalidArguments = 2,
    Config = 3,
}

/// Filesystem step that was being attempted when an I/O error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoAction {
    CreateDirectory,
    RemoveDirectory,
    ListDirectory,
    CreateFile,
    WriteFile,
    RemoveEntry,
    StageFile,
    CommitFile,
}

impl fmt::Display for IoAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IoAction::CreateDirectory => "create directory",
            IoAction::RemoveDirectory => "remove directory",
            IoAction::ListDirectory => "list directory",
            IoAction::CreateFile => "create file",
            IoAction::WriteFile => "write file",
            IoAction::RemoveEntry => "remove",
            IoAction::StageFile => "stage file",
            IoAction::CommitFile => "commit staged file to",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum SupportError {
    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: IoAction,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid request id '{0}': expected a single path segment of [A-Za-z0-9._-]")]
    InvalidRequestId(String),
}

impl SupportError {
    /// Adapter for `map_err` that tags an `io::Error` with its action and target.
    pub(crate) fn io(action: IoAction, path: &Path) -> impl FnOnce(io::Error) -> SupportError {
        let path = path.to_path_buf();
        move |source| SupportError::Io {
            action,
            path,
            source,
        }
    }

    /// Path the failed operation targeted, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::InvalidRequestId(_) => None,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Io { .. } => ExitCode::Io,
            Self::InvalidRequestId(_) => ExitCode::InvalidArguments,
        }
    }
}

pub type SupportResult<T> = Result<T, SupportError>;
