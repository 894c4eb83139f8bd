//! Scratch workspace coordination for an external HTML-to-PDF renderer.
//!
//! The renderer reads cover, header and footer HTML from support files in a
//! scratch directory and writes finished documents to an output directory.
//! [`ScratchCoordinator`] prepares and tears down that workspace.

pub mod coordinator;
pub mod error;
pub mod fs;
pub mod registry;

pub use coordinator::{ScratchCoordinator, SupportFileEntry, SupportFilesReport};
pub use error::{ExitCode, IoAction, SupportError, SupportResult};
pub use pdf_support_config::Config;
pub use registry::{SupportFile, SupportFiles};
