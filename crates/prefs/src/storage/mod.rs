//! Storage: where settings files live and how they are read and written.
//!
//! This module is the only place in the crate that touches the file
//! system.  It provides:
//!
//! - [`SettingsDirectory`] – the per-user directory holding the settings
//!   file and the `excludes/` folder, passed explicitly to whoever needs it.
//! - [`read_optional`] / [`write_file`] – whole-file reads and writes with
//!   errors that carry the offending path.
//!
//! Files are always read and written in one call; no handle outlives the
//! operation that opened it.

use std::path::PathBuf;

use thiserror::Error;

pub mod file;
pub mod settings_dir;

pub use file::{read_optional, write_file};
pub use settings_dir::SettingsDirectory;

/// Error type for settings file-system operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The platform settings directory could not be determined.
    #[error("could not determine platform settings directory")]
    NoPlatformSettingsDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// The path involved in the failure, when there is one.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            StorageError::NoPlatformSettingsDir => None,
            StorageError::Io { path, .. } => Some(path),
        }
    }
}
