//! Bringing a user's settings file up to date with the shipped defaults.
//!
//! An application ships a default settings file.  On startup:
//!
//! 1. [`initialize_settings`] makes sure the settings directory exists.
//! 2. [`SettingsMigrator::merge`] copies the defaults to the user file on
//!    first run, or adds every default the user file lacks on later runs.
//!    User values are never overwritten.
//! 3. A user file so damaged that it is not recognisable as a settings
//!    file is replaced with the defaults; a file with a single bad value is
//!    reported instead, so the user can fix it.

use std::path::PathBuf;

use thiserror::Error;

use crate::settings::ConfigurationError;
use crate::storage::StorageError;

pub mod initialize;
pub mod migrator;

pub use initialize::initialize_settings;
pub use migrator::{MergeOutcome, SettingsMigrator};

/// Error type for [`SettingsMigrator::merge`].
#[derive(Debug, Error)]
pub enum MergeError {
    /// The user settings file exists but cannot be parsed.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The user settings file cannot be read or written.
    #[error("Could not open {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: StorageError,
    },
}

/// Error type for [`initialize_settings`].
#[derive(Debug, Error)]
pub enum InitError {
    /// The settings directory could not be created.
    #[error("could not create settings directory {}", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    Merge(#[from] MergeError),
}
