//! The settings tree.
//!
//! A [`Settings`] node is one scope of a settings file: the file root or a
//! (possibly nested) section.  All nodes created from the same file share a
//! single in-memory document, so a change made through one node is visible
//! through every other node and is saved to the same file.
//!
//! # Autosave (for beginners)
//!
//! Writes go to disk immediately by default.  Bulk updates can pass
//! `SetOptions { autosave: false, .. }` and call [`Settings::save`] once at
//! the end.
//!
//! # Errors
//!
//! Errors are split by cause so callers can react differently:
//!
//! ```text
//! ConfigurationError   the file exists but is not valid settings syntax
//! SectionError         a value and a section were mixed up under one key
//! KeyNotFound          `value(key)` on a missing key
//! Storage              the file could not be read or written
//! Listener             a change listener rejected the change
//! Extract              the tree does not fit the requested Rust type
//! ```

use std::path::PathBuf;

use prefs_core::{FormatError, KeyConflict};
use thiserror::Error;

use crate::storage::StorageError;

pub mod listener;
pub mod node;

pub use listener::{ChangeListener, ListenerError, ListenerId};
pub use node::{Item, SetOptions, Settings};

/// A settings file that exists but cannot be parsed.
#[derive(Debug, Error)]
#[error("invalid settings file {}: {source}", .path.display())]
pub struct ConfigurationError {
    pub path: PathBuf,
    #[source]
    pub source: FormatError,
}

impl ConfigurationError {
    /// Returns `true` when the file is not recognisable as a settings file
    /// at all, as opposed to containing an invalid value.
    pub fn is_unparseable(&self) -> bool {
        self.source.is_unparseable()
    }
}

/// A value and a section were confused under one key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SectionError {
    /// A section was requested under a key that already holds a value.
    #[error("{0:?} already holds a value and cannot become a section")]
    ValueExists(String),

    /// A value was assigned to a key that already names a section.
    #[error("{0:?} is a section and cannot be assigned a value")]
    SectionExists(String),

    /// The key could not be read back from the saved file.
    #[error("{0:?} is not a valid key or section name")]
    InvalidName(String),
}

impl From<KeyConflict> for SectionError {
    fn from(conflict: KeyConflict) -> Self {
        match conflict {
            KeyConflict::IsValue(key) => SectionError::ValueExists(key),
            KeyConflict::IsSection(key) => SectionError::SectionExists(key),
            KeyConflict::InvalidName(key) => SectionError::InvalidName(key),
        }
    }
}

/// Error type for settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Section(#[from] SectionError),

    /// `value(key)` was called for a key that holds no value.
    #[error("no setting {key:?} in section {section:?}")]
    KeyNotFound { key: String, section: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A change listener returned an error.
    #[error("change listener failed: {0}")]
    Listener(#[source] ListenerError),

    /// The settings tree does not deserialize into the requested type.
    #[error("settings do not match the requested type: {0}")]
    Extract(#[from] serde_json::Error),
}
