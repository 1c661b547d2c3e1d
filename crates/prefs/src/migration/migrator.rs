//! Default-to-user settings merge.

use std::path::{Path, PathBuf};

use prefs_core::{Document, Value};
use tracing::{debug, info, warn};

use super::MergeError;
use crate::settings::ConfigurationError;
use crate::storage::{read_optional, write_file, StorageError};

/// What [`SettingsMigrator::merge`] did to the user file.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// The user file did not exist and was created from the defaults.
    Created,
    /// The user file was updated in place.
    Merged {
        /// `/`-separated paths of the defaults that were added.
        added: Vec<String>,
        /// The version stamp found in the user file before the merge.
        previous_version: Option<Value>,
    },
}

/// Merges a default settings file into a user settings file.
#[derive(Debug, Clone)]
pub struct SettingsMigrator {
    default_path: PathBuf,
    user_path: PathBuf,
}

impl SettingsMigrator {
    /// Top-level key recording which settings layout the user file follows.
    pub const SETTINGS_VERSION: &'static str = "settings_version";

    /// Version written by this release.
    pub const CURRENT_SETTINGS_VERSION: i64 = 1;

    pub fn new(default_path: impl Into<PathBuf>, user_path: impl Into<PathBuf>) -> Self {
        Self {
            default_path: default_path.into(),
            user_path: user_path.into(),
        }
    }

    pub fn default_path(&self) -> &Path {
        &self.default_path
    }

    pub fn user_path(&self) -> &Path {
        &self.user_path
    }

    /// Creates or updates the user file from the defaults.
    ///
    /// A missing user file becomes a verbatim copy of the default file.  An
    /// existing one keeps every value and comment it has, gains each
    /// default key or section it lacks (with the comment lines written
    /// above that key in the default file) and is stamped with
    /// [`Self::CURRENT_SETTINGS_VERSION`].
    ///
    /// A missing or unparseable default file counts as empty.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Configuration`] if the user file cannot be
    /// parsed and [`MergeError::Open`] if it cannot be read or written.
    pub fn merge(&self) -> Result<MergeOutcome, MergeError> {
        let user_text = read_optional(&self.user_path).map_err(|e| self.open_error(e))?;

        let Some(user_text) = user_text else {
            let defaults = self.read_default_text();
            write_file(&self.user_path, &defaults).map_err(|e| self.open_error(e))?;
            info!(
                "created {} from defaults {}",
                self.user_path.display(),
                self.default_path.display()
            );
            return Ok(MergeOutcome::Created);
        };

        let mut user = Document::parse(&user_text).map_err(|source| ConfigurationError {
            path: self.user_path.clone(),
            source,
        })?;
        let defaults = self.load_defaults();

        let report = user.root_mut().fill_from(defaults.root(), true);
        for conflict in &report.conflicts {
            warn!(
                "{conflict:?} is a value in one of {} and {} and a section in the other; keeping the user's",
                self.default_path.display(),
                self.user_path.display()
            );
        }
        let previous_version = self.stamp_version(&mut user);

        write_file(&self.user_path, &user.render()).map_err(|e| self.open_error(e))?;
        info!(
            "merged {} new default settings into {}",
            report.added.len(),
            self.user_path.display()
        );
        Ok(MergeOutcome::Merged {
            added: report.added,
            previous_version,
        })
    }

    fn open_error(&self, source: StorageError) -> MergeError {
        MergeError::Open {
            path: self.user_path.clone(),
            source,
        }
    }

    /// Default file content; empty when it cannot be read.
    fn read_default_text(&self) -> String {
        match read_optional(&self.default_path) {
            Ok(Some(text)) => text,
            Ok(None) => {
                warn!("default settings {} not found", self.default_path.display());
                String::new()
            }
            Err(e) => {
                warn!("could not read default settings: {e}");
                String::new()
            }
        }
    }

    fn load_defaults(&self) -> Document {
        let text = self.read_default_text();
        Document::parse(&text).unwrap_or_else(|e| {
            warn!(
                "ignoring invalid default settings {}: {e}",
                self.default_path.display()
            );
            Document::new()
        })
    }

    /// Writes the current version, returning the one it replaced.
    fn stamp_version(&self, user: &mut Document) -> Option<Value> {
        let root = user.root_mut();
        if root.child(Self::SETTINGS_VERSION).is_some() {
            warn!(
                "replacing section {:?} in {} with a version stamp",
                Self::SETTINGS_VERSION,
                self.user_path.display()
            );
            root.remove(Self::SETTINGS_VERSION);
        }
        match root.set_value(
            Self::SETTINGS_VERSION,
            Value::Int(Self::CURRENT_SETTINGS_VERSION),
        ) {
            Ok(previous) => {
                debug!("settings version was {previous:?}");
                previous
            }
            Err(conflict) => {
                warn!("could not stamp settings version: {conflict}");
                None
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).expect("write fixture");
        path
    }

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).expect("read")
    }

    #[test]
    fn test_missing_user_file_is_created_verbatim() {
        // Arrange
        let dir = tempfile::tempdir().expect("tempdir");
        let defaults = write(dir.path(), "defaults.cfg", "# shipped\nfoo = 'bar'\n");
        let user = dir.path().join("user.cfg");

        // Act
        let outcome = SettingsMigrator::new(&defaults, &user).merge().expect("merge");

        // Assert
        assert_eq!(outcome, MergeOutcome::Created);
        assert_eq!(read(&user), "# shipped\nfoo = 'bar'\n");
    }

    #[test]
    fn test_merge_keeps_user_values_and_stamps_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        let defaults = write(dir.path(), "defaults.cfg", "foo = 'bar'\nhello = 'world'\n");
        let user = write(dir.path(), "user.cfg", "foo = 'new value'\nhello = 'world'\n");

        let outcome = SettingsMigrator::new(&defaults, &user).merge().expect("merge");

        assert_eq!(
            outcome,
            MergeOutcome::Merged {
                added: Vec::new(),
                previous_version: None
            }
        );
        assert_eq!(
            read(&user),
            "foo = 'new value'\nhello = 'world'\nsettings_version = 1\n"
        );
    }

    #[test]
    fn test_merge_reports_previous_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        let defaults = write(dir.path(), "defaults.cfg", "a = 1\n");
        let user = write(dir.path(), "user.cfg", "settings_version = 0\n");

        let outcome = SettingsMigrator::new(&defaults, &user).merge().expect("merge");

        assert_eq!(
            outcome,
            MergeOutcome::Merged {
                added: vec!["a".to_string()],
                previous_version: Some(Value::Int(0))
            }
        );
        assert_eq!(read(&user), "settings_version = 1\na = 1\n");
    }

    #[test]
    fn test_invalid_default_file_only_stamps_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        let defaults = write(dir.path(), "defaults.cfg", "not a settings file");
        let user = write(dir.path(), "user.cfg", "foo = 1\n");

        SettingsMigrator::new(&defaults, &user).merge().expect("merge");

        assert_eq!(read(&user), "foo = 1\nsettings_version = 1\n");
    }

    #[test]
    fn test_invalid_user_file_is_configuration_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let defaults = write(dir.path(), "defaults.cfg", "foo = 1\n");
        let user = write(dir.path(), "user.cfg", "invalid syntax = foo\n");

        let err = SettingsMigrator::new(&defaults, &user).merge().unwrap_err();

        assert!(matches!(err, MergeError::Configuration(_)));
        assert_eq!(read(&user), "invalid syntax = foo\n");
    }

    #[test]
    fn test_unreadable_user_path_is_open_error() {
        // A directory cannot be read as a file, even by root.
        let dir = tempfile::tempdir().expect("tempdir");
        let defaults = write(dir.path(), "defaults.cfg", "foo = 1\n");
        let user = dir.path().join("user.cfg");
        std::fs::create_dir(&user).expect("mkdir");

        let err = SettingsMigrator::new(&defaults, &user).merge().unwrap_err();

        assert!(err.to_string().starts_with("Could not open "));
    }
}
