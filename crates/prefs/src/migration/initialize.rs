//! Startup routine for an application's settings file.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{InitError, MergeError, SettingsMigrator};
use crate::storage::{read_optional, write_file, SettingsDirectory};

/// Prepares the user settings file and returns its path.
///
/// Creates `dir` (with parents), then merges `default_settings_path` into
/// `<dir>/<user_settings_filename>`.  A user file in which not a single
/// line reads as a setting or a section header is overwritten with the
/// defaults; any other parse failure is reported and the file is kept.
///
/// # Errors
///
/// - [`InitError::CreateDirectory`] if `dir` cannot be created.
/// - [`InitError::Merge`] wrapping [`MergeError::Configuration`] when the
///   user file holds settings next to invalid lines or values, or
///   [`MergeError::Open`] when it cannot be read or written.
pub fn initialize_settings(
    app_name: &str,
    default_settings_path: &Path,
    user_settings_filename: &str,
    dir: &SettingsDirectory,
) -> Result<PathBuf, InitError> {
    dir.ensure_exists()
        .map_err(|source| InitError::CreateDirectory {
            path: dir.path().to_path_buf(),
            source,
        })?;

    let user_path = dir.file(user_settings_filename);
    let migrator = SettingsMigrator::new(default_settings_path, &user_path);
    match migrator.merge() {
        Ok(outcome) => debug!("{app_name} settings ready: {outcome:?}"),
        Err(MergeError::Configuration(e)) if e.is_unparseable() => {
            warn!("{app_name}: replacing corrupt settings file: {e}");
            restore_defaults(default_settings_path, &user_path)?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(user_path)
}

/// Overwrites the user file with the default file's content.
fn restore_defaults(default_path: &Path, user_path: &Path) -> Result<(), MergeError> {
    let open_error = |source| MergeError::Open {
        path: user_path.to_path_buf(),
        source,
    };
    let defaults = match read_optional(default_path) {
        Ok(text) => text.unwrap_or_default(),
        Err(e) => {
            warn!("could not read default settings: {e}");
            String::new()
        }
    };
    write_file(user_path, &defaults).map_err(open_error)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
