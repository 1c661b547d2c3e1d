//! The per-user settings directory.
//!
//! Resolved once at startup and handed to every component that stores
//! files, instead of living in a process-wide global:
//! - Windows:  `%APPDATA%\<app>`
//! - Linux:    `$XDG_CONFIG_HOME/<app>` or `~/.config/<app>`
//! - macOS:    `~/Library/Application Support/<app>`
//!
//! Layout inside the directory:
//!
//! ```text
//! <settings dir>/
//! ├── settings.cfg        user settings file (name chosen by the caller)
//! └── excludes/
//!     └── <project>       one excluded path per line
//! ```

use std::path::{Path, PathBuf};

use tracing::info;

use super::StorageError;

/// Name of the folder holding per-project exclude files.
pub const EXCLUDES_DIR_NAME: &str = "excludes";

/// Location of the user's settings files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsDirectory {
    path: PathBuf,
}

impl SettingsDirectory {
    /// Uses `path` as the settings directory.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolves `<platform config base>/<app_dir>`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoPlatformSettingsDir`] when the base
    /// directory cannot be determined from the environment.
    pub fn platform_default(app_dir: &str) -> Result<Self, StorageError> {
        platform_config_base()
            .map(|base| Self::new(base.join(app_dir)))
            .ok_or(StorageError::NoPlatformSettingsDir)
    }

    /// The directory itself.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file directly inside the directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Folder holding per-project exclude files.
    pub fn excludes_dir(&self) -> PathBuf {
        self.path.join(EXCLUDES_DIR_NAME)
    }

    /// Creates the directory and its parents if missing.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the directory cannot be created.
    pub fn ensure_exists(&self) -> Result<(), StorageError> {
        if self.path.is_dir() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;
        info!("created settings directory {}", self.path.display());
        Ok(())
    }
}

/// Resolves the platform config base directory without the app subdirectory.
fn platform_config_base() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(PathBuf::from)
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        // Fallback for unsupported platforms.
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
