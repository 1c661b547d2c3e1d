//! # prefs
//!
//! Hierarchical, file-backed application settings that keep the user's
//! comments and formatting intact.
//!
//! - **`settings`** – [`Settings`] nodes: typed reads, writes that save
//!   immediately, nested sections and change listeners.
//! - **`migration`** – [`SettingsMigrator`] and [`initialize_settings`]:
//!   bring a user file up to date with the shipped defaults on startup.
//! - **`excludes`** – [`Excludes`]: the per-project list of excluded paths.
//! - **`storage`** – [`SettingsDirectory`] and whole-file I/O.
//!
//! # Quick start
//!
//! ```no_run
//! use prefs::{initialize_settings, Settings, SettingsDirectory};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = SettingsDirectory::platform_default("myapp")?;
//! let path = initialize_settings("myapp", Path::new("defaults.cfg"), "settings.cfg", &dir)?;
//!
//! let settings = Settings::load(path)?;
//! settings.set("font size", 12)?;
//! let plugins = settings.add_section("Plugins")?;
//! plugins.set_defaults([("enabled", true)])?;
//! # Ok(())
//! # }
//! ```
//!
//! The library logs through `tracing` and never installs a subscriber.

pub mod excludes;
pub mod migration;
pub mod settings;
pub mod storage;

pub use excludes::{Excludes, ExcludesError, SettingsProvider, DEFAULT_DIRECTORY_KEY};
pub use migration::{initialize_settings, InitError, MergeError, MergeOutcome, SettingsMigrator};
pub use settings::{
    ChangeListener, ConfigurationError, Item, ListenerError, ListenerId, SectionError,
    SetOptions, Settings, SettingsError,
};
pub use storage::{SettingsDirectory, StorageError};

pub use prefs_core::Value;
