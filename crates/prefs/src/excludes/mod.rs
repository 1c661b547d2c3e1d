//! Per-project list of excluded paths.
//!
//! The active project is named after the last component of the
//! `default directory` setting.  Each project's exclusions live in their
//! own file, `<settings dir>/excludes/<project>`, one path per line:
//!
//! ```text
//! /home/me/project/results
//! /home/me/project/libs/vendored
//! ```
//!
//! A path is excluded when it is one of the entries or lies below one,
//! compared component by component: excluding `/foo` covers `/foo/bar`
//! but not `/foobar`.
//!
//! [`Excludes`] registers itself as a change listener on the settings it
//! is created from, so changing `default directory` switches project
//! without further wiring.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use prefs_core::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::settings::{ChangeListener, ListenerError, ListenerId, Settings};
use crate::storage::{read_optional, write_file, SettingsDirectory, StorageError};

/// Setting whose value names the active project directory.
pub const DEFAULT_DIRECTORY_KEY: &str = "default directory";

/// Error type for exclusion list updates.
#[derive(Debug, Error)]
pub enum ExcludesError {
    /// No project directory is configured, so there is no file to update.
    #[error("no active project: \"default directory\" is not set")]
    NoProject,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The part of a settings node [`Excludes`] depends on.
pub trait SettingsProvider {
    fn get_without_default(&self, key: &str) -> Option<Value>;
    fn add_change_listener(&self, listener: Rc<dyn ChangeListener>) -> ListenerId;
}

impl SettingsProvider for Settings {
    fn get_without_default(&self, key: &str) -> Option<Value> {
        Settings::get_without_default(self, key)
    }

    fn add_change_listener(&self, listener: Rc<dyn ChangeListener>) -> ListenerId {
        Settings::add_change_listener(self, listener)
    }
}

#[derive(Debug, Default)]
struct Project {
    name: Option<String>,
    file: Option<PathBuf>,
    /// Loaded on first use, dropped on project switch.
    entries: Option<Vec<String>>,
}

/// Exclusion list of the active project.
#[derive(Debug)]
pub struct Excludes {
    excludes_dir: PathBuf,
    project: RefCell<Project>,
}

impl Excludes {
    /// Resolves the active project from `settings` and starts following
    /// changes to [`DEFAULT_DIRECTORY_KEY`].
    pub fn new(settings: &dyn SettingsProvider, dir: &SettingsDirectory) -> Rc<Self> {
        let excludes = Rc::new(Self {
            excludes_dir: dir.excludes_dir(),
            project: RefCell::new(Project::default()),
        });
        excludes.switch_project(settings.get_without_default(DEFAULT_DIRECTORY_KEY).as_ref());
        let listener: Rc<dyn ChangeListener> = excludes.clone();
        settings.add_change_listener(listener);
        excludes
    }

    /// Name of the active project.
    pub fn project_name(&self) -> Option<String> {
        self.project.borrow().name.clone()
    }

    /// File holding the active project's exclusions.
    pub fn exclude_file_path(&self) -> Option<PathBuf> {
        self.project.borrow().file.clone()
    }

    /// Entries of the active project; empty without one.
    ///
    /// # Errors
    ///
    /// Returns [`ExcludesError::Storage`] if the file cannot be read.
    pub fn get_excludes(&self) -> Result<Vec<String>, ExcludesError> {
        match self.load_entries() {
            Ok(entries) => Ok(entries),
            Err(ExcludesError::NoProject) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Adds `paths` that are not excluded yet and saves the list.
    ///
    /// Trailing separators are ignored, so `/foo/bar/` and `/foo/bar` are
    /// the same entry.
    ///
    /// # Errors
    ///
    /// Returns [`ExcludesError::NoProject`] without an active project and
    /// [`ExcludesError::Storage`] if the file cannot be read or written.
    pub fn update_excludes<I, S>(&self, paths: I) -> Result<(), ExcludesError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = self.load_entries()?;
        for path in paths {
            let path = normalize(path.as_ref());
            if !path.is_empty() && !entries.contains(&path) {
                entries.push(path);
            }
        }
        self.store_entries(entries)
    }

    /// Removes `path` from the list.  Returns `false` if it was not there.
    ///
    /// # Errors
    ///
    /// See [`Excludes::update_excludes`].
    pub fn remove_path(&self, path: &str) -> Result<bool, ExcludesError> {
        let mut entries = self.load_entries()?;
        let path = normalize(path);
        let before = entries.len();
        entries.retain(|e| *e != path);
        if entries.len() == before {
            return Ok(false);
        }
        self.store_entries(entries)?;
        Ok(true)
    }

    /// Returns `true` if `path` is an entry or lies below one.
    ///
    /// # Errors
    ///
    /// Returns [`ExcludesError::Storage`] if the file cannot be read.
    pub fn check_path(&self, path: impl AsRef<Path>) -> Result<bool, ExcludesError> {
        let path = path.as_ref();
        Ok(self
            .get_excludes()?
            .iter()
            .any(|entry| path.starts_with(entry)))
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn switch_project(&self, directory: Option<&Value>) {
        let name = directory
            .and_then(Value::as_str)
            .and_then(|dir| Path::new(dir).file_name())
            .map(|name| name.to_string_lossy().into_owned());
        let file = name.as_ref().map(|n| self.excludes_dir.join(n));
        info!("active excludes project is now {name:?}");
        *self.project.borrow_mut() = Project {
            name,
            file,
            entries: None,
        };
    }

    fn load_entries(&self) -> Result<Vec<String>, ExcludesError> {
        let mut project = self.project.borrow_mut();
        let file = project.file.clone().ok_or(ExcludesError::NoProject)?;
        if let Some(entries) = &project.entries {
            return Ok(entries.clone());
        }
        let mut entries: Vec<String> = Vec::new();
        for line in read_optional(&file)?.unwrap_or_default().lines() {
            let entry = normalize(line.trim_end());
            if !entry.is_empty() && !entries.contains(&entry) {
                entries.push(entry);
            }
        }
        debug!("loaded {} excludes from {}", entries.len(), file.display());
        project.entries = Some(entries.clone());
        Ok(entries)
    }

    fn store_entries(&self, entries: Vec<String>) -> Result<(), ExcludesError> {
        let mut project = self.project.borrow_mut();
        let file = project.file.clone().ok_or(ExcludesError::NoProject)?;
        let contents: String = entries.iter().map(|e| format!("{e}\n")).collect();
        write_file(&file, &contents)?;
        project.entries = Some(entries);
        Ok(())
    }
}

impl ChangeListener for Excludes {
    fn setting_changed(
        &self,
        key: &str,
        _old: Option<&Value>,
        new: &Value,
    ) -> Result<(), ListenerError> {
        if key == DEFAULT_DIRECTORY_KEY {
            self.switch_project(Some(new));
        }
        Ok(())
    }
}

/// Strips trailing separators, keeping a lone root separator.
fn normalize(path: &str) -> String {
    let path = path.trim_end_matches(['\r', '\n']);
    let trimmed = path.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        path.chars().next().map(String::from).unwrap_or_default()
    } else {
        trimmed.to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
