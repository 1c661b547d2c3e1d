//! Settings nodes.
//!
//! # Shared store (for beginners)
//!
//! Every node created from one file holds an `Rc<RefCell<Store>>` pointing
//! at the same `Store` plus its own section path (empty for the root).
//! Cloning a node is cheap and yields another handle to the same scope.
//!
//! ```text
//! Settings { path: [] } ───────────┐
//! Settings { path: ["Plugins"] } ──┼──▶ Store { document, file, listeners }
//! Settings { path: ["Plugins", "A"] } ┘
//! ```
//!
//! The `RefCell` borrow is always released before change listeners run,
//! so a listener may read (or even write) settings itself.

use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use prefs_core::{Document, Section, Value};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::listener::{ChangeListener, ListenerId, ListenerRegistry};
use super::{ConfigurationError, SectionError, SettingsError};
use crate::storage::{read_optional, write_file};

/// Controls how a write treats existing values and the file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetOptions {
    /// When `false`, keys that already exist are left untouched.
    pub override_existing: bool,
    /// When `true`, the file is written before the call returns.
    pub autosave: bool,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            override_existing: true,
            autosave: true,
        }
    }
}

impl SetOptions {
    /// Write-if-absent, saved immediately.
    pub fn keep_existing() -> Self {
        Self {
            override_existing: false,
            ..Self::default()
        }
    }

    /// Override, without touching the file.
    pub fn no_autosave() -> Self {
        Self {
            autosave: false,
            ..Self::default()
        }
    }
}

/// What a key refers to.
#[derive(Debug, Clone)]
pub enum Item {
    Value(Value),
    Section(Settings),
}

/// Document, backing file and listeners shared by all nodes of one file.
struct Store {
    document: Document,
    file: PathBuf,
    listeners: ListenerRegistry,
}

impl Store {
    fn save(&self) -> Result<(), SettingsError> {
        write_file(&self.file, &self.document.render())?;
        debug!("saved settings to {}", self.file.display());
        Ok(())
    }

    /// The section at `path`, recreating missing sections on the way.
    fn section_for_write(&mut self, path: &[String]) -> Result<&mut Section, SectionError> {
        let mut section = self.document.root_mut();
        for name in path {
            section = section.add_child(name)?;
        }
        Ok(section)
    }
}

/// One scope of a settings file.
#[derive(Clone)]
pub struct Settings {
    store: Rc<RefCell<Store>>,
    path: Vec<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("file", &self.file_path())
            .field("section", &self.path)
            .finish()
    }
}

impl Settings {
    /// Loads the settings file at `path`.
    ///
    /// A missing file yields an empty tree; the file is created on the
    /// first save.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Configuration`] if the file cannot be
    /// parsed and [`SettingsError::Storage`] if it cannot be read.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let file = path.into();
        let document = match read_optional(&file)? {
            Some(text) => Document::parse(&text).map_err(|source| ConfigurationError {
                path: file.clone(),
                source,
            })?,
            None => Document::new(),
        };
        debug!("loaded settings from {}", file.display());
        Ok(Self {
            store: Rc::new(RefCell::new(Store {
                document,
                file,
                listeners: ListenerRegistry::default(),
            })),
            path: Vec::new(),
        })
    }

    /// The file this tree is saved to.
    pub fn file_path(&self) -> PathBuf {
        self.store.borrow().file.clone()
    }

    /// Section names from the root down to this node.
    pub fn section_path(&self) -> &[String] {
        &self.path
    }

    /// Name of this section; `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    fn read<R>(&self, f: impl FnOnce(Option<&Section>) -> R) -> R {
        let store = self.store.borrow();
        f(store.document.section(self.path.as_slice()))
    }

    fn child_node(&self, name: &str) -> Settings {
        let mut path = self.path.clone();
        path.push(name.to_string());
        Settings {
            store: Rc::clone(&self.store),
            path,
        }
    }

    /// The value of `key`, or `default` when absent.  The default is not
    /// stored.
    pub fn get(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get_without_default(key)
            .unwrap_or_else(|| default.into())
    }

    /// The value of `key`, if it holds one.
    pub fn get_without_default(&self, key: &str) -> Option<Value> {
        self.read(|section| section.and_then(|s| s.get(key)).cloned())
    }

    /// The value of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::KeyNotFound`] if `key` holds no value.
    pub fn value(&self, key: &str) -> Result<Value, SettingsError> {
        self.get_without_default(key)
            .ok_or_else(|| SettingsError::KeyNotFound {
                key: key.to_string(),
                section: self.path.join("/"),
            })
    }

    /// The value or section stored under `key`.
    pub fn item(&self, key: &str) -> Option<Item> {
        if let Some(value) = self.get_without_default(key) {
            return Some(Item::Value(value));
        }
        self.section(key).map(Item::Section)
    }

    /// The child section called `name`.
    pub fn section(&self, name: &str) -> Option<Settings> {
        let exists = self.read(|section| section.and_then(|s| s.child(name)).is_some());
        exists.then(|| self.child_node(name))
    }

    /// Returns `true` if `key` names a value or a section.
    pub fn contains(&self, key: &str) -> bool {
        self.read(|section| section.is_some_and(|s| s.contains_key(key)))
    }

    /// Keys of this node: values in file order, then sections.
    pub fn keys(&self) -> Vec<String> {
        self.read(|section| {
            section
                .map(|s| s.keys().map(str::to_string).collect())
                .unwrap_or_default()
        })
    }

    /// Snapshot of this node as a [`Value::Map`], sections nested as maps.
    pub fn to_value(&self) -> Value {
        self.read(|section| section.map_or_else(|| Value::Map(Default::default()), Section::to_value))
    }

    /// Deserializes this node into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Extract`] if the content does not fit `T`.
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T, SettingsError> {
        let json = serde_json::to_value(self.to_value())?;
        Ok(serde_json::from_value(json)?)
    }

    // ── Writes ────────────────────────────────────────────────────────────────

    /// Stores `value` under `key`, overriding and saving.
    ///
    /// # Errors
    ///
    /// See [`Settings::set_with`].
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), SettingsError> {
        self.set_with(key, value, SetOptions::default())
    }

    /// Stores `value` under `key`.
    ///
    /// Listeners of this node are notified when the stored value changed.
    ///
    /// # Errors
    ///
    /// Returns [`SectionError::SectionExists`] if `key` names a section,
    /// [`SettingsError::Storage`] if saving fails and
    /// [`SettingsError::Listener`] if a listener rejects the change.
    pub fn set_with(
        &self,
        key: &str,
        value: impl Into<Value>,
        options: SetOptions,
    ) -> Result<(), SettingsError> {
        let value = value.into();
        let (old, listeners) = {
            let mut store = self.store.borrow_mut();
            let section = store.section_for_write(&self.path)?;
            if section.child(key).is_some() {
                return Err(SectionError::SectionExists(key.to_string()).into());
            }
            if section.get(key).is_some() && !options.override_existing {
                return Ok(());
            }
            let old = section.set_value(key, value.clone()).map_err(SectionError::from)?;
            if options.autosave {
                store.save()?;
            }
            if old.as_ref() == Some(&value) {
                return Ok(());
            }
            (old, store.listeners.for_section(&self.path))
        };
        for listener in listeners {
            listener
                .setting_changed(key, old.as_ref(), &value)
                .map_err(SettingsError::Listener)?;
        }
        Ok(())
    }

    /// Applies [`Settings::set_with`] to every pair and saves once.
    ///
    /// An empty iterator is a no-op.
    ///
    /// # Errors
    ///
    /// Stops at the first failing pair.  Pairs stored before the failure
    /// are still saved when `options.autosave` is set, and the pair's error
    /// is returned.
    pub fn set_values<K, V, I>(&self, pairs: I, options: SetOptions) -> Result<(), SettingsError>
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let per_key = SetOptions {
            autosave: false,
            ..options
        };
        let mut any = false;
        let mut outcome = Ok(());
        for (key, value) in pairs {
            any = true;
            if let Err(e) = self.set_with(key.as_ref(), value, per_key) {
                outcome = Err(e);
                break;
            }
        }
        if any && options.autosave {
            let saved = self.save();
            outcome = outcome.and(saved);
        }
        outcome
    }

    /// Stores every pair whose key is not set yet.
    ///
    /// # Errors
    ///
    /// See [`Settings::set_values`].
    pub fn set_defaults<K, V, I>(&self, pairs: I) -> Result<(), SettingsError>
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.set_values(pairs, SetOptions::keep_existing())
    }

    /// Returns the child section `name`, creating it when absent.
    ///
    /// # Errors
    ///
    /// Returns [`SectionError::ValueExists`] if `name` holds a value.
    pub fn add_section(&self, name: &str) -> Result<Settings, SettingsError> {
        self.add_section_with(name, std::iter::empty::<(&str, Value)>())
    }

    /// Returns the child section `name`, creating it when absent, and
    /// stores each default whose key is not set in it yet.
    ///
    /// # Errors
    ///
    /// Returns [`SectionError::ValueExists`] if `name` holds a value.
    pub fn add_section_with<K, V, I>(&self, name: &str, defaults: I) -> Result<Settings, SettingsError>
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let created = {
            let mut store = self.store.borrow_mut();
            let parent = store.section_for_write(&self.path)?;
            let existed = parent.child(name).is_some();
            parent.add_child(name).map_err(SectionError::from)?;
            !existed
        };
        let child = self.child_node(name);
        child.set_values(
            defaults,
            SetOptions {
                override_existing: false,
                autosave: false,
            },
        )?;
        if created {
            debug!("added settings section {:?}", child.path);
        }
        self.save()?;
        Ok(child)
    }

    /// Assigns the content of section `source` to the section `key`.
    ///
    /// With `override_existing` the target ends up with exactly the keys of
    /// `source`; without it only keys missing from the target are copied.
    /// The target is created when absent.
    ///
    /// # Errors
    ///
    /// Returns [`SectionError::ValueExists`] if `key` holds a value.
    pub fn set_section(
        &self,
        key: &str,
        source: &Settings,
        options: SetOptions,
    ) -> Result<(), SettingsError> {
        let snapshot = source.read(|section| section.cloned());
        let mut store = self.store.borrow_mut();
        let parent = store.section_for_write(&self.path)?;
        let existed = parent.child(key).is_some();
        let target = parent.add_child(key).map_err(SectionError::from)?;
        if let Some(snapshot) = snapshot {
            if existed && !options.override_existing {
                target.fill_from(&snapshot, false);
            } else {
                target.replace_with(&snapshot);
            }
        }
        if options.autosave {
            store.save()?;
        }
        Ok(())
    }

    /// Deletes the value or section `key` and saves.  Returns `false` when
    /// there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Storage`] if saving fails.
    pub fn remove(&self, key: &str) -> Result<bool, SettingsError> {
        let mut store = self.store.borrow_mut();
        let removed = store
            .document
            .section_mut(self.path.as_slice())
            .is_some_and(|s| s.remove(key));
        if removed {
            store.save()?;
        }
        Ok(removed)
    }

    /// Writes the whole file, whichever node it is called on.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Storage`] if the file cannot be written.
    pub fn save(&self) -> Result<(), SettingsError> {
        self.store.borrow().save()
    }

    // ── Listeners ─────────────────────────────────────────────────────────────

    /// Registers `listener` for value changes on this node.
    pub fn add_change_listener(&self, listener: Rc<dyn ChangeListener>) -> ListenerId {
        self.store.borrow_mut().listeners.add(&self.path, listener)
    }

    /// Unregisters a listener.  Returns `false` for an unknown id.
    pub fn remove_change_listener(&self, id: ListenerId) -> bool {
        self.store.borrow_mut().listeners.remove(id)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    use serde::Deserialize;
    use tempfile::TempDir;

    use super::*;
    use crate::settings::ListenerError;

    /// Records every notification it receives.
    #[derive(Default)]
    struct RecordingListener {
        calls: RefCell<Vec<(String, Option<Value>, Value)>>,
    }

    impl ChangeListener for RecordingListener {
        fn setting_changed(
            &self,
            key: &str,
            old: Option<&Value>,
            new: &Value,
        ) -> Result<(), ListenerError> {
            self.calls
                .borrow_mut()
                .push((key.to_string(), old.cloned(), new.clone()));
            Ok(())
        }
    }

    fn fresh() -> (TempDir, Settings) {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = Settings::load(dir.path().join("settings.cfg")).expect("load");
        (dir, settings)
    }

    fn reload(settings: &Settings) -> Settings {
        Settings::load(settings.file_path()).expect("reload")
    }

    // ── get / set ─────────────────────────────────────────────────────────────

    #[test]
    fn test_set_then_get_after_reload() {
        // Arrange
        let (_dir, settings) = fresh();

        // Act
        settings.set("foo", "bar").expect("set");

        // Assert
        assert_eq!(reload(&settings).get("foo", Value::Null), Value::from("bar"));
    }

    #[test]
    fn test_get_default_is_not_stored() {
        let (_dir, settings) = fresh();
        assert_eq!(settings.get("missing", 3), Value::Int(3));
        assert!(!settings.contains("missing"));
    }

    #[test]
    fn test_value_of_missing_key_is_key_not_found() {
        let (_dir, settings) = fresh();
        let err = settings.value("nope").unwrap_err();
        assert!(matches!(err, SettingsError::KeyNotFound { ref key, .. } if key == "nope"));
    }

    #[test]
    fn test_set_without_override_keeps_existing_value() {
        let (_dir, settings) = fresh();
        settings.set("foo", "bar").expect("set");
        settings
            .set_with("foo", "new", SetOptions::keep_existing())
            .expect("set");
        settings
            .set_with("fii", "new", SetOptions::keep_existing())
            .expect("set");
        assert_eq!(settings.value("foo").expect("foo"), Value::from("bar"));
        assert_eq!(settings.value("fii").expect("fii"), Value::from("new"));
    }

    #[test]
    fn test_set_without_autosave_does_not_touch_file() {
        // Arrange
        let (_dir, settings) = fresh();
        settings.set("foo", "bar").expect("set");

        // Act
        settings
            .set_with("foo", "unsaved", SetOptions::no_autosave())
            .expect("set");

        // Assert
        assert_eq!(reload(&settings).value("foo").expect("foo"), Value::from("bar"));
        settings.save().expect("save");
        assert_eq!(reload(&settings).value("foo").expect("foo"), Value::from("unsaved"));
    }

    #[test]
    fn test_set_value_over_section_is_section_error() {
        let (_dir, settings) = fresh();
        settings.add_section("Plugins").expect("add");
        let err = settings.set("Plugins", 1).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Section(SectionError::SectionExists(_))
        ));
    }

    #[test]
    fn test_set_values_with_empty_iterator_is_noop() {
        let (_dir, settings) = fresh();
        settings
            .set_values(None::<BTreeMap<String, Value>>.into_iter().flatten(), SetOptions::default())
            .expect("set");
        assert!(settings.keys().is_empty());
        assert!(!settings.file_path().exists());
    }

    #[test]
    fn test_set_defaults_only_fills_missing() {
        let (_dir, settings) = fresh();
        settings.set("foo", "user").expect("set");
        settings
            .set_defaults([("foo", "default"), ("zip", "2")])
            .expect("defaults");
        assert_eq!(settings.value("foo").expect("foo"), Value::from("user"));
        assert_eq!(settings.value("zip").expect("zip"), Value::from("2"));
    }

    // ── Sections ──────────────────────────────────────────────────────────────

    #[test]
    fn test_add_section_twice_returns_same_contents() {
        // Arrange
        let (_dir, settings) = fresh();
        let first = settings.add_section("Plugin 1").expect("add");
        first.set("foo", "bar").expect("set");

        // Act
        let second = settings.add_section("Plugin 1").expect("add again");

        // Assert
        assert_eq!(second.to_value(), first.to_value());
        assert_eq!(second.value("foo").expect("foo"), Value::from("bar"));
    }

    #[test]
    fn test_add_section_with_defaults_does_not_override() {
        let (_dir, settings) = fresh();
        settings
            .add_section("Plugin")
            .and_then(|s| s.set("foo", "user").map(|_| s))
            .expect("setup");
        let section = settings
            .add_section_with("Plugin", [("foo", "default"), ("new", "value")])
            .expect("add");
        assert_eq!(section.value("foo").expect("foo"), Value::from("user"));
        assert_eq!(section.value("new").expect("new"), Value::from("value"));
    }

    #[test]
    fn test_add_section_over_value_is_section_error() {
        let (_dir, settings) = fresh();
        settings.set("foo", 1).expect("set");
        let err = settings.add_section("foo").unwrap_err();
        assert!(matches!(err, SettingsError::Section(SectionError::ValueExists(_))));
    }

    #[test]
    fn test_nested_section_survives_reload() {
        let (_dir, settings) = fresh();
        settings
            .add_section("Plugin 1")
            .and_then(|p| p.add_section("Plugin 1.1"))
            .and_then(|s| s.set("foo", "bar"))
            .expect("nested set");

        let reloaded = reload(&settings);
        let nested = reloaded
            .section("Plugin 1")
            .and_then(|p| p.section("Plugin 1.1"))
            .expect("nested section");
        assert_eq!(nested.value("foo").expect("foo"), Value::from("bar"));
    }

    #[test]
    fn test_set_section_with_override_replaces_keys() {
        // Arrange
        let (_dir, settings) = fresh();
        let p1 = settings
            .add_section_with("Plugin 1", [("foo", "bar"), ("hello", "world")])
            .expect("p1");
        let p2 = settings
            .add_section_with("Plugin 2", [("zip", 2)])
            .expect("p2");

        // Act
        settings
            .set_section("Plugin 1", &p2, SetOptions::default())
            .expect("set section");

        // Assert
        assert_eq!(p1.keys(), vec!["zip"]);
        assert_eq!(p1.value("zip").expect("zip"), Value::Int(2));
    }

    #[test]
    fn test_set_section_without_override_fills_keys() {
        let (_dir, settings) = fresh();
        let p1 = settings
            .add_section_with("Plugin 1", [("foo", "bar")])
            .expect("p1");
        let p2 = settings
            .add_section_with("Plugin 2", [("foo", "other"), ("zip", "2")])
            .expect("p2");

        settings
            .set_section("Plugin 1", &p2, SetOptions::keep_existing())
            .expect("set section");

        assert_eq!(p1.value("foo").expect("foo"), Value::from("bar"));
        assert_eq!(p1.value("zip").expect("zip"), Value::from("2"));
    }

    #[test]
    fn test_set_section_over_value_is_section_error() {
        let (_dir, settings) = fresh();
        settings.set("foo", 1).expect("set");
        let source = settings.add_section("S").expect("add");
        let err = settings
            .set_section("foo", &source, SetOptions::default())
            .unwrap_err();
        assert!(matches!(err, SettingsError::Section(SectionError::ValueExists(_))));
    }

    #[test]
    fn test_item_distinguishes_values_and_sections() {
        let (_dir, settings) = fresh();
        settings.set("v", 1).expect("set");
        settings.add_section("S").expect("add");
        assert!(matches!(settings.item("v"), Some(Item::Value(Value::Int(1)))));
        assert!(matches!(settings.item("S"), Some(Item::Section(s)) if s.name() == Some("S")));
        assert!(settings.item("none").is_none());
    }

    #[test]
    fn test_remove_value_and_section() {
        let (_dir, settings) = fresh();
        settings.set("v", 1).expect("set");
        settings.add_section("S").expect("add");

        assert!(settings.remove("v").expect("remove"));
        assert!(settings.remove("S").expect("remove"));
        assert!(!settings.remove("v").expect("remove again"));
        assert!(reload(&settings).keys().is_empty());
    }

    #[test]
    fn test_extract_into_struct() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Window {
            width: i64,
            title: String,
        }

        let (_dir, settings) = fresh();
        let window = settings
            .add_section_with("Window", [("width", Value::Int(800)), ("title", Value::from("main"))])
            .expect("add");

        let extracted: Window = window.extract().expect("extract");
        assert_eq!(
            extracted,
            Window {
                width: 800,
                title: "main".to_string()
            }
        );
    }

    // ── Listeners ─────────────────────────────────────────────────────────────

    #[test]
    fn test_listener_receives_effective_changes_only() {
        // Arrange
        let (_dir, settings) = fresh();
        let listener = Rc::new(RecordingListener::default());
        settings.add_change_listener(listener.clone());

        // Act
        settings.set("foo", "bar").expect("set");
        settings.set("foo", "bar").expect("same value");
        settings.set("foo", "baz").expect("change");

        // Assert
        let calls = listener.calls.borrow();
        assert_eq!(
            *calls,
            vec![
                ("foo".to_string(), None, Value::from("bar")),
                ("foo".to_string(), Some(Value::from("bar")), Value::from("baz")),
            ]
        );
    }

    #[test]
    fn test_listener_is_scoped_to_its_section() {
        let (_dir, settings) = fresh();
        let section = settings.add_section("S").expect("add");
        let listener = Rc::new(RecordingListener::default());
        section.add_change_listener(listener.clone());

        settings.set("top", 1).expect("set");
        section.set("inner", 1).expect("set");

        assert_eq!(listener.calls.borrow().len(), 1);
        assert_eq!(listener.calls.borrow()[0].0, "inner");
    }

    #[test]
    fn test_removed_listener_is_not_called() {
        let (_dir, settings) = fresh();
        let listener = Rc::new(RecordingListener::default());
        let id = settings.add_change_listener(listener.clone());

        assert!(settings.remove_change_listener(id));
        settings.set("foo", 1).expect("set");

        assert!(listener.calls.borrow().is_empty());
    }

    #[test]
    fn test_listener_error_propagates_after_value_is_stored() {
        let (_dir, settings) = fresh();
        let failing: Rc<dyn ChangeListener> = Rc::new(
            |_: &str, _: Option<&Value>, _: &Value| -> Result<(), ListenerError> {
                Err("rejected".into())
            },
        );
        settings.add_change_listener(failing);

        let err = settings.set("foo", 1).unwrap_err();

        assert!(matches!(err, SettingsError::Listener(_)));
        assert_eq!(settings.value("foo").expect("stored"), Value::Int(1));
    }

    #[test]
    fn test_set_values_saves_stored_pairs_when_listener_fails() {
        // Arrange
        let (_dir, settings) = fresh();
        settings.set_values([("a", 0), ("b", 0)], SetOptions::default()).expect("seed");
        let failing: Rc<dyn ChangeListener> = Rc::new(
            |_: &str, _: Option<&Value>, _: &Value| -> Result<(), ListenerError> {
                Err("no".into())
            },
        );
        settings.add_change_listener(failing);

        // Act
        let err = settings
            .set_values([("a", 1), ("b", 2)], SetOptions::default())
            .unwrap_err();

        // Assert
        assert!(matches!(err, SettingsError::Listener(_)));
        assert_eq!(settings.value("a").expect("a"), Value::Int(1));
        assert_eq!(reload(&settings).to_value(), settings.to_value());
    }

    #[test]
    fn test_unwritable_key_is_rejected_and_file_stays_loadable() {
        let (_dir, settings) = fresh();
        settings.set("foo", 1).expect("set");

        let err = settings.set("", 2).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Section(SectionError::InvalidName(_))
        ));
        let err = settings.add_section("two\nlines").unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Section(SectionError::InvalidName(_))
        ));

        let reloaded = reload(&settings);
        assert_eq!(reloaded.keys(), vec!["foo".to_string()]);
    }

    #[test]
    fn test_listener_may_read_settings() {
        let (_dir, settings) = fresh();
        let seen = Rc::new(RefCell::new(None));
        let reader = settings.clone();
        let sink = Rc::clone(&seen);
        settings.add_change_listener(Rc::new(
            move |key: &str, _: Option<&Value>, _: &Value| -> Result<(), ListenerError> {
                *sink.borrow_mut() = reader.get_without_default(key);
                Ok(())
            },
        ));

        settings.set("foo", "bar").expect("set");

        assert_eq!(*seen.borrow(), Some(Value::from("bar")));
    }

    // ── Load errors ───────────────────────────────────────────────────────────

    #[test]
    fn test_load_invalid_value_is_configuration_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.cfg");
        std::fs::write(&path, "invalid = invalid\n").expect("write");

        let err = Settings::load(&path).unwrap_err();

        match err {
            SettingsError::Configuration(e) => {
                assert_eq!(e.path, path);
                assert!(!e.is_unparseable());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
