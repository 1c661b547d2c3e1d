//! Change notification for settings nodes.
//!
//! # Observer list (for beginners)
//!
//! A component that caches something derived from a setting registers a
//! [`ChangeListener`] on the node holding that setting.  Every time a value
//! on that node actually changes (old and new differ), the node calls
//! [`ChangeListener::setting_changed`] on each listener, in registration
//! order, before the mutating call returns.
//!
//! ```rust
//! use std::rc::Rc;
//! use prefs::settings::{ChangeListener, ListenerError};
//! use prefs_core::Value;
//!
//! let log_change = |key: &str, _old: Option<&Value>, new: &Value| -> Result<(), ListenerError> {
//!     println!("{key} is now {new}");
//!     Ok(())
//! };
//! let listener: Rc<dyn ChangeListener> = Rc::new(log_change);
//! # let _ = listener;
//! ```
//!
//! Registration returns a [`ListenerId`] that removes the listener again.

use std::rc::Rc;

use prefs_core::Value;

/// Error a listener hands back to the caller of the mutation.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Receives value changes from a settings node.
pub trait ChangeListener {
    /// Called after `key` changed from `old` (`None` when newly created) to
    /// `new`.
    ///
    /// # Errors
    ///
    /// An error is returned unchanged to the code that changed the setting.
    fn setting_changed(&self, key: &str, old: Option<&Value>, new: &Value)
        -> Result<(), ListenerError>;
}

impl<F> ChangeListener for F
where
    F: Fn(&str, Option<&Value>, &Value) -> Result<(), ListenerError>,
{
    fn setting_changed(
        &self,
        key: &str,
        old: Option<&Value>,
        new: &Value,
    ) -> Result<(), ListenerError> {
        self(key, old, new)
    }
}

/// Handle returned by `add_change_listener`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registration {
    id: ListenerId,
    section: Vec<String>,
    listener: Rc<dyn ChangeListener>,
}

/// All listeners of one settings file, keyed by section path.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: u64,
    registrations: Vec<Registration>,
}

impl ListenerRegistry {
    pub(crate) fn add(&mut self, section: &[String], listener: Rc<dyn ChangeListener>) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.registrations.push(Registration {
            id,
            section: section.to_vec(),
            listener,
        });
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        self.registrations.len() != before
    }

    /// Listeners of the node at `section`, in registration order.
    pub(crate) fn for_section(&self, section: &[String]) -> Vec<Rc<dyn ChangeListener>> {
        self.registrations
            .iter()
            .filter(|r| r.section == section)
            .map(|r| Rc::clone(&r.listener))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.registrations.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Rc<dyn ChangeListener> {
        Rc::new(|_: &str, _: Option<&Value>, _: &Value| -> Result<(), ListenerError> { Ok(()) })
    }

    #[test]
    fn test_ids_are_unique() {
        let mut registry = ListenerRegistry::default();
        let a = registry.add(&[], noop());
        let b = registry.add(&[], noop());
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_for_section_filters_by_path() {
        // Arrange
        let mut registry = ListenerRegistry::default();
        let section = vec!["Plugins".to_string()];
        registry.add(&[], noop());
        registry.add(&section, noop());

        // Act / Assert
        assert_eq!(registry.for_section(&section).len(), 1);
        assert_eq!(registry.for_section(&[]).len(), 1);
        assert!(registry.for_section(&["Other".to_string()]).is_empty());
    }

    #[test]
    fn test_remove_unknown_id_is_false() {
        let mut registry = ListenerRegistry::default();
        let id = registry.add(&[], noop());
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert_eq!(registry.len(), 0);
    }
}
