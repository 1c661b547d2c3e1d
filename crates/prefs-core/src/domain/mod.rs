//! Domain types for the settings store.
//!
//! Pure data with no parsing or I/O concerns.  The codec in
//! [`crate::format`] depends on this module, never the other way round.

/// The value held by a single setting.
///
/// See [`value::Value`] for the main type.
pub mod value;
