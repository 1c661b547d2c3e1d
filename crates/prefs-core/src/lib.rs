//! # prefs-core
//!
//! The structured text store behind the `prefs` settings tree: the value
//! model, the literal codec that turns values into text and back, and the
//! record-oriented document that keeps comments, blank lines and the
//! original spelling of every untouched line.
//!
//! This crate has no file-system access.  Callers hand it the text of a
//! settings file and get the text back after mutating the document.
//!
//! # Format overview (for beginners)
//!
//! A settings file looks like an INI file whose values are written as
//! Python literals:
//!
//! ```text
//! # Main comment
//! string = 'value'
//! int = 13
//! boolean = True
//!
//! [Section 1]
//! list = [1, 2]
//! tuple = (1, 2)
//!     [[Nested]]
//!     mapping = {'a': 1}
//! ```
//!
//! - **`domain`** – the [`Value`] type every setting holds.
//! - **`format`** – parsing and rendering: [`format::literal`] handles a
//!   single value, [`format::document`] handles whole files.

pub mod domain;
pub mod format;

// Re-export the most-used types at the crate root so callers can write
// `prefs_core::Document` instead of `prefs_core::format::document::Document`.
pub use domain::value::Value;
pub use format::document::{Document, FillReport, FormatError, KeyConflict, Section};
pub use format::literal::{parse_value, to_literal, LiteralError};
