//! Settings file codec.
//!
//! - [`literal`] – one value ⇄ its literal text.
//! - [`document`] – a whole file ⇄ an ordered tree of records that keeps
//!   every untouched line byte-for-byte.

pub mod document;
pub mod literal;

pub use document::{Document, FillReport, FormatError, KeyConflict, Section};
pub use literal::{parse_literal, parse_value, to_literal, LiteralError};
