//! Record-oriented settings document.
//!
//! A settings file is parsed into a tree of [`Section`]s.  Each section
//! keeps its lines as an ordered list of records:
//!
//! ```text
//! record            example                      kept as
//! ───────────────   ──────────────────────────   ─────────────────────────
//! trivia            "# Main comment", ""         the raw line
//! entry             "int = 13  # note"           prefix | literal | suffix
//! section header    "[Section 1]"                the raw line
//! ```
//!
//! Mutating a setting only replaces the literal slot of its entry; the
//! prefix (indentation, key spelling, separator) and the suffix (inline
//! comment) are untouched.  New settings become new records.  Rendering
//! concatenates the records, so a file that was loaded and not modified
//! renders byte-for-byte identical to its input.
//!
//! # Nesting
//!
//! Section depth is the number of brackets: `[A]` is depth 1, `[[B]]`
//! inside it is depth 2.  As in INI files, every `key = value` line belongs
//! to the nearest header above it, so a section's entries always come
//! before its child sections.

use std::str::FromStr;

use thiserror::Error;
use tracing::trace;

use crate::domain::value::Value;
use crate::format::literal::{parse_literal, to_literal, LiteralError};

/// Indentation unit for sections and entries created by this module.
const INDENT: &str = "    ";

/// Errors produced while parsing a settings document.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormatError {
    /// The line is not a comment, a blank line, a `key = value` pair or a
    /// well-formed section header, or it breaks the tree structure
    /// (duplicate names, a section nested more than one level deeper than
    /// its parent).
    #[error("line {line}: {message}")]
    Structure { line: usize, message: String },

    /// No line of the text is a section header or a `key = value` pair, so
    /// the text is not a settings file at all.
    #[error("line {line}: not a settings file: {message}")]
    Unparseable { line: usize, message: String },

    /// A well-formed `key = value` line whose value is not a valid literal.
    #[error("line {line}: invalid value for {key:?}: {source}")]
    Value {
        line: usize,
        key: String,
        #[source]
        source: LiteralError,
    },
}

impl FormatError {
    /// 1-based line number the error refers to.
    pub fn line(&self) -> usize {
        match self {
            FormatError::Structure { line, .. }
            | FormatError::Unparseable { line, .. }
            | FormatError::Value { line, .. } => *line,
        }
    }

    /// Returns `true` for errors in the line grammar rather than in a value.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            FormatError::Structure { .. } | FormatError::Unparseable { .. }
        )
    }

    /// Returns `true` when nothing in the text could be read as a record.
    pub fn is_unparseable(&self) -> bool {
        matches!(self, FormatError::Unparseable { .. })
    }
}

/// A key that cannot be used for the requested kind of item.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyConflict {
    /// A value was written to a key that names a section.
    #[error("{0:?} is a section")]
    IsSection(String),

    /// A section was requested under a key that holds a value.
    #[error("{0:?} is a value, not a section")]
    IsValue(String),

    /// The name cannot be written to a settings file: it is empty, spans
    /// several lines, or needs quoting but contains both quote characters.
    #[error("{0:?} cannot be used as a key or section name")]
    InvalidName(String),
}

/// What [`Section::fill_from`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    /// `/`-separated paths of keys and sections that were added.
    pub added: Vec<String>,
    /// Paths skipped because the two sides disagree on value vs. section.
    pub conflicts: Vec<String>,
}

// ── Records ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Record {
    /// Blank or comment line, emitted verbatim.
    Trivia(String),
    Entry(Entry),
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    key: String,
    value: Value,
    /// Everything before the literal: indentation, key, `=` and spacing.
    prefix: String,
    /// The literal as written.  May span lines for triple-quoted strings.
    text: String,
    /// Everything after the literal: spacing and an optional comment.
    suffix: String,
}

impl Entry {
    fn render(&self) -> String {
        format!("{}{}{}", self.prefix, self.text, self.suffix)
    }

    fn indent(&self) -> &str {
        leading_ws(&self.prefix)
    }
}

// ── Section ───────────────────────────────────────────────────────────────────

/// One scope of a settings document: the file root or a `[section]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    name: String,
    depth: usize,
    /// Raw header line; `None` for the root.
    header: Option<String>,
    records: Vec<Record>,
    children: Vec<Section>,
}

impl Section {
    fn root() -> Self {
        Self {
            name: String::new(),
            depth: 0,
            header: None,
            records: Vec::new(),
            children: Vec::new(),
        }
    }

    fn with_header(name: &str, depth: usize, header: String) -> Self {
        Self {
            name: name.to_string(),
            depth,
            header: Some(header),
            records: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Section name; empty for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nesting depth; `0` for the root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entry(key).map(|e| &e.value)
    }

    /// Returns `true` if `key` names a value or a child section.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entry(key).is_some() || self.child(key).is_some()
    }

    /// Returns the child section called `name`.
    pub fn child(&self, name: &str) -> Option<&Section> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Mutable access to the child section called `name`.
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Follows `path` down the tree; an empty path is `self`.
    pub fn descendant<S: AsRef<str>>(&self, path: &[S]) -> Option<&Section> {
        path.iter()
            .try_fold(self, |section, name| section.child(name.as_ref()))
    }

    /// Mutable variant of [`Section::descendant`].
    pub fn descendant_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut Section> {
        path.iter()
            .try_fold(self, |section, name| section.child_mut(name.as_ref()))
    }

    /// Values in file order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.records.iter().filter_map(|r| match r {
            Record::Entry(e) => Some((e.key.as_str(), &e.value)),
            Record::Trivia(_) => None,
        })
    }

    /// Child sections in file order.
    pub fn children(&self) -> impl Iterator<Item = &Section> {
        self.children.iter()
    }

    /// All keys: values first, then child sections.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries()
            .map(|(k, _)| k)
            .chain(self.children.iter().map(|c| c.name.as_str()))
    }

    /// Number of values plus child sections.
    pub fn len(&self) -> usize {
        self.keys().count()
    }

    /// Returns `true` when the section holds neither values nor children.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores `value` under `key`, returning the previous value.
    ///
    /// An existing entry keeps its position, key spelling and inline
    /// comment; only the literal is rewritten, and not even that when the
    /// value is unchanged.  A new entry is placed after the last existing
    /// entry of the section.
    ///
    /// # Errors
    ///
    /// Returns [`KeyConflict::IsSection`] if `key` names a child section
    /// and [`KeyConflict::InvalidName`] if `key` cannot be written out.
    pub fn set_value(&mut self, key: &str, value: Value) -> Result<Option<Value>, KeyConflict> {
        check_name(key)?;
        if self.child(key).is_some() {
            return Err(KeyConflict::IsSection(key.to_string()));
        }
        Ok(self.put_value(key, value, &[]))
    }

    /// Returns the child section `name`, creating an empty one if needed.
    ///
    /// # Errors
    ///
    /// Returns [`KeyConflict::IsValue`] if `name` holds a value and
    /// [`KeyConflict::InvalidName`] if `name` cannot be written out.
    pub fn add_child(&mut self, name: &str) -> Result<&mut Section, KeyConflict> {
        check_name(name)?;
        if self.entry(name).is_some() {
            return Err(KeyConflict::IsValue(name.to_string()));
        }
        Ok(self.ensure_child(name))
    }

    /// Removes the value or child section called `key`.
    ///
    /// Comment lines around a removed value stay where they are.
    pub fn remove(&mut self, key: &str) -> bool {
        if let Some(idx) = self.entry_index(key) {
            self.records.remove(idx);
            return true;
        }
        if let Some(idx) = self.children.iter().position(|c| c.name == key) {
            self.children.remove(idx);
            return true;
        }
        false
    }

    /// Comment lines directly above the entry for `key`, without indentation.
    ///
    /// A blank line ends the block.
    pub fn leading_comments(&self, key: &str) -> Vec<String> {
        let Some(idx) = self.entry_index(key) else {
            return Vec::new();
        };
        let mut comments: Vec<String> = self.records[..idx]
            .iter()
            .rev()
            .map_while(|r| match r {
                Record::Trivia(line) if line.trim_start().starts_with('#') => {
                    Some(line.trim_start().to_string())
                }
                _ => None,
            })
            .collect();
        comments.reverse();
        comments
    }

    /// Copies every value and section of `other` that `self` lacks.
    ///
    /// Existing values are never overwritten and sections present on both
    /// sides are filled recursively.  With `carry_comments`, the comment
    /// block above each copied value in `other` is copied along with it.
    /// Keys that are a value on one side and a section on the other are
    /// left alone and listed in [`FillReport::conflicts`].
    pub fn fill_from(&mut self, other: &Section, carry_comments: bool) -> FillReport {
        let mut report = FillReport::default();
        self.fill_recursive(other, carry_comments, "", &mut report);
        report
    }

    fn fill_recursive(
        &mut self,
        other: &Section,
        carry_comments: bool,
        path: &str,
        report: &mut FillReport,
    ) {
        for (key, value) in other.entries() {
            let key_path = join_path(path, key);
            if self.child(key).is_some() {
                report.conflicts.push(key_path);
            } else if self.entry(key).is_none() {
                let comments = if carry_comments {
                    other.leading_comments(key)
                } else {
                    Vec::new()
                };
                self.put_value(key, value.clone(), &comments);
                report.added.push(key_path);
            }
        }
        for source in &other.children {
            let child_path = join_path(path, &source.name);
            if self.entry(&source.name).is_some() {
                report.conflicts.push(child_path);
                continue;
            }
            if self.child(&source.name).is_none() {
                report.added.push(child_path.clone());
            }
            self.ensure_child(&source.name)
                .fill_recursive(source, carry_comments, &child_path, report);
        }
    }

    /// Makes the content of `self` equal to the content of `other`.
    ///
    /// Keys missing from `other` are dropped; keys present on both sides
    /// keep their formatting.
    pub fn replace_with(&mut self, other: &Section) {
        let stale: Vec<String> = self
            .keys()
            .filter(|k| !other.contains_key(k))
            .map(str::to_string)
            .collect();
        for key in &stale {
            self.remove(key);
        }
        for (key, value) in other.entries() {
            if self.child(key).is_some() {
                self.remove(key);
            }
            self.put_value(key, value.clone(), &[]);
        }
        for source in &other.children {
            if self.entry(&source.name).is_some() {
                self.remove(&source.name);
            }
            self.ensure_child(&source.name).replace_with(source);
        }
    }

    /// Snapshot of the section as a [`Value::Map`]; child sections nest as
    /// maps.
    pub fn to_value(&self) -> Value {
        let values = self.entries().map(|(k, v)| (k.to_string(), v.clone()));
        let sections = self
            .children
            .iter()
            .map(|c| (c.name.clone(), c.to_value()));
        Value::Map(values.chain(sections).collect())
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn entry_index(&self, key: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|r| matches!(r, Record::Entry(e) if e.key == key))
    }

    fn entry(&self, key: &str) -> Option<&Entry> {
        self.records.iter().find_map(|r| match r {
            Record::Entry(e) if e.key == key => Some(e),
            _ => None,
        })
    }

    /// Sets a value; the caller has ruled out a section under `key`.
    fn put_value(&mut self, key: &str, value: Value, comments: &[String]) -> Option<Value> {
        if let Some(idx) = self.entry_index(key) {
            if let Record::Entry(entry) = &mut self.records[idx] {
                if entry.value == value {
                    return Some(value);
                }
                entry.text = to_literal(&value);
                return Some(std::mem::replace(&mut entry.value, value));
            }
        }

        let indent = self.entry_indent();
        let at = self
            .records
            .iter()
            .rposition(|r| matches!(r, Record::Entry(_)))
            .map_or(self.records.len(), |i| i + 1);
        let mut new_records: Vec<Record> = comments
            .iter()
            .map(|c| Record::Trivia(format!("{indent}{c}")))
            .collect();
        new_records.push(Record::Entry(Entry {
            key: key.to_string(),
            prefix: format!("{indent}{} = ", format_key(key)),
            text: to_literal(&value),
            suffix: String::new(),
            value,
        }));
        self.records.splice(at..at, new_records);
        None
    }

    /// Returns or creates a child; the caller has ruled out a value under
    /// `name`.
    fn ensure_child(&mut self, name: &str) -> &mut Section {
        if let Some(idx) = self.children.iter().position(|c| c.name == name) {
            return &mut self.children[idx];
        }
        let depth = self.depth + 1;
        let header = format!(
            "{}{}{}{}",
            INDENT.repeat(depth - 1),
            "[".repeat(depth),
            format_section_name(name),
            "]".repeat(depth)
        );
        self.children.push(Section::with_header(name, depth, header));
        let idx = self.children.len() - 1;
        &mut self.children[idx]
    }

    /// Indentation for new entries: that of the last entry, else that of
    /// the header.
    fn entry_indent(&self) -> String {
        let last_entry = self.records.iter().rev().find_map(|r| match r {
            Record::Entry(e) => Some(e.indent()),
            Record::Trivia(_) => None,
        });
        match (last_entry, &self.header) {
            (Some(indent), _) => indent.to_string(),
            (None, Some(header)) => leading_ws(header).to_string(),
            (None, None) => String::new(),
        }
    }

    fn render_into(&self, out: &mut Vec<String>) {
        if let Some(header) = &self.header {
            out.push(header.clone());
        }
        for record in &self.records {
            match record {
                Record::Trivia(line) => out.push(line.clone()),
                Record::Entry(entry) => out.push(entry.render()),
            }
        }
        for child in &self.children {
            child.render_into(out);
        }
    }
}

// ── Document ──────────────────────────────────────────────────────────────────

/// A parsed settings file.
///
/// # Examples
///
/// ```rust
/// use prefs_core::{Document, Value};
///
/// let text = "# size\nwidth = 10  # px\n";
/// let mut doc: Document = text.parse().unwrap();
/// doc.root_mut().set_value("width", Value::Int(12)).unwrap();
/// assert_eq!(doc.render(), "# size\nwidth = 12  # px\n");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Section,
    /// `"\r\n"` when the source used Windows line endings.
    line_ending: &'static str,
    trailing_newline: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document.
    pub fn new() -> Self {
        Self {
            root: Section::root(),
            line_ending: "\n",
            trailing_newline: true,
        }
    }

    /// Parses the text of a settings file.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Structure`] for lines that fit none of the
    /// record kinds and [`FormatError::Value`] for invalid literals.
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        let line_ending = if text.contains("\r\n") { "\r\n" } else { "\n" };
        let normalized = text.replace("\r\n", "\n");
        let trailing_newline = normalized.is_empty() || normalized.ends_with('\n');
        let body = normalized.strip_suffix('\n').unwrap_or(&normalized);
        let lines: Vec<&str> = if normalized.is_empty() {
            Vec::new()
        } else {
            body.split('\n').collect()
        };

        // A bad line in a file that otherwise holds records is a structure
        // error; a text without a single record is unparseable.
        let has_records = lines.iter().any(|l| is_record_line(l));
        let grammar_error = |line: usize, message: String| {
            if has_records {
                FormatError::Structure { line, message }
            } else {
                FormatError::Unparseable { line, message }
            }
        };

        let mut ancestors: Vec<Section> = Vec::new();
        let mut current = Section::root();
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            let line_no = i + 1;
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                current.records.push(Record::Trivia(line.to_string()));
                i += 1;
                continue;
            }

            if trimmed.starts_with('[') {
                let (depth, name) =
                    parse_header(trimmed).map_err(|message| grammar_error(line_no, message))?;
                if depth > current.depth + 1 {
                    return Err(FormatError::Structure {
                        line: line_no,
                        message: format!("section {name:?} is nested too deeply"),
                    });
                }
                while current.depth >= depth {
                    let Some(mut parent) = ancestors.pop() else {
                        break;
                    };
                    parent.children.push(current);
                    current = parent;
                }
                if current.contains_key(&name) {
                    return Err(FormatError::Structure {
                        line: line_no,
                        message: format!("duplicate name {name:?}"),
                    });
                }
                let section = Section::with_header(&name, depth, line.to_string());
                ancestors.push(std::mem::replace(&mut current, section));
                i += 1;
                continue;
            }

            let (key, value_start) =
                split_key(line).map_err(|message| grammar_error(line_no, message))?;
            if current.contains_key(&key) {
                return Err(FormatError::Structure {
                    line: line_no,
                    message: format!("duplicate name {key:?}"),
                });
            }

            // Triple-quoted strings may continue on the following lines.
            let mut raw = line[value_start..].to_string();
            let mut consumed = 1;
            let (value, end) = loop {
                match parse_literal(&raw) {
                    Ok(parsed) => break parsed,
                    Err(e) if e.is_open_triple_quote() && i + consumed < lines.len() => {
                        raw.push('\n');
                        raw.push_str(lines[i + consumed]);
                        consumed += 1;
                    }
                    Err(source) => {
                        return Err(FormatError::Value {
                            line: line_no,
                            key,
                            source,
                        })
                    }
                }
            };
            let suffix = &raw[end..];
            let rest = suffix.trim_start();
            if !rest.is_empty() && !rest.starts_with('#') {
                return Err(FormatError::Value {
                    line: line_no,
                    key,
                    source: LiteralError::TrailingInput(rest.to_string()),
                });
            }

            current.records.push(Record::Entry(Entry {
                prefix: line[..value_start].to_string(),
                text: raw[..end].to_string(),
                suffix: suffix.to_string(),
                key,
                value,
            }));
            i += consumed;
        }

        while let Some(mut parent) = ancestors.pop() {
            parent.children.push(current);
            current = parent;
        }
        trace!("parsed settings document with {} lines", lines.len());

        Ok(Self {
            root: current,
            line_ending,
            trailing_newline,
        })
    }

    /// The top-level scope.
    pub fn root(&self) -> &Section {
        &self.root
    }

    /// Mutable access to the top-level scope.
    pub fn root_mut(&mut self) -> &mut Section {
        &mut self.root
    }

    /// The section at `path` below the root.
    pub fn section<S: AsRef<str>>(&self, path: &[S]) -> Option<&Section> {
        self.root.descendant(path)
    }

    /// Mutable variant of [`Document::section`].
    pub fn section_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut Section> {
        self.root.descendant_mut(path)
    }

    /// Produces the file text.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        self.root.render_into(&mut lines);
        let mut out = lines.join("\n");
        if self.trailing_newline && !lines.is_empty() {
            out.push('\n');
        }
        if self.line_ending == "\n" {
            out
        } else {
            out.replace('\n', self.line_ending)
        }
    }
}

impl FromStr for Document {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Document::parse(s)
    }
}

// ── Line grammar helpers ──────────────────────────────────────────────────────

fn leading_ws(s: &str) -> &str {
    &s[..s.len() - s.trim_start().len()]
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}/{key}")
    }
}

/// Parses a trimmed `[name]` / `[[name]]` line into depth and name.
fn parse_header(trimmed: &str) -> Result<(usize, String), String> {
    let depth = trimmed.chars().take_while(|c| *c == '[').count();
    let rest = trimmed[depth..].trim_start();

    let (name, after) = match rest.chars().next() {
        Some(q @ ('"' | '\'')) => {
            let close = rest[1..]
                .find(q)
                .ok_or_else(|| "unterminated quoted section name".to_string())?;
            (rest[1..1 + close].to_string(), &rest[close + 2..])
        }
        _ => {
            let close = rest
                .find(']')
                .ok_or_else(|| "missing ']' in section header".to_string())?;
            (rest[..close].trim_end().to_string(), &rest[close..])
        }
    };

    let after = after.trim_start();
    let closing = after.chars().take_while(|c| *c == ']').count();
    if closing != depth {
        return Err(format!("mismatched brackets in section header {name:?}"));
    }
    let tail = after[closing..].trim_start();
    if !tail.is_empty() && !tail.starts_with('#') {
        return Err(format!("unexpected text after section header {name:?}"));
    }
    if name.is_empty() {
        return Err("empty section name".to_string());
    }
    Ok((depth, name))
}

/// Splits a `key = value` line into the key and the byte offset where the
/// value starts.
fn split_key(line: &str) -> Result<(String, usize), String> {
    let indent = leading_ws(line).len();
    let body = &line[indent..];

    let (key, key_end) = match body.chars().next() {
        Some(q @ ('"' | '\'')) => {
            let close = body[1..]
                .find(q)
                .ok_or_else(|| "unterminated quoted key".to_string())?;
            (body[1..1 + close].to_string(), indent + close + 2)
        }
        _ => {
            let eq = body
                .find('=')
                .ok_or_else(|| format!("expected 'key = value', found {body:?}"))?;
            (body[..eq].trim_end().to_string(), indent + eq)
        }
    };
    if key.is_empty() {
        return Err("empty key".to_string());
    }

    let after_key = line[key_end..].trim_start();
    if !after_key.starts_with('=') {
        return Err(format!("expected '=' after key {key:?}"));
    }
    let after_eq = line.len() - after_key.len() + 1;
    let value_start = after_eq + leading_ws(&line[after_eq..]).len();
    Ok((key, value_start))
}

/// Returns `true` for a header or a line shaped like `key = value`,
/// whether or not its value is valid.
fn is_record_line(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return false;
    }
    if trimmed.starts_with('[') {
        return parse_header(trimmed).is_ok();
    }
    split_key(line).is_ok()
}

/// Rejects names that would not read back as the same key.
fn check_name(name: &str) -> Result<(), KeyConflict> {
    let unwritable = name.is_empty()
        || name.contains(['\n', '\r'])
        || (needs_quotes(name) && name.contains('"') && name.contains('\''));
    if unwritable {
        return Err(KeyConflict::InvalidName(name.to_string()));
    }
    Ok(())
}

fn needs_quotes(name: &str) -> bool {
    name.trim() != name
        || name.starts_with(['"', '\'', '['])
        || name.contains(['=', '#', ']', '\n'])
}

fn quote_name(name: &str) -> String {
    let q = if name.contains('"') { '\'' } else { '"' };
    format!("{q}{name}{q}")
}

fn format_key(key: &str) -> String {
    if needs_quotes(key) {
        quote_name(key)
    } else {
        key.to_string()
    }
}

fn format_section_name(name: &str) -> String {
    format_key(name)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
