//! Value literal codec.
//!
//! Values are written in Python literal syntax, which is what users of the
//! desktop application have always seen in their settings files:
//!
//! ```text
//! 'text'   "text"   u'text'   r'raw\text'   '''multi
//! line'''  13   -2   1.5   1e-7   True   False   None
//! [1, 'a']   (1, 2)   (1,)   {'a': 1, 'b': [2]}
//! ```
//!
//! [`parse_literal`] reads one literal from the start of a string and
//! reports how many bytes it consumed, so the document parser can look at
//! what follows (an inline comment, or garbage).  [`to_literal`] renders a
//! [`Value`] the way Python's `repr` would, which keeps freshly written
//! lines consistent with hand-edited ones.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::value::Value;

/// Errors produced while parsing a value literal.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LiteralError {
    /// The input ended where a literal (or the rest of one) was expected.
    #[error("unexpected end of value")]
    UnexpectedEnd,

    /// A character that cannot start or continue a literal at this point.
    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    /// A bare word that is not `True`, `False`, `None`, `inf` or `nan`.
    #[error("unknown name {0:?}")]
    UnknownName(String),

    /// A string literal without its closing quote.
    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize, triple: bool },

    /// A token that looked numeric but did not parse.
    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    /// A mapping key that is not a string.
    #[error("mapping keys must be strings, found {0}")]
    NonStringKey(&'static str),

    /// Text after a complete literal that is not a `#` comment.
    #[error("unexpected text after value: {0:?}")]
    TrailingInput(String),
}

impl LiteralError {
    /// Returns `true` when more lines could complete a triple-quoted string.
    pub fn is_open_triple_quote(&self) -> bool {
        matches!(self, LiteralError::UnterminatedString { triple: true, .. })
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Parses one literal from the start of `src` (leading whitespace allowed).
///
/// Returns the value and the byte offset just past the literal.
///
/// # Errors
///
/// Returns [`LiteralError`] when `src` does not start with a valid literal.
///
/// # Examples
///
/// ```rust
/// use prefs_core::format::literal::parse_literal;
/// use prefs_core::Value;
///
/// let (value, end) = parse_literal("[1, 'a']  # note").unwrap();
/// assert_eq!(value, Value::List(vec![Value::Int(1), Value::from("a")]));
/// assert_eq!(end, 8);
/// ```
pub fn parse_literal(src: &str) -> Result<(Value, usize), LiteralError> {
    let mut parser = Parser { src, pos: 0 };
    parser.skip_ws();
    let value = parser.literal()?;
    Ok((value, parser.pos))
}

/// Parses `src` as exactly one literal, optionally followed by a comment.
///
/// # Errors
///
/// Returns [`LiteralError::TrailingInput`] if anything other than
/// whitespace or a `#` comment follows the literal.
pub fn parse_value(src: &str) -> Result<Value, LiteralError> {
    let (value, end) = parse_literal(src)?;
    let rest = src[end..].trim_start();
    if rest.is_empty() || rest.starts_with('#') {
        Ok(value)
    } else {
        Err(LiteralError::TrailingInput(rest.to_string()))
    }
}

/// Renders `value` as a literal that [`parse_value`] reads back unchanged.
///
/// Strings are always written on one line; embedded newlines become `\n`.
pub fn to_literal(value: &Value) -> String {
    let mut out = String::new();
    write_literal(&mut out, value);
    out
}

// ── Rendering ─────────────────────────────────────────────────────────────────

fn write_literal(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Int(i) => out.push_str(&i.to_string()),
        Value::Float(f) => out.push_str(&format_float(*f)),
        Value::Str(s) => write_str(out, s),
        Value::List(items) => {
            out.push('[');
            write_items(out, items);
            out.push(']');
        }
        Value::Tuple(items) => {
            out.push('(');
            write_items(out, items);
            if items.len() == 1 {
                out.push(',');
            }
            out.push(')');
        }
        Value::Map(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_str(out, key);
                out.push_str(": ");
                write_literal(out, item);
            }
            out.push('}');
        }
    }
}

fn write_items(out: &mut String, items: &[Value]) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_literal(out, item);
    }
}

/// Debug formatting always keeps a `.` or an exponent, so the text reads
/// back as a float rather than an integer.
fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f == f64::INFINITY {
        "inf".to_string()
    } else if f == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{f:?}")
    }
}

fn write_str(out: &mut String, s: &str) {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => {
                let code = c as u32;
                if code <= 0xff {
                    out.push_str(&format!("\\x{code:02x}"));
                } else {
                    out.push_str(&format!("\\u{code:04x}"));
                }
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}

// ── Parsing ───────────────────────────────────────────────────────────────────

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn unexpected(&self) -> LiteralError {
        match self.peek() {
            Some(ch) => LiteralError::UnexpectedChar {
                ch,
                offset: self.pos,
            },
            None => LiteralError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, want: char) -> Result<(), LiteralError> {
        if self.peek() == Some(want) {
            self.pos += want.len_utf8();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn literal(&mut self) -> Result<Value, LiteralError> {
        match self.peek() {
            None => Err(LiteralError::UnexpectedEnd),
            Some('[') => {
                self.bump();
                self.sequence(']').map(Value::List)
            }
            Some('(') => self.tuple(),
            Some('{') => self.mapping(),
            Some('\'') | Some('"') => self.string(false).map(Value::Str),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.name(),
            Some(_) => Err(self.unexpected()),
        }
    }

    /// Comma separated literals up to `close`; a trailing comma is allowed.
    fn sequence(&mut self, close: char) -> Result<Vec<Value>, LiteralError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                return Ok(items);
            }
            items.push(self.literal()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(c) if c == close => {
                    self.bump();
                    return Ok(items);
                }
                _ => return Err(self.unexpected()),
            }
        }
    }

    /// `()` is empty, `(x,)` is a one-tuple and `(x)` is just `x`.
    fn tuple(&mut self) -> Result<Value, LiteralError> {
        self.expect('(')?;
        self.skip_ws();
        if self.peek() == Some(')') {
            self.bump();
            return Ok(Value::Tuple(Vec::new()));
        }
        let first = self.literal()?;
        self.skip_ws();
        match self.peek() {
            Some(')') => {
                self.bump();
                Ok(first)
            }
            Some(',') => {
                self.bump();
                let mut items = vec![first];
                items.extend(self.sequence(')')?);
                Ok(Value::Tuple(items))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn mapping(&mut self) -> Result<Value, LiteralError> {
        self.expect('{')?;
        let mut map = BTreeMap::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(Value::Map(map));
            }
            let key = match self.literal()? {
                Value::Str(s) => s,
                other => return Err(LiteralError::NonStringKey(other.kind())),
            };
            self.skip_ws();
            self.expect(':')?;
            self.skip_ws();
            let value = self.literal()?;
            map.insert(key, value);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('}') => {
                    self.bump();
                    return Ok(Value::Map(map));
                }
                _ => return Err(self.unexpected()),
            }
        }
    }

    /// Bare words: keywords, or a `u`/`r` prefix glued to a string.
    fn name(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        let word = &self.src[start..self.pos];
        if matches!(self.peek(), Some('\'') | Some('"')) {
            let lower = word.to_ascii_lowercase();
            match lower.as_str() {
                "u" | "b" => return self.string(false).map(Value::Str),
                "r" | "ur" | "br" => return self.string(true).map(Value::Str),
                _ => {}
            }
        }
        match word {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            "inf" => Ok(Value::Float(f64::INFINITY)),
            "nan" => Ok(Value::Float(f64::NAN)),
            _ => Err(LiteralError::UnknownName(word.to_string())),
        }
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.bump();
            if self.src[self.pos..].starts_with("inf") {
                self.pos += 3;
                let negative = self.src[start..].starts_with('-');
                return Ok(Value::Float(if negative {
                    f64::NEG_INFINITY
                } else {
                    f64::INFINITY
                }));
            }
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' => is_float = true,
                'e' | 'E' => {
                    is_float = true;
                    // Exponent sign belongs to the number.
                    if matches!(self.peek_at(1), Some('-') | Some('+')) {
                        self.bump();
                    }
                }
                _ => break,
            }
            self.bump();
        }
        let text: String = self.src[start..self.pos].chars().filter(|c| *c != '_').collect();
        let parsed = if is_float {
            text.parse::<f64>().ok().map(Value::Float)
        } else {
            text.parse::<i64>().ok().map(Value::Int)
        };
        // Python 2 long suffix.
        if !is_float && matches!(self.peek(), Some('L') | Some('l')) {
            self.bump();
        }
        parsed.ok_or(LiteralError::InvalidNumber(self.src[start..self.pos].to_string()))
    }

    fn string(&mut self, raw: bool) -> Result<String, LiteralError> {
        let start = self.pos;
        let quote = self.bump().ok_or(LiteralError::UnexpectedEnd)?;
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2 * quote.len_utf8();
        } else if self.peek() == Some(quote) {
            // Empty string.
            self.bump();
            return Ok(String::new());
        }

        let unterminated = LiteralError::UnterminatedString {
            offset: start,
            triple,
        };
        let mut out = String::new();
        loop {
            let c = self.bump().ok_or_else(|| unterminated.clone())?;
            match c {
                c if c == quote => {
                    if !triple {
                        return Ok(out);
                    }
                    if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                        self.pos += 2 * quote.len_utf8();
                        return Ok(out);
                    }
                    out.push(c);
                }
                '\n' if !triple => return Err(unterminated),
                '\\' if raw => {
                    out.push('\\');
                    if let Some(next) = self.bump() {
                        out.push(next);
                    }
                }
                '\\' => self.escape(&mut out)?,
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let c = self.bump().ok_or(LiteralError::UnexpectedEnd)?;
        match c {
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            '0' => out.push('\0'),
            '\n' => {} // line continuation
            'x' => out.push(self.hex_char(2)?),
            'u' => out.push(self.hex_char(4)?),
            'U' => out.push(self.hex_char(8)?),
            other => {
                // Unknown escapes are kept verbatim.
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_char(&mut self, digits: usize) -> Result<char, LiteralError> {
        let start = self.pos;
        for _ in 0..digits {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    self.bump();
                }
                _ => return Err(self.unexpected()),
            }
        }
        let text = &self.src[start..self.pos];
        u32::from_str_radix(text, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| LiteralError::InvalidNumber(text.to_string()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: Value) {
        let text = to_literal(&value);
        let parsed = parse_value(&text).unwrap_or_else(|e| panic!("{text}: {e}"));
        assert_eq!(parsed, value, "literal was {text}");
    }

    // ── Scalars ───────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_keywords() {
        assert_eq!(parse_value("True").unwrap(), Value::Bool(true));
        assert_eq!(parse_value("False").unwrap(), Value::Bool(false));
        assert_eq!(parse_value("None").unwrap(), Value::Null);
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_value("13").unwrap(), Value::Int(13));
        assert_eq!(parse_value("-2").unwrap(), Value::Int(-2));
        assert_eq!(parse_value("1.5").unwrap(), Value::Float(1.5));
        assert_eq!(parse_value("1e-7").unwrap(), Value::Float(1e-7));
        assert_eq!(parse_value("10L").unwrap(), Value::Int(10));
    }

    #[test]
    fn test_parse_bare_word_is_rejected() {
        // Arrange / Act
        let err = parse_value("foo").unwrap_err();

        // Assert
        assert_eq!(err, LiteralError::UnknownName("foo".to_string()));
    }

    #[test]
    fn test_parse_rejects_text_after_value() {
        let err = parse_value("'a' b").unwrap_err();
        assert!(matches!(err, LiteralError::TrailingInput(_)));
    }

    #[test]
    fn test_parse_allows_inline_comment() {
        assert_eq!(parse_value("1  # one").unwrap(), Value::Int(1));
    }

    // ── Strings ───────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_string_quotes_and_prefixes() {
        assert_eq!(parse_value("'a'").unwrap(), Value::from("a"));
        assert_eq!(parse_value("\"a\"").unwrap(), Value::from("a"));
        assert_eq!(parse_value("u'\\xe4'").unwrap(), Value::from("ä"));
        assert_eq!(parse_value("r'a\\n'").unwrap(), Value::from("a\\n"));
        assert_eq!(parse_value("''").unwrap(), Value::from(""));
    }

    #[test]
    fn test_parse_triple_quoted_string_spans_lines() {
        let text = "'''first\nsecond ' \"\"\" '''";
        assert_eq!(
            parse_value(text).unwrap(),
            Value::from("first\nsecond ' \"\"\" ")
        );
    }

    #[test]
    fn test_unterminated_triple_quote_is_reported_as_open() {
        let err = parse_value("'''first line").unwrap_err();
        assert!(err.is_open_triple_quote());
        let err = parse_value("'single").unwrap_err();
        assert!(!err.is_open_triple_quote());
    }

    #[test]
    fn test_to_literal_prefers_single_quotes() {
        assert_eq!(to_literal(&Value::from("new value")), "'new value'");
        assert_eq!(to_literal(&Value::from("it's")), "\"it's\"");
        assert_eq!(to_literal(&Value::from("'\"")), "'\\'\"'");
    }

    #[test]
    fn test_to_literal_keeps_non_ascii_and_escapes_newlines() {
        assert_eq!(to_literal(&Value::from("ä\nb")), "'ä\\nb'");
    }

    #[test]
    fn test_multiline_string_with_all_quote_styles_round_trips() {
        round_trip(Value::from(
            "Multi line string\nwith non-ascii chars \u{e4}\nand quotes \"foo\" 'bar'\nand even triple quotes \"\"\" '''\n",
        ));
    }

    // ── Containers ────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_containers() {
        assert_eq!(
            parse_value("[1, 'string', u'\\xe4',]").unwrap(),
            Value::List(vec![Value::Int(1), Value::from("string"), Value::from("ä")])
        );
        assert_eq!(parse_value("(1)").unwrap(), Value::Int(1));
        assert_eq!(parse_value("(1,)").unwrap(), Value::Tuple(vec![Value::Int(1)]));
        assert_eq!(parse_value("()").unwrap(), Value::Tuple(Vec::new()));
        assert_eq!(
            parse_value("{'b': 2, 'a': [1]}").unwrap(),
            [("a", Value::from(vec![1])), ("b", Value::Int(2))]
                .into_iter()
                .collect::<Value>()
        );
    }

    #[test]
    fn test_mapping_with_non_string_key_is_rejected() {
        let err = parse_value("{1: 2}").unwrap_err();
        assert_eq!(err, LiteralError::NonStringKey("int"));
    }

    #[test]
    fn test_container_literals_round_trip() {
        round_trip(Value::Tuple(vec![Value::Int(1), Value::from("x")]));
        round_trip(Value::Tuple(vec![Value::Null]));
        round_trip(Value::List(vec![Value::Float(2.4), Value::Bool(false)]));
        round_trip([("a", 1), ("b", 2), ("c", 3)].into_iter().collect());
    }

    #[test]
    fn test_float_literal_keeps_fraction_marker() {
        assert_eq!(to_literal(&Value::Float(1.0)), "1.0");
        assert_eq!(to_literal(&Value::Float(2.4)), "2.4");
        round_trip(Value::Float(f64::NEG_INFINITY));
    }

    #[test]
    fn test_control_characters_are_escaped() {
        assert_eq!(to_literal(&Value::from("a\u{1}")), "'a\\x01'");
        round_trip(Value::from("tab\tbell\u{7}"));
    }
}
