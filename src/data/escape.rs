//! List-literal codec used inside checkpoint CSV fields.
//!
//! Fragment lists are written as `['first', 'it''s second', nan]`: each fragment
//! is single-quoted with embedded `'` doubled, and `nan` marks a missing
//! fragment. Double quotes are rewritten to `'` before doubling so the enclosing
//! CSV field never contains its own delimiter; that rewrite is lossy by design
//! of the format. Vectors are written as `[0.5, -0.25]`.

use thiserror::Error;

/// Literal used for a fragment without text.
pub const MISSING: &str = "nan";

/// Decoding failure with the byte offset where parsing stopped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListError {
    #[error("expected '{expected}' at offset {offset}")]
    Expected { expected: char, offset: usize },
    #[error("unterminated string starting at offset {offset}")]
    Unterminated { offset: usize },
    #[error("unexpected input at offset {offset}")]
    Unexpected { offset: usize },
    #[error("invalid number {value:?}")]
    Number { value: String },
}

/// Escape one fragment body (without the surrounding quotes).
pub fn escape_fragment(text: &str) -> String {
    text.replace('"', "'").replace('\'', "''")
}

/// Reverse [`escape_fragment`] for the `'` doubling; `"` rewrites are not undone.
pub fn unescape_fragment(text: &str) -> String {
    text.replace("''", "'")
}

pub fn encode_fragments(fragments: &[Option<String>]) -> String {
    let items: Vec<String> = fragments
        .iter()
        .map(|fragment| match fragment {
            Some(text) => format!("'{}'", escape_fragment(text)),
            None => MISSING.to_string(),
        })
        .collect();
    format!("[{}]", items.join(", "))
}

pub fn decode_fragments(input: &str) -> Result<Vec<Option<String>>, ListError> {
    let mut cursor = Cursor::new(input);
    cursor.skip_whitespace();
    cursor.expect('[')?;
    let mut fragments = Vec::new();
    cursor.skip_whitespace();
    if cursor.eat(']') {
        return cursor.finish(fragments);
    }
    loop {
        cursor.skip_whitespace();
        if cursor.peek() == Some('\'') {
            fragments.push(Some(cursor.quoted()?));
        } else if cursor.rest().starts_with(MISSING) {
            cursor.advance(MISSING.len());
            fragments.push(None);
        } else {
            return Err(ListError::Unexpected { offset: cursor.pos });
        }
        cursor.skip_whitespace();
        if cursor.eat(',') {
            continue;
        }
        cursor.expect(']')?;
        return cursor.finish(fragments);
    }
}

pub fn encode_vector(values: &[f32]) -> String {
    let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", items.join(", "))
}

pub fn decode_vector(input: &str) -> Result<Vec<f32>, ListError> {
    let trimmed = input.trim();
    let inner = trimmed
        .strip_prefix('[')
        .ok_or(ListError::Expected {
            expected: '[',
            offset: 0,
        })?
        .strip_suffix(']')
        .ok_or(ListError::Expected {
            expected: ']',
            offset: trimmed.len(),
        })?;
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|item| {
            let item = item.trim();
            item.parse::<f32>().map_err(|_| ListError::Number {
                value: item.to_string(),
            })
        })
        .collect()
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self, bytes: usize) {
        self.pos += bytes;
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.advance(ch.len_utf8());
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> Result<(), ListError> {
        if self.eat(ch) {
            Ok(())
        } else {
            Err(ListError::Expected {
                expected: ch,
                offset: self.pos,
            })
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.advance(rest.len() - rest.trim_start().len());
    }

    /// Read a single-quoted string and unescape its body.
    fn quoted(&mut self) -> Result<String, ListError> {
        let start = self.pos;
        self.expect('\'')?;
        let body_start = self.pos;
        loop {
            let Some(end) = self.rest().find('\'') else {
                return Err(ListError::Unterminated { offset: start });
            };
            self.advance(end + 1);
            if !self.eat('\'') {
                let body = &self.input[body_start..self.pos - 1];
                return Ok(unescape_fragment(body));
            }
        }
    }

    fn finish<T>(mut self, value: T) -> Result<T, ListError> {
        self.skip_whitespace();
        if self.pos == self.input.len() {
            Ok(value)
        } else {
            Err(ListError::Unexpected { offset: self.pos })
        }
    }
}
