//! Character-level source cursor with speculative backtracking.
//!
//! Grounded in `examples/original_source/wikiparse/source_reader.py`'s
//! `SourceReader`/`SourceConsumer` pair, but expressed as a cheap `Copy`
//! value (mirroring the clone-and-`update`-on-success pattern used by
//! `examples/csnover-wiki.rs/src/wikitext/parser.rs`) rather than a `with`
//! resource, per the REDESIGN FLAGS in the design document.

use crate::error::ParseError;

/// Internal parser failure: either a recoverable structural mismatch, or
/// "input exhausted where content was required".
///
/// This is distinct from [`crate::Error`]: `Eof` is sometimes a normal
/// termination condition (see [`Cursor::consume_until`] and
/// `parse_text`'s `eof_fails` parameter) and must never be allowed to
/// escape the parser as a public error variant.
#[derive(Clone, Debug)]
pub(crate) enum Failure {
    Parse(ParseError),
    Eof,
}

pub(crate) type PResult<T> = Result<T, Failure>;

impl Failure {
    pub(crate) fn is_eof(&self) -> bool {
        matches!(self, Failure::Eof)
    }
}

impl From<ParseError> for Failure {
    fn from(err: ParseError) -> Self {
        Failure::Parse(err)
    }
}

/// An immutable source buffer plus a mutable, cheaply-copyable cursor
/// position.
///
/// Speculation is a plain value copy: take `let snap = *cursor;` before
/// trying something, and `*cursor = snap;` to roll back. [`Cursor::try_parse`]
/// packages that pattern up so a parser production can never accidentally
/// advance the caller's cursor on failure, nor leave the caller's cursor
/// unsynced on success.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Cursor<'a> {
    source: &'a str,
    file: &'a str,
    offset: usize,
    line: usize,
    column: usize,
    is_line_start: bool,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(source: &'a str, file: &'a str) -> Self {
        Self {
            source,
            file,
            offset: 0,
            line: 1,
            column: 0,
            is_line_start: true,
        }
    }

    /// Byte length of the remaining, unconsumed input.
    pub(crate) fn len(&self) -> usize {
        self.source.len() - self.offset
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.offset >= self.source.len()
    }

    pub(crate) fn is_line_start(&self) -> bool {
        self.is_line_start
    }

    pub(crate) fn rest(&self) -> &'a str {
        &self.source[self.offset..]
    }

    fn make_err(&self, message: impl Into<String>) -> ParseError {
        let peek: String = self.rest().chars().take(24).collect();
        ParseError {
            file: self.file.to_string(),
            line: self.line,
            column: self.column,
            peek,
            message: message.into(),
        }
    }

    pub(crate) fn err<T>(&self, message: impl Into<String>) -> PResult<T> {
        Err(Failure::Parse(self.make_err(message)))
    }

    /// Advances past a single character, updating line/column/`is_line_start`
    /// bookkeeping. Fails with [`Failure::Eof`] at the end of input.
    pub(crate) fn next_char(&mut self) -> PResult<char> {
        let c = self.rest().chars().next().ok_or(Failure::Eof)?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 0;
            self.is_line_start = true;
        } else {
            self.column += 1;
        }
        self.is_line_start = self.is_line_start && c.is_whitespace();
        Ok(c)
    }

    /// Advances past `n` characters.
    pub(crate) fn skip(&mut self, n: usize) -> PResult<()> {
        for _ in 0..n {
            self.next_char()?;
        }
        Ok(())
    }

    /// Returns the next character without consuming it.
    pub(crate) fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Returns the next `n` characters as a string, or the short prefix if
    /// fewer remain and `eof_ok` is set.
    pub(crate) fn peek(&self, n: usize, eof_ok: bool) -> PResult<String> {
        let taken: String = self.rest().chars().take(n).collect();
        if taken.chars().count() < n && !eof_ok {
            return Err(Failure::Eof);
        }
        Ok(taken)
    }

    /// Tests whether the cursor is positioned at `s`.
    pub(crate) fn peek_str(&self, s: &str, case_sensitive: bool, eof_ok: bool) -> PResult<bool> {
        let n = s.chars().count();
        let peeked = self.peek(n, eof_ok)?;
        if case_sensitive {
            Ok(peeked == s)
        } else {
            Ok(peeked.eq_ignore_ascii_case(s))
        }
    }

    /// Consumes `s` iff the cursor is positioned at it. `eof_ok` controls
    /// whether running out of input while checking is an [`Failure::Eof`]
    /// failure or simply "did not match".
    pub(crate) fn consume(
        &mut self,
        s: &str,
        case_sensitive: bool,
        eof_ok: bool,
    ) -> PResult<bool> {
        match self.peek_str(s, case_sensitive, true) {
            Ok(true) => {
                self.skip(s.chars().count())?;
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(Failure::Eof) if eof_ok => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Like [`Cursor::consume`] but with `case_sensitive = true, eof_ok = true`,
    /// the overwhelmingly common case in the grammar.
    pub(crate) fn eat(&mut self, s: &str) -> bool {
        self.consume(s, true, true).unwrap_or(false)
    }

    /// Consumes characters until `is_terminated` returns true on a snapshot
    /// of the cursor, returning the consumed text. Fails with
    /// [`Failure::Eof`] if the input is exhausted first and `eof_ok` is
    /// false.
    pub(crate) fn consume_until(
        &mut self,
        eof_ok: bool,
        mut is_terminated: impl FnMut(&Cursor<'a>) -> bool,
    ) -> PResult<String> {
        let mut out = String::new();
        while !self.is_empty() && !is_terminated(self) {
            out.push(self.next_char()?);
        }
        if self.is_empty() && !is_terminated(self) && !eof_ok {
            return Err(Failure::Eof);
        }
        Ok(out)
    }

    /// Runs `f` on a private copy of this cursor. On success, commits the
    /// child's position back to `self`. On failure, `self` is left
    /// untouched — the child copy is simply dropped.
    pub(crate) fn try_parse<T>(
        &mut self,
        f: impl FnOnce(&mut Cursor<'a>) -> PResult<T>,
    ) -> PResult<T> {
        let mut child = *self;
        let result = f(&mut child);
        if result.is_ok() {
            *self = child;
        }
        result
    }
}
