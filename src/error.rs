//! Error types shared across the parser, renderer and transcluder.
//!
//! The parser raises two distinct failure kinds internally (see
//! [`crate::parser`]): a recoverable [`ParseError`] and a separate EOF
//! signal that some callers treat as ordinary termination. Only the former
//! ever escapes the parser as a public error; callers that need "did parsing
//! actually consume the whole input" semantics get that from the return type
//! of the entry point they used, not from a variant here.

use std::fmt;

/// The standard result type used by fallible operations in this crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// A parser error: a structural mismatch encountered at a speculation point
/// that was not recovered.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseError {
    /// The file name the parser was given, if any.
    pub file: String,
    /// 1-indexed line number.
    pub line: usize,
    /// 1-indexed column number.
    pub column: usize,
    /// A short prefix of the remaining input, for diagnostics.
    pub peek: String,
    /// A human-readable description of what was expected.
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}:{}]: {} (near {:?})",
            self.file, self.line, self.column, self.message, self.peek
        )
    }
}

impl std::error::Error for ParseError {}

/// A `#REDIRECT` (or `#WEITERLEITUNG`) directive found while parsing a page.
///
/// This is not an error. It is surfaced as a distinct outcome from
/// [`crate::parser::parse_page`] because a redirect page has no body worth
/// parsing any further than its target link.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Redirect {
    /// The title of the page this page redirects to.
    pub target: String,
}

/// An article rendering / transclusion error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Wraps a parser failure encountered while re-entering the parser on
    /// freshly fetched template source.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The remote MediaWiki API returned `{"error": {"info": ...}}`.
    #[error("mediawiki api error: {info}")]
    Api {
        /// The `info` field of the API error object.
        info: String,
    },

    /// The requested page had no revision content.
    #[error("page not found: {title}")]
    PageNotFound {
        /// The title that was requested.
        title: String,
    },

    /// Recursive template expansion exceeded the configured maximum depth.
    #[error("transclusion depth exceeded (limit {limit})")]
    TransclusionDepthExceeded {
        /// The configured limit that was exceeded.
        limit: usize,
    },

    /// `#invoke:` was used with no Lua-execution collaborator configured, or
    /// a renderer lacks a dispatch entry for a node kind it was asked to
    /// render.
    #[error("not implemented: {what}")]
    NotImplemented {
        /// What wasn't implemented.
        what: String,
    },

    /// The HTTP transport failed.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The API response body was not valid, or not shaped as expected.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
