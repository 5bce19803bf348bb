//! Parsing and transclusion configuration.
//!
//! WikiText documents are not self-encapsulated: which words introduce a
//! redirect, which bare `__WORD__` tokens are recognized directives, and how
//! deep template recursion may go before it's considered a loop are all
//! installation-specific. Grounded in `CONFIG_SOURCE` /
//! `examples/csnover-wiki.rs/src/config.rs`, scaled down to what this crate's
//! parser and transcluder actually consult (no Lua module registry, no
//! language-variant tables).

/// Default recursion limit for [`crate::transclude::Transcluder`], matching
/// the "recursive template inclusion" MediaWiki default.
pub const DEFAULT_MAX_TRANSCLUSION_DEPTH: usize = 40;

/// Tunables consulted by the parser and the transcluder.
///
/// Construct with [`Configuration::default`] for ordinary English-language
/// MediaWiki installations, or override fields for a wiki with a different
/// redirect keyword or language (e.g. German `#WEITERLEITUNG`).
#[derive(Clone, Debug)]
pub struct Configuration {
    /// Case-insensitive magic words that introduce a redirect, without the
    /// leading `#`. English MediaWiki recognizes `redirect`; some language
    /// variants also recognize a localized word such as `weiterleitung`.
    pub redirect_words: Vec<String>,
    /// Maximum template transclusion recursion depth before
    /// [`crate::Error::TransclusionDepthExceeded`] is raised.
    pub max_transclusion_depth: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            redirect_words: vec!["redirect".to_string(), "weiterleitung".to_string()],
            max_transclusion_depth: DEFAULT_MAX_TRANSCLUSION_DEPTH,
        }
    }
}

impl Configuration {
    /// Case-insensitive match against [`Configuration::redirect_words`].
    pub fn is_redirect_word(&self, word: &str) -> bool {
        self.redirect_words
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(word))
    }
}
