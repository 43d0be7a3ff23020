//! Uniform view over a character string or a sequence of tokens.
//!
//! Positions are non-negative integer offsets into whichever sequence is
//! active: byte offsets (char-boundary aligned) for text inputs, token
//! indices for token inputs. The input is immutable during a parse.

use crate::Tok;
use std::sync::Arc;

/// The input a parse runs against.
#[derive(Debug, Clone)]
pub enum Input {
    /// A character sequence; positions are byte offsets.
    Text {
        /// The source text.
        src: Arc<str>,
    },
    /// An ordered token sequence; positions are token indices. Each token
    /// carries `start`/`end` offsets into an optional underlying string.
    Tokens {
        /// The token sequence.
        toks: Arc<[Tok]>,
        /// The original source the token offsets refer to, when available.
        src: Option<Arc<str>>,
    },
}

impl Input {
    /// Build a text input.
    pub fn text(src: impl Into<Arc<str>>) -> Self {
        Input::Text { src: src.into() }
    }

    /// Build a token-sequence input.
    pub fn tokens(toks: impl Into<Arc<[Tok]>>, src: Option<Arc<str>>) -> Self {
        Input::Tokens { toks: toks.into(), src }
    }

    /// Number of positions: bytes for text, tokens for token input.
    pub fn len(&self) -> usize {
        match self {
            Input::Text { src } => src.len(),
            Input::Tokens { toks, .. } => toks.len(),
        }
    }

    /// Whether the input is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `pos` is at or past the end of the input.
    pub fn is_end(&self, pos: usize) -> bool {
        pos >= self.len()
    }

    /// The character at `pos` for text inputs.
    ///
    /// Returns `None` at end of input, for token inputs, and when `pos`
    /// is not on a char boundary.
    pub fn char_at(&self, pos: usize) -> Option<char> {
        match self {
            Input::Text { src } => src.get(pos..).and_then(|s| s.chars().next()),
            Input::Tokens { .. } => None,
        }
    }

    /// The token at `pos` for token inputs.
    pub fn tok_at(&self, pos: usize) -> Option<&Tok> {
        match self {
            Input::Text { .. } => None,
            Input::Tokens { toks, .. } => toks.get(pos),
        }
    }

    /// The kind of the token at `pos`, for token inputs.
    pub fn kind_at(&self, pos: usize) -> Option<u32> {
        self.tok_at(pos).map(|t| t.kind)
    }

    /// Whether the text input matches `literal` starting at `pos`.
    ///
    /// Always `false` on token inputs; literal matching there goes through
    /// token text instead (see [`Input::tok_text_at`]).
    pub fn starts_with(&self, pos: usize, literal: &str) -> bool {
        match self {
            Input::Text { src } => src.get(pos..).is_some_and(|s| s.starts_with(literal)),
            Input::Tokens { .. } => false,
        }
    }

    /// The text of the token at `pos`, for token inputs.
    pub fn tok_text_at(&self, pos: usize) -> Option<&str> {
        self.tok_at(pos).map(|t| t.text.as_ref())
    }

    /// The source text covered by the position range `start..end`.
    ///
    /// For text inputs this is a direct slice. For token inputs it maps the
    /// token range back through the tokens' source offsets, when an
    /// underlying source is attached. Returns `None` when the range cannot
    /// be reconstructed.
    pub fn text_span(&self, start: usize, end: usize) -> Option<&str> {
        match self {
            Input::Text { src } => src.get(start..end),
            Input::Tokens { toks, src } => {
                let src = src.as_ref()?;
                if start >= end {
                    return Some("");
                }
                let first = toks.get(start)?;
                let last = toks.get(end - 1)?;
                src.get(first.start..last.end)
            }
        }
    }

    /// Width of one element at `pos`: the UTF-8 length of the char for text
    /// inputs, `1` for token inputs. `None` at end of input.
    pub fn element_width(&self, pos: usize) -> Option<usize> {
        match self {
            Input::Text { .. } => self.char_at(pos).map(char::len_utf8),
            Input::Tokens { toks, .. } => (pos < toks.len()).then_some(1),
        }
    }
}

impl From<&str> for Input {
    fn from(src: &str) -> Self {
        Input::text(src)
    }
}

impl From<String> for Input {
    fn from(src: String) -> Self {
        Input::text(src)
    }
}
