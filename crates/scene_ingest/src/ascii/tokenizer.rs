//! Whitespace/semicolon tokenizer for ASCII scene text.
//!
//! [`Tokenizer`] is a lazy iterator over borrowed [`Token`]s. A run of
//! non-whitespace, non-semicolon characters is one [`TokenKind::Word`]; every
//! `;` is its own [`TokenKind::Semicolon`], even in the middle of a run.
//! Whitespace only separates. There is no error path: any input tokenizes.

/// Kind of a token produced by [`Tokenizer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Word,
    Semicolon,
}

/// A single token borrowed from the source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    /// Token text. Always `";"` for [`TokenKind::Semicolon`].
    pub text: &'a str,
    pub kind: TokenKind,
}

impl<'a> Token<'a> {
    #[inline]
    pub fn word(text: &'a str) -> Self {
        Self {
            text,
            kind: TokenKind::Word,
        }
    }

    #[inline]
    pub fn semicolon() -> Self {
        Self {
            text: ";",
            kind: TokenKind::Semicolon,
        }
    }

    #[inline]
    pub fn is_semicolon(&self) -> bool {
        self.kind == TokenKind::Semicolon
    }
}

/// Lazy, single-pass tokenizer over scene text.
#[derive(Clone, Debug)]
pub struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let rest = &self.src[self.pos..];
        let mut start = None;

        for (i, c) in rest.char_indices() {
            if c == ';' {
                if let Some(s) = start {
                    // Flush the pending word; the semicolon is picked up next call.
                    self.pos += i;
                    return Some(Token::word(&rest[s..i]));
                }
                self.pos += i + 1;
                return Some(Token::semicolon());
            }
            if c.is_whitespace() {
                if let Some(s) = start {
                    self.pos += i + c.len_utf8();
                    return Some(Token::word(&rest[s..i]));
                }
            } else if start.is_none() {
                start = Some(i);
            }
        }

        self.pos = self.src.len();
        start.map(|s| Token::word(&rest[s..]))
    }
}

impl std::iter::FusedIterator for Tokenizer<'_> {}

/// Convenience constructor for [`Tokenizer`].
pub fn tokenize(src: &str) -> Tokenizer<'_> {
    Tokenizer::new(src)
}
