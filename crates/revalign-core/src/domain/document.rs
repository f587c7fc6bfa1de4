//! Token stream of one TEI document, grouped by sentence.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Word identifier as written in `xml:id`, e.g. `w12`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric suffix of the identifier (`w12` -> 12).
    ///
    /// Returns `None` when the identifier does not end in digits.
    pub fn index(&self) -> Option<u32> {
        let digits_at = self
            .0
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i)?;
        self.0[digits_at..].parse().ok()
    }

    /// Identifier with the same prefix and a different numeric suffix.
    pub fn with_index(&self, index: u32) -> Self {
        let prefix = self.0.trim_end_matches(|c: char| c.is_ascii_digit());
        Self(format!("{prefix}{index}"))
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TokenId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A word element: identifier, literal text, and the sentence it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub id: TokenId,
    pub text: String,
    pub sentence: usize,
}

/// An ordered run of tokens at a fixed position in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub index: usize,
    pub tokens: Vec<Token>,
}

/// A loaded student essay. Read-only after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    source: PathBuf,
    sentences: Vec<Sentence>,
}

impl Document {
    pub fn new(source: impl Into<PathBuf>, sentences: Vec<Sentence>) -> Self {
        Self {
            source: source.into(),
            sentences,
        }
    }

    /// Build a document from plain `(id, text)` sentences. Used by tests and
    /// by callers that already hold a tokenized essay.
    pub fn from_sentences<'a, S>(source: impl Into<PathBuf>, sentences: S) -> Self
    where
        S: IntoIterator<Item = Vec<(&'a str, &'a str)>>,
    {
        let sentences = sentences
            .into_iter()
            .enumerate()
            .map(|(index, words)| Sentence {
                index,
                tokens: words
                    .into_iter()
                    .map(|(id, text)| Token {
                        id: TokenId::new(id),
                        text: text.to_string(),
                        sentence: index,
                    })
                    .collect(),
            })
            .collect();
        Self::new(source, sentences)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.sentences.iter().flat_map(|s| s.tokens.iter())
    }

    pub fn token_count(&self) -> usize {
        self.sentences.iter().map(|s| s.tokens.len()).sum()
    }
}
