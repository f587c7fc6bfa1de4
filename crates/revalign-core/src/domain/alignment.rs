//! Alignment edges between original and revised tokens, and the summarized
//! revision they resolve to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::document::TokenId;
use super::error::{Result, RevalignError};

/// Edit type tagged on one alignment link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditType {
    Identical,
    Delete,
    Insert,
    Replace,
    Shift,
}

impl EditType {
    /// Productive effort a student spends on this kind of edit.
    pub fn cost(self) -> u32 {
        match self {
            Self::Identical => 0,
            Self::Delete => 1,
            Self::Shift => 2,
            Self::Insert | Self::Replace => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identical => "identical",
            Self::Delete => "delete",
            Self::Insert => "insert",
            Self::Replace => "replace",
            Self::Shift => "shift",
        }
    }
}

impl fmt::Display for EditType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for link types outside the five edit types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown edit type: {0}")]
pub struct UnknownEditType(pub String);

impl FromStr for EditType {
    type Err = UnknownEditType;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "identical" => Ok(Self::Identical),
            "delete" => Ok(Self::Delete),
            "insert" => Ok(Self::Insert),
            "replace" => Ok(Self::Replace),
            "shift" => Ok(Self::Shift),
            other => Err(UnknownEditType(other.to_string())),
        }
    }
}

/// One link of the token alignment graph.
///
/// No original id means a pure insertion; no revised id means a pure deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentEdge {
    pub original: Option<TokenId>,
    pub revised: Option<TokenId>,
    pub edit: EditType,
}

impl AlignmentEdge {
    pub fn new(original: Option<&str>, revised: Option<&str>, edit: EditType) -> Self {
        Self {
            original: original.map(TokenId::from),
            revised: revised.map(TokenId::from),
            edit,
        }
    }

    pub fn is_insertion(&self) -> bool {
        self.original.is_none() && self.revised.is_some()
    }
}

/// Single label summarizing every edit touching an error span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionKind {
    Delete,
    Insert,
    Replace,
    Shift,
    Multiple,
}

impl RevisionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Insert => "insert",
            Self::Replace => "replace",
            Self::Shift => "shift",
            Self::Multiple => "multiple",
        }
    }

    /// Non-identical edit types map one to one; `identical` has no kind.
    pub fn from_edit(edit: EditType) -> Option<Self> {
        match edit {
            EditType::Identical => None,
            EditType::Delete => Some(Self::Delete),
            EditType::Insert => Some(Self::Insert),
            EditType::Replace => Some(Self::Replace),
            EditType::Shift => Some(Self::Shift),
        }
    }
}

impl fmt::Display for RevisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving one error span against the alignment graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionResult {
    /// `None` when every collected edit was `identical` or nothing matched.
    pub kind: Option<RevisionKind>,
    /// Coarse 0-3 revision effort.
    pub effort: u8,
    /// Revised token ids, deduplicated, in first-seen order.
    pub revised_tokens: Vec<TokenId>,
    /// Number of alignment edges that contributed an edit type.
    pub edges_touched: usize,
}

impl RevisionResult {
    /// True when no alignment edge connected the span to the revision.
    pub fn is_untraceable(&self) -> bool {
        self.edges_touched == 0 && self.revised_tokens.is_empty()
    }

    /// Turn an untraceable result into the soft `UnresolvedRevision` error.
    pub fn into_traceable(self, span: &[TokenId]) -> Result<Self> {
        if self.is_untraceable() {
            return Err(RevalignError::UnresolvedRevision {
                span: join_ids(span),
            });
        }
        Ok(self)
    }
}

/// Comma-joined identifiers, the form used in output records.
pub fn join_ids(ids: &[TokenId]) -> String {
    ids.iter()
        .map(TokenId::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
