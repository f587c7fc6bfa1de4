//! Teacher notes: what a `<note>` element says and which tokens it flags.

use crate::domain::{Result, RevalignError, TokenId};

/// A `<note>` element from an annotated (`_notes`) essay file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeacherNote {
    /// Open-ended comment text. Tagged notes have none.
    pub text: Option<String>,
    /// Commentbank code, e.g. `cb:011`.
    pub code: Option<String>,
    /// Flagged tokens, e.g. `#w12` or `#range(w29,w32)`.
    pub target: Option<String>,
}

impl TeacherNote {
    pub fn has_comment(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Numeric part of the code with leading zeros removed (`cb:011` -> `11`).
    ///
    /// `None` when the note has no code or the code has no `:` separator.
    pub fn category_code(&self) -> Option<&str> {
        let (_, code) = self.code.as_deref()?.split_once(':')?;
        Some(code.trim_start_matches('0'))
    }

    /// Token ids flagged by this note; `None` when the note has no target.
    ///
    /// Spans of `limit` tokens or more fail with [`RevalignError::SpanTooLong`].
    pub fn target_tokens(&self, limit: usize) -> Result<Option<Vec<TokenId>>> {
        match self.target.as_deref() {
            Some(reference) if !reference.is_empty() => parse_target(reference, limit).map(Some),
            _ => Ok(None),
        }
    }
}

/// Parse a note target into token ids.
///
/// Accepts `#w5`, `w5`, `file.xml#w5` and the range form `#range(w3,w6)`,
/// which expands inclusively. A range of `limit` tokens or more is rejected
/// from its bounds alone, before any id is built.
pub fn parse_target(reference: &str, limit: usize) -> Result<Vec<TokenId>> {
    let reference = reference
        .rsplit_once('#')
        .map_or(reference, |(_, fragment)| fragment)
        .trim();
    let invalid = || RevalignError::InvalidTarget(reference.to_string());

    if reference.is_empty() {
        return Err(invalid());
    }

    let Some(inner) = reference
        .strip_prefix("range(")
        .and_then(|rest| rest.strip_suffix(')'))
    else {
        if reference.contains('(') {
            return Err(invalid());
        }
        check_span_len(1, limit)?;
        return Ok(vec![TokenId::new(reference)]);
    };

    let (first, last) = inner.split_once(',').ok_or_else(invalid)?;
    let first = TokenId::new(first.trim());
    let last = TokenId::new(last.trim());
    let (start, end) = match (first.index(), last.index()) {
        (Some(start), Some(end)) if start <= end => (start, end),
        _ => return Err(invalid()),
    };
    check_span_len(u64::from(end - start) + 1, limit)?;
    Ok((start..=end).map(|i| first.with_index(i)).collect())
}

fn check_span_len(len: u64, limit: usize) -> Result<()> {
    if len >= limit as u64 {
        return Err(RevalignError::SpanTooLong { len, limit });
    }
    Ok(())
}
