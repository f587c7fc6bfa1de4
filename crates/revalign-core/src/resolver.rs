//! Alignment resolution: from a teacher-flagged span in the original essay to
//! the tokens, edit type and effort of the student's revision.
//!
//! Resolution runs in five steps over the alignment edges:
//!
//! 1. Direct correspondence. Edges whose original id is in the span yield
//!    their revised id. Pure deletions leave a marker anchored at the last
//!    `identical` revised token seen before them.
//! 2. Insertion capture. Pure insertions whose revised index lies within
//!    `window` of the corresponding span also belong to the revision.
//! 3. Orphan deletion repair. A span that was only deleted maps to the
//!    identical tokens bounding the deleted run.
//! 4. Summarization of all collected edit types into one [`RevisionKind`].
//! 5. Effort: mean edit cost, rounded half to even.

use std::collections::HashSet;

use tracing::trace;

use crate::domain::{AlignmentEdge, EditType, Result, RevalignError, RevisionKind, RevisionResult, TokenId};

/// Insertions this many positions beyond the corresponding span are captured.
pub const DEFAULT_INSERTION_WINDOW: u32 = 1;

/// An `identical` edge's revised token, usable as a deletion anchor.
#[derive(Debug, Clone)]
struct Anchor {
    /// Position of the edge in alignment order.
    position: usize,
    id: TokenId,
}

/// Resolve `targets` against the alignment graph.
///
/// An empty span is a data integrity problem and fails with
/// [`RevalignError::EmptySpan`]. A span that no edge touches is not an
/// error: the result is empty and [`RevisionResult::is_untraceable`] holds.
pub fn resolve(edges: &[AlignmentEdge], targets: &[TokenId], window: u32) -> Result<RevisionResult> {
    if targets.is_empty() {
        return Err(RevalignError::EmptySpan);
    }
    let span: HashSet<&TokenId> = targets.iter().collect();

    let mut revised = RevisedTokens::default();
    let mut edits: Vec<EditType> = Vec::new();
    let mut anchors: Vec<Anchor> = Vec::new();
    // Anchor preceding the first deletion, and position of the last deletion
    let mut deleted_run: Option<(Anchor, usize)> = None;

    // Step 1
    for (position, edge) in edges.iter().enumerate() {
        let Some(original) = &edge.original else {
            continue;
        };
        if span.contains(original) {
            match &edge.revised {
                Some(id) => revised.push(id.clone()),
                None => {
                    if let Some(anchor) = anchors.last() {
                        let before = match deleted_run.take() {
                            Some((before, _)) => before,
                            None => anchor.clone(),
                        };
                        deleted_run = Some((before, position));
                    }
                }
            }
            edits.push(edge.edit);
        }
        if edge.edit == EditType::Identical {
            if let Some(id) = &edge.revised {
                anchors.push(Anchor {
                    position,
                    id: id.clone(),
                });
            }
        }
    }

    // Step 2
    if let Some((low, high)) = revised.index_bounds() {
        let low = low.saturating_sub(window);
        let high = high.saturating_add(window);
        for edge in edges.iter().filter(|e| e.is_insertion()) {
            let Some(id) = &edge.revised else { continue };
            if id.index().is_some_and(|i| (low..=high).contains(&i)) {
                trace!(token = %id, "insertion captured next to revised span");
                revised.push(id.clone());
                edits.push(edge.edit);
            }
        }
    }

    // Step 3
    if revised.is_empty() {
        if let Some((before, last_deleted)) = deleted_run {
            revised.push(before.id);
            if let Some(after) = anchors.iter().find(|a| a.position > last_deleted) {
                revised.push(after.id.clone());
            }
        }
    }

    Ok(RevisionResult {
        kind: summarize(&edits),
        effort: effort(&edits),
        edges_touched: edits.len(),
        revised_tokens: revised.into_vec(),
    })
}

/// Collapse the collected edit types into one label.
///
/// `identical` is dropped whenever anything else was collected; two or more
/// remaining types are `multiple`. Identical-only (or nothing) is `None`:
/// no actionable revision.
pub fn summarize(edits: &[EditType]) -> Option<RevisionKind> {
    let mut distinct: Vec<EditType> = Vec::new();
    for &edit in edits {
        if edit != EditType::Identical && !distinct.contains(&edit) {
            distinct.push(edit);
        }
    }
    match distinct.as_slice() {
        [] => None,
        [single] => RevisionKind::from_edit(*single),
        _ => Some(RevisionKind::Multiple),
    }
}

/// Mean edit cost over the collected edit types, rounded half to even.
///
/// The result is an ordinal 0-3 effort score, not an edit count.
pub fn effort(edits: &[EditType]) -> u8 {
    if edits.is_empty() {
        return 0;
    }
    let total: u32 = edits.iter().map(|e| e.cost()).sum();
    let mean = f64::from(total) / edits.len() as f64;
    mean.round_ties_even() as u8
}

/// Revised ids in first-seen order without duplicates.
#[derive(Debug, Default)]
struct RevisedTokens {
    ids: Vec<TokenId>,
    seen: HashSet<TokenId>,
}

impl RevisedTokens {
    fn push(&mut self, id: TokenId) {
        if self.seen.insert(id.clone()) {
            self.ids.push(id);
        }
    }

    fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn index_bounds(&self) -> Option<(u32, u32)> {
        let mut indices = self.ids.iter().filter_map(TokenId::index);
        let first = indices.next()?;
        Some(indices.fold((first, first), |(lo, hi), i| (lo.min(i), hi.max(i))))
    }

    fn into_vec(self) -> Vec<TokenId> {
        self.ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<TokenId> {
        raw.iter().map(|s| TokenId::from(*s)).collect()
    }

    fn edge(original: Option<&str>, revised: Option<&str>, edit: EditType) -> AlignmentEdge {
        AlignmentEdge::new(original, revised, edit)
    }

    #[test]
    fn empty_span_is_rejected() {
        let edges = vec![edge(Some("w1"), Some("w1"), EditType::Identical)];
        assert!(matches!(
            resolve(&edges, &[], DEFAULT_INSERTION_WINDOW),
            Err(RevalignError::EmptySpan)
        ));
    }

    #[test]
    fn replace_next_to_identical() {
        let edges = vec![
            edge(Some("w5"), Some("w5"), EditType::Identical),
            edge(Some("w6"), Some("w7"), EditType::Replace),
        ];
        let result = resolve(&edges, &ids(&["w5", "w6"]), DEFAULT_INSERTION_WINDOW).unwrap();
        assert_eq!(result.revised_tokens, ids(&["w5", "w7"]));
        assert_eq!(result.kind, Some(RevisionKind::Replace));
        // (0 + 3) / 2 = 1.5 rounds to 2
        assert_eq!(result.effort, 2);
        assert_eq!(result.edges_touched, 2);
    }

    #[test]
    fn orphan_deletion_maps_to_bounding_identicals() {
        let edges = vec![
            edge(Some("w8"), Some("w8"), EditType::Identical),
            edge(Some("w9"), Some("w9"), EditType::Identical),
            edge(Some("w10"), None, EditType::Delete),
            edge(Some("w11"), Some("w10"), EditType::Identical),
            edge(Some("w12"), Some("w11"), EditType::Identical),
        ];
        let result = resolve(&edges, &ids(&["w10"]), DEFAULT_INSERTION_WINDOW).unwrap();
        assert_eq!(result.revised_tokens, ids(&["w9", "w10"]));
        assert_eq!(result.kind, Some(RevisionKind::Delete));
        assert_eq!(result.effort, 1);
    }

    #[test]
    fn pure_deletion_takes_neighbouring_identicals() {
        let edges = vec![
            edge(Some("w9"), Some("w9"), EditType::Identical),
            edge(Some("w10"), None, EditType::Delete),
            edge(Some("w11"), Some("w11"), EditType::Identical),
        ];
        let result = resolve(&edges, &ids(&["w10"]), DEFAULT_INSERTION_WINDOW).unwrap();
        assert_eq!(result.revised_tokens, ids(&["w9", "w11"]));
        assert_eq!(result.kind, Some(RevisionKind::Delete));
        assert_eq!(result.effort, 1);
    }

    #[test]
    fn deleted_run_is_bounded_by_outer_identicals() {
        let edges = vec![
            edge(Some("w3"), Some("w3"), EditType::Identical),
            edge(Some("w4"), None, EditType::Delete),
            edge(Some("w5"), None, EditType::Delete),
            edge(Some("w6"), Some("w4"), EditType::Identical),
            edge(Some("w7"), Some("w5"), EditType::Identical),
        ];
        let result = resolve(&edges, &ids(&["w4", "w5"]), DEFAULT_INSERTION_WINDOW).unwrap();
        assert_eq!(result.revised_tokens, ids(&["w3", "w4"]));
        assert_eq!(result.kind, Some(RevisionKind::Delete));
    }

    #[test]
    fn deletion_without_preceding_anchor_leaves_nothing() {
        let edges = vec![
            edge(Some("w1"), None, EditType::Delete),
            edge(Some("w2"), Some("w1"), EditType::Identical),
        ];
        let result = resolve(&edges, &ids(&["w1"]), DEFAULT_INSERTION_WINDOW).unwrap();
        assert!(result.revised_tokens.is_empty());
        assert_eq!(result.kind, Some(RevisionKind::Delete));
        assert!(!result.is_untraceable());
    }

    #[test]
    fn insertions_within_window_are_captured() {
        let edges = vec![
            edge(Some("w3"), Some("w3"), EditType::Replace),
            edge(None, Some("w4"), EditType::Insert),
            edge(None, Some("w5"), EditType::Insert),
            edge(Some("w4"), Some("w6"), EditType::Identical),
        ];
        let result = resolve(&edges, &ids(&["w3"]), DEFAULT_INSERTION_WINDOW).unwrap();
        assert_eq!(result.revised_tokens, ids(&["w3", "w4"]));
        assert_eq!(result.kind, Some(RevisionKind::Multiple));
        assert_eq!(result.effort, 3);

        let wide = resolve(&edges, &ids(&["w3"]), 2).unwrap();
        assert_eq!(wide.revised_tokens, ids(&["w3", "w4", "w5"]));
    }

    #[test]
    fn identical_only_span_is_not_actionable() {
        let edges = vec![
            edge(Some("w1"), Some("w1"), EditType::Identical),
            edge(Some("w2"), Some("w2"), EditType::Identical),
            edge(Some("w3"), Some("w4"), EditType::Replace),
        ];
        let result = resolve(&edges, &ids(&["w1", "w2"]), 0).unwrap();
        assert_eq!(result.kind, None);
        assert_eq!(result.effort, 0);
        assert_eq!(result.revised_tokens, ids(&["w1", "w2"]));
    }

    #[test]
    fn untouched_span_is_untraceable() {
        let edges = vec![edge(Some("w1"), Some("w1"), EditType::Identical)];
        let result = resolve(&edges, &ids(&["w40"]), DEFAULT_INSERTION_WINDOW).unwrap();
        assert!(result.is_untraceable());
        assert_eq!(result.kind, None);
        assert_eq!(result.effort, 0);
    }

    #[test]
    fn summarize_collapses_mixed_types() {
        use EditType::*;
        assert_eq!(summarize(&[Identical, Shift]), Some(RevisionKind::Shift));
        assert_eq!(summarize(&[Shift, Shift]), Some(RevisionKind::Shift));
        assert_eq!(summarize(&[Identical, Delete, Insert]), Some(RevisionKind::Multiple));
        assert_eq!(summarize(&[Identical]), None);
        assert_eq!(summarize(&[]), None);
    }

    #[test]
    fn effort_rounds_half_to_even() {
        use EditType::*;
        assert_eq!(effort(&[]), 0);
        assert_eq!(effort(&[Delete, Insert]), 2);
        // 5 / 2 = 2.5 rounds to 2
        assert_eq!(effort(&[Shift, Replace]), 2);
        assert_eq!(effort(&[Replace, Insert, Identical]), 2);
        assert_eq!(effort(&[Replace]), 3);
    }
}
