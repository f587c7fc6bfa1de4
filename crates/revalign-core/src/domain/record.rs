//! Output records and their grouping by error category.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::alignment::RevisionKind;

/// Category assigned to notes that carry an open-ended comment and no code.
pub const OPEN_ENDED: &str = "open_ended";

/// One successfully resolved teacher annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub essay_id: String,
    /// Filtered comment text, or the category label for tagged feedback.
    pub comment: String,
    /// Comma-joined original token ids.
    pub target_tokens: String,
    pub revision_type: RevisionKind,
    pub revision_effort: u8,
    pub original_sentence: String,
    pub revised_sentence: String,
    pub original_context: String,
    pub revised_context: String,
}

impl ErrorRecord {
    /// Column order of the CSV output.
    pub const COLUMNS: [&'static str; 9] = [
        "essay_id",
        "comment",
        "target_tokens",
        "revision_type",
        "revision_effort",
        "original_sentence",
        "revised_sentence",
        "original_context",
        "revised_context",
    ];

    pub fn to_row(&self) -> [String; 9] {
        [
            self.essay_id.clone(),
            self.comment.clone(),
            self.target_tokens.clone(),
            self.revision_type.to_string(),
            self.revision_effort.to_string(),
            self.original_sentence.clone(),
            self.revised_sentence.clone(),
            self.original_context.clone(),
            self.revised_context.clone(),
        ]
    }
}

/// Records of one error category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub category: String,
    pub records: Vec<ErrorRecord>,
}

/// Records keyed by error category. Iteration follows the order in which
/// categories were first seen, so flattened output is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryGroups {
    groups: Vec<CategoryGroup>,
    positions: HashMap<String, usize>,
}

impl CategoryGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, category: &str, record: ErrorRecord) {
        match self.positions.get(category) {
            Some(&at) => self.groups[at].records.push(record),
            None => {
                self.positions
                    .insert(category.to_string(), self.groups.len());
                self.groups.push(CategoryGroup {
                    category: category.to_string(),
                    records: vec![record],
                });
            }
        }
    }

    pub fn get(&self, category: &str) -> Option<&[ErrorRecord]> {
        self.positions
            .get(category)
            .map(|&at| self.groups[at].records.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryGroup> {
        self.groups.iter()
    }

    /// All records, category by category.
    pub fn flatten(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.groups.iter().flat_map(|g| g.records.iter())
    }

    pub fn category_count(&self) -> usize {
        self.groups.len()
    }

    pub fn record_count(&self) -> usize {
        self.groups.iter().map(|g| g.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn into_groups(self) -> Vec<CategoryGroup> {
        self.groups
    }
}

impl FromIterator<CategoryGroup> for CategoryGroups {
    fn from_iter<I: IntoIterator<Item = CategoryGroup>>(iter: I) -> Self {
        let mut groups = Self::new();
        for group in iter {
            for record in group.records {
                groups.push(&group.category, record);
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(essay_id: &str) -> ErrorRecord {
        ErrorRecord {
            essay_id: essay_id.to_string(),
            comment: "check the linker".to_string(),
            target_tokens: "w3,w4".to_string(),
            revision_type: RevisionKind::Replace,
            revision_effort: 3,
            original_sentence: "[[However]] it rains .".to_string(),
            revised_sentence: "[[Therefore]] it rains .".to_string(),
            original_context: String::new(),
            revised_context: String::new(),
        }
    }

    #[test]
    fn groups_keep_first_seen_category_order() {
        let mut groups = CategoryGroups::new();
        groups.push("Word order", record("e1"));
        groups.push(OPEN_ENDED, record("e2"));
        groups.push("Word order", record("e3"));

        let order: Vec<_> = groups.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(order, vec!["Word order", OPEN_ENDED]);

        let flat: Vec<_> = groups.flatten().map(|r| r.essay_id.as_str()).collect();
        assert_eq!(flat, vec!["e1", "e3", "e2"]);
        assert_eq!(groups.record_count(), 3);
        assert_eq!(groups.get("Word order").map(<[_]>::len), Some(2));
    }

    #[test]
    fn row_matches_column_order() {
        let row = record("e1").to_row();
        assert_eq!(row.len(), ErrorRecord::COLUMNS.len());
        assert_eq!(row[3], "replace");
        assert_eq!(row[4], "3");
    }

    #[test]
    fn rebuild_from_groups_preserves_order() {
        let mut groups = CategoryGroups::new();
        groups.push("b", record("e1"));
        groups.push("a", record("e2"));
        let rebuilt: CategoryGroups = groups.clone().into_groups().into_iter().collect();
        assert_eq!(rebuilt, groups);
    }
}
