//! Linking-adverbial lexicon (after Liu 2008) and n-gram frequency tables.
//!
//! Used in `LA` scope to keep only feedback about linking adverbials: either
//! the teacher's comment talks about linking, or the student's marked
//! sentence contains a linking expression inside the highlight.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::mark;
use crate::domain::{Result, RevalignError};

/// 50 and more occurrences per million words.
const BAND1: &[&str] = &[
    "again", "also", "of course", "in addition", "too", "for example", "for instance",
    "however", "yet", "nevertheless", "of course", "though", "in fact", "on the other hand",
    "instead", "anyway", "despite",
    "as a result", "so", "therefore", "thus", "otherwise", "then",
    "eventually", "first", "firstly", "finally", "then",
];

/// 10 to 49.99 occurrences per million words.
const BAND2: &[&str] = &[
    "above all", "as I say", "as they say", "as you say", "besides", "furthermore",
    "moreover", "in other words", "namely", "alternatively", "likewise", "similarly",
    "at the same time", "nonetheless", "actually", "in comparison", "by comparison",
    "in contrast", "by contrast", "in reality", "rather", "after all", "all the same",
    "in any case", "in spite of this", "in spite of that",
    "accordingly", "consequently", "hence", "naturally",
    "afterwards", "first of all", "in the first place", "second", "secondly", "third",
    "thirdly", "at the same time", "in the meantime", "meanwhile", "in short",
];

/// Under 10 occurrences per million words.
const BAND3: &[&str] = &[
    "additionally", "as a matter of fact", "as well", "further", "to crown it all",
    "not to mention", "to cap it all", "what’s more", "what is more", "i.e.", "that is",
    "that is to say", "for one thing", "to put it another way", "to put it bluntly",
    "to put it mildly", "what I’m saying is", "what I mean is", "which is to say",
    "by the same token", "correspondingly",
    "then again", "as a matter of fact", "conversely", "on the contrary", "admittedly",
    "anyhow", "at any rate", "still",
    "all things considered", "as a consequence (of)", "because of", "in consequence",
    "in such a case", "in such cases", "in that case",
    "first and foremost", "to begin with", "fourth", "fourthly", "last of all", "last",
    "lastly", "next", "all in all", "in a word", "in conclusion", "in summary", "in sum",
    "to conclude", "to sum up", "to summarize", "by the by", "by the way", "incidentally",
];

/// Words teachers use when commenting on linking.
const TERMINOLOGY: &[&str] = &[
    "linker", "linking", "linked", "linkage", "linkng", "linkere", "logical link",
    "connector", "connective", "signpost", "signposting", "joining word",
    "transition", "discourse marker", "sequence marker", "conjunct ", "adjunct",
    "linking adverbial",
];

/// Tag-bank categories under which linking errors are filed.
const CONNECTOR_CATEGORIES: &[&str] = &[
    "Adverb needed - Part of speech Incorrect",
    "Coherence - signposting",
    "Coherence - logical sequence",
    "Conjunction - Wrong Use",
    "Conjunction Missing",
    "Conjunction missing OR wrong use",
    "Delete this (unnecessary)",
    "Word choice",
    "Word choice - Level of formality",
    "Word order",
];

/// Expressions too ambiguous to match without quotes however rare they are.
const PROMOTION_EXCLUDED: &[&str] = &["accordingly", "likewise", "afterwards", "fourth"];

const MAX_PROMOTED_UNIGRAM_COUNT: u64 = 10;
const MAX_PROMOTED_BIGRAM_COUNT: u64 = 5;

/// Deletions of longer spans are not about a single linking expression.
const DELETE_CATEGORY: &str = "Delete this (unnecessary)";
const MAX_DELETE_SPAN: usize = 3;

/// Characters that quote an expression in a comment.
const QUOTE_PREFIXES: [char; 4] = ['\'', '"', '-', '\u{FFFD}'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkingLexicon {
    pub bands: [Vec<String>; 3],
    /// Matched anywhere in a lowercased comment.
    pub terminology: Vec<String>,
    /// Matched in a comment only when quoted.
    pub link_words: Vec<String>,
    pub connector_categories: Vec<String>,
}

impl Default for LinkingLexicon {
    fn default() -> Self {
        Self::standard()
    }
}

impl LinkingLexicon {
    pub fn standard() -> Self {
        let bands = [
            owned(BAND1),
            owned(BAND2),
            owned(BAND3),
        ];
        let mut link_words: Vec<String> = Vec::new();
        for expr in bands.iter().flatten() {
            if !link_words.contains(expr) {
                link_words.push(expr.clone());
            }
        }
        Self {
            bands,
            terminology: owned(TERMINOLOGY),
            link_words,
            connector_categories: owned(CONNECTOR_CATEGORIES),
        }
    }

    /// Move rare band 2 and 3 expressions from the quoted-only link words
    /// into the terminology, so that they also match unquoted.
    ///
    /// Single words qualify at 10 corpus occurrences or fewer, two-word
    /// expressions at 5 or fewer. Expressions absent from the tables stay.
    /// Returns the promoted expressions.
    pub fn promote_infrequent(
        &mut self,
        unigrams: &FrequencyTable,
        bigrams: &FrequencyTable,
    ) -> Vec<String> {
        let mut promoted = Vec::new();
        for expr in self.bands[1].iter().chain(self.bands[2].iter()) {
            let rare = match expr.split(' ').count() {
                1 if !PROMOTION_EXCLUDED.contains(&expr.as_str()) => unigrams
                    .get(expr)
                    .is_some_and(|n| n > 0 && n <= MAX_PROMOTED_UNIGRAM_COUNT),
                2 => bigrams
                    .get(expr)
                    .is_some_and(|n| n > 0 && n <= MAX_PROMOTED_BIGRAM_COUNT),
                _ => false,
            };
            if rare && !promoted.contains(expr) {
                promoted.push(expr.clone());
            }
        }
        self.link_words.retain(|w| !promoted.contains(w));
        self.terminology.extend(promoted.iter().cloned());
        debug!(promoted = promoted.len(), "infrequent linking expressions promoted");
        promoted
    }

    /// Whether a teacher comment is about linking.
    pub fn mentions_linking(&self, comment: &str) -> bool {
        let comment = comment.to_lowercase();
        if self.terminology.iter().any(|t| comment.contains(t.as_str())) {
            return true;
        }
        self.link_words.iter().any(|word| {
            QUOTE_PREFIXES
                .iter()
                .any(|q| comment.contains(&format!("{q}{word}")))
        })
    }

    /// Whether the highlighted part of a student sentence is a linking
    /// expression. The revised sentence is checked before the original.
    pub fn marks_linking(
        &self,
        original: &str,
        revised: Option<&str>,
        category: &str,
        span_len: usize,
    ) -> bool {
        if category == DELETE_CATEGORY && span_len > MAX_DELETE_SPAN {
            return false;
        }
        let sentences: Vec<String> = revised
            .into_iter()
            .chain(std::iter::once(original))
            .map(str::to_lowercase)
            .collect();
        self.bands.iter().flatten().any(|expr| {
            let pattern = expr
                .to_lowercase()
                .split(' ')
                .map(mark)
                .collect::<Vec<_>>()
                .join(" ");
            sentences.iter().any(|s| s.contains(&pattern))
        })
    }

    pub fn is_connector_category(&self, category: &str) -> bool {
        self.connector_categories.iter().any(|c| c == category)
    }
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

/// Corpus n-gram counts, one `count<TAB>ngram` entry per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: HashMap<String, u64>,
}

impl FrequencyTable {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RevalignError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        let table = Self::parse(&raw);
        debug!(path = %path.display(), entries = table.counts.len(), "frequency table loaded");
        Ok(table)
    }

    /// Lines without a tab or with a non-numeric count are skipped.
    pub fn parse(raw: &str) -> Self {
        let mut counts = HashMap::new();
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            let Some((count, ngram)) = line.split_once('\t') else {
                warn!(line, "frequency line without tab separator");
                continue;
            };
            match count.trim().parse::<u64>() {
                Ok(count) => {
                    counts.insert(ngram.to_string(), count);
                }
                Err(_) => warn!(line, "frequency line with invalid count"),
            }
        }
        Self { counts }
    }

    pub fn get(&self, ngram: &str) -> Option<u64> {
        self.counts.get(ngram).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl FromIterator<(String, u64)> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, u64)]) -> FrequencyTable {
        entries.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    #[test]
    fn terminology_matches_unquoted() {
        let lexicon = LinkingLexicon::standard();
        assert!(lexicon.mentions_linking("Use a better Signposting device here"));
        assert!(!lexicon.mentions_linking("Spelling mistake"));
    }

    #[test]
    fn link_words_match_only_when_quoted() {
        let lexicon = LinkingLexicon::standard();
        assert!(lexicon.mentions_linking("Try 'moreover' instead"));
        assert!(lexicon.mentions_linking("Avoid \"however\" at the end"));
        assert!(!lexicon.mentions_linking("moreover this is unclear"));
    }

    #[test]
    fn rare_expressions_are_promoted() {
        let mut lexicon = LinkingLexicon::standard();
        let unigrams = table(&[("moreover", 4), ("besides", 40), ("likewise", 1)]);
        let bigrams = table(&[("in contrast", 3), ("by contrast", 9)]);
        let promoted = lexicon.promote_infrequent(&unigrams, &bigrams);

        assert_eq!(promoted, vec!["moreover".to_string(), "in contrast".to_string()]);
        assert!(lexicon.terminology.contains(&"moreover".to_string()));
        assert!(!lexicon.link_words.contains(&"moreover".to_string()));
        assert!(lexicon.link_words.contains(&"likewise".to_string()));
        assert!(lexicon.mentions_linking("moreover this is unclear"));
    }

    #[test]
    fn band1_expressions_are_never_promoted() {
        let mut lexicon = LinkingLexicon::standard();
        let promoted = lexicon.promote_infrequent(&table(&[("however", 1)]), &table(&[]));
        assert!(promoted.is_empty());
    }

    #[test]
    fn marked_expression_in_student_sentence() {
        let lexicon = LinkingLexicon::standard();
        assert!(lexicon.marks_linking(
            "[[On]] [[the]] [[other]] [[hand]] , prices rose .",
            None,
            "Word choice",
            4
        ));
        assert!(lexicon.marks_linking(
            "The plan failed .",
            Some("[[However]] , the plan failed ."),
            "Word order",
            1
        ));
        assert!(!lexicon.marks_linking("The [[plan]] failed .", None, "Word order", 1));
    }

    #[test]
    fn long_deletions_are_not_linking() {
        let lexicon = LinkingLexicon::standard();
        let sentence = "[[However]] [[the]] [[plan]] [[failed]] .";
        assert!(!lexicon.marks_linking(sentence, None, "Delete this (unnecessary)", 4));
        assert!(lexicon.marks_linking(sentence, None, "Word order", 4));
    }

    #[test]
    fn frequency_lines_parse() {
        let freq = FrequencyTable::parse("12\tmoreover\n\n3\tin contrast\nbad\tline\nnotab\n");
        assert_eq!(freq.get("moreover"), Some(12));
        assert_eq!(freq.get("in contrast"), Some(3));
        assert_eq!(freq.len(), 2);
    }
}
