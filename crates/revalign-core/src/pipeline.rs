//! Pipeline orchestration: walk the corpus, classify every teacher note,
//! resolve its revision and collect the surviving records by category.
//!
//! Failures are scoped to one essay or one note. They are logged, counted
//! by [`SkipReason`] and skipped; only configuration errors end a run.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::annotations::TeacherNote;
use crate::categories::CategoryTable;
use crate::config::{ErrorScope, FeedbackType, PipelineConfig};
use crate::context::{self, mark, PLACEHOLDER};
use crate::corpus::{self, EssayEntry};
use crate::domain::{
    join_ids, AlignmentEdge, CategoryGroups, Document, ErrorRecord, Result, RevalignError,
    OPEN_ENDED,
};
use crate::filtering::{CommentFilter, HeuristicCommentFilter, PraiseLexicon};
use crate::lexicon::{FrequencyTable, LinkingLexicon};
use crate::loader::{load_alignments, load_document, load_notes};
use crate::locator::find_next_revision;
use crate::obs;
use crate::resolver::resolve;

/// Revised sentences at most this long that hold a marked placeholder are
/// extraction debris.
const PLACEHOLDER_SENTENCE_MAX_CHARS: usize = 10;

/// Why an essay or a note produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    // Essay level
    MissingOriginal,
    MissingRevision,
    MissingAlignment,
    MalformedInput,
    // Note level
    FeedbackMismatch,
    AnomalousCode,
    CommentFiltered,
    OutOfScope,
    NoTarget,
    InvalidTarget,
    SpanTooLong,
    EmptySpan,
    NoOriginalContext,
    Untraceable,
    NoRevisedContext,
    PlaceholderRevision,
    NotActionable,
    NotLinking,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingOriginal => "missing_original",
            Self::MissingRevision => "missing_revision",
            Self::MissingAlignment => "missing_alignment",
            Self::MalformedInput => "malformed_input",
            Self::FeedbackMismatch => "feedback_mismatch",
            Self::AnomalousCode => "anomalous_code",
            Self::CommentFiltered => "comment_filtered",
            Self::OutOfScope => "out_of_scope",
            Self::NoTarget => "no_target",
            Self::InvalidTarget => "invalid_target",
            Self::SpanTooLong => "span_too_long",
            Self::EmptySpan => "empty_span",
            Self::NoOriginalContext => "no_original_context",
            Self::Untraceable => "untraceable",
            Self::NoRevisedContext => "no_revised_context",
            Self::PlaceholderRevision => "placeholder_revision",
            Self::NotActionable => "not_actionable",
            Self::NotLinking => "not_linking",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub essays_seen: usize,
    pub essays_processed: usize,
    pub notes_seen: usize,
    pub records: usize,
    /// Notes whose code is missing from the category table.
    pub anomalous_codes: usize,
    pub essays_skipped: BTreeMap<String, usize>,
    pub notes_skipped: BTreeMap<String, usize>,
}

impl PipelineStats {
    fn skip_essay(&mut self, reason: SkipReason) {
        *self
            .essays_skipped
            .entry(reason.as_str().to_string())
            .or_default() += 1;
    }

    fn skip_note(&mut self, reason: SkipReason) {
        if reason == SkipReason::AnomalousCode {
            self.anomalous_codes += 1;
        }
        *self
            .notes_skipped
            .entry(reason.as_str().to_string())
            .or_default() += 1;
    }

    pub fn notes_skipped_total(&self) -> usize {
        self.notes_skipped.values().sum()
    }

    pub fn essays_skipped_total(&self) -> usize {
        self.essays_skipped.values().sum()
    }
}

/// Result of a run: grouped records and counters.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub groups: CategoryGroups,
    pub stats: PipelineStats,
}

/// Everything needed to process the notes of one essay.
struct EssayInputs {
    original: Document,
    revision: Document,
    edges: Vec<AlignmentEdge>,
}

/// Corpus-level extraction with its lookup tables and filters.
pub struct Pipeline {
    config: PipelineConfig,
    categories: CategoryTable,
    lexicon: LinkingLexicon,
    filter: Box<dyn CommentFilter>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        categories: CategoryTable,
        lexicon: LinkingLexicon,
        filter: Box<dyn CommentFilter>,
    ) -> Self {
        Self {
            config,
            categories,
            lexicon,
            filter,
        }
    }

    /// Load the category table and frequency tables named by `config` and
    /// build the study's comment filter and lexicon.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let categories = CategoryTable::load(&config.categories)?;
        if categories.is_empty() {
            warn!(path = %config.categories.display(), "category table has no codes");
        }

        let mut lexicon = LinkingLexicon::standard();
        if config.promote_infrequent {
            if let (Some(unigrams), Some(bigrams)) = (&config.unigrams, &config.bigrams) {
                let promoted = lexicon.promote_infrequent(
                    &FrequencyTable::load(unigrams)?,
                    &FrequencyTable::load(bigrams)?,
                );
                debug!(?promoted, "linking terminology extended");
            }
        }

        let praise = config
            .filter_no_lrr
            .then(|| PraiseLexicon::standard(config.scope == ErrorScope::LinkingAdverbials));
        let filter =
            Box::new(HeuristicCommentFilter::new(praise).with_max_len(config.max_comment_len));
        Ok(Self::new(config, categories, lexicon, filter))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process every eligible essay under the corpus root.
    pub fn run(&self) -> Result<PipelineOutput> {
        let started = Instant::now();
        let essays = corpus::discover(&self.config.corpus_dir)?;
        obs::emit_run_started(
            self.config.feedback.as_str(),
            self.config.scope.as_str(),
            essays.len(),
        );

        let mut output = PipelineOutput::default();
        for entry in &essays {
            let _span = obs::EssaySpan::enter(&entry.essay_id());
            self.process_essay(entry, &mut output);
        }

        obs::emit_run_finished(
            output.stats.essays_seen,
            output.stats.records,
            output.groups.category_count(),
            output.stats.notes_skipped_total(),
            started.elapsed().as_millis() as u64,
        );
        Ok(output)
    }

    /// Process one annotated draft, appending its records to `output`.
    pub fn process_essay(&self, entry: &EssayEntry, output: &mut PipelineOutput) {
        let stats = &mut output.stats;
        stats.essays_seen += 1;

        let (inputs, notes) = match self.load_essay(entry) {
            Ok(loaded) => loaded,
            Err((reason, detail)) => {
                obs::emit_essay_skipped(reason, &detail);
                stats.skip_essay(reason);
                return;
            }
        };
        stats.essays_processed += 1;

        let essay_id = entry.essay_id();
        for note in &notes {
            stats.notes_seen += 1;
            match self.process_note(entry, &essay_id, &inputs, note) {
                Ok((category, record)) => {
                    stats.records += 1;
                    output.groups.push(&category, record);
                }
                Err(reason) => {
                    obs::emit_note_skipped(reason, note.target.as_deref());
                    stats.skip_note(reason);
                }
            }
        }
    }

    fn load_essay(
        &self,
        entry: &EssayEntry,
    ) -> std::result::Result<(EssayInputs, Vec<TeacherNote>), (SkipReason, String)> {
        let notes = load_notes(&entry.notes_path).map_err(essay_failure(SkipReason::MalformedInput))?;

        let original_path = entry.original_path();
        let original = load_document(&original_path).map_err(essay_failure(SkipReason::MissingOriginal))?;

        let (revision_path, revision) = match find_next_revision(&original_path) {
            Ok(Some(found)) => found,
            Ok(None) => {
                return Err((
                    SkipReason::MissingRevision,
                    original_path.display().to_string(),
                ))
            }
            Err(err) => return Err((SkipReason::MalformedInput, err.to_string())),
        };

        let edges = load_alignments(&corpus::alignment_path(&revision_path))
            .map_err(essay_failure(SkipReason::MissingAlignment))?;
        debug!(
            original = %original.source().display(),
            revision = %revision.source().display(),
            edges = edges.len(),
            notes = notes.len(),
            "essay inputs loaded"
        );

        Ok((
            EssayInputs {
                original,
                revision,
                edges,
            },
            notes,
        ))
    }

    /// Classify and resolve one note into a `(category, record)` pair.
    fn process_note(
        &self,
        entry: &EssayEntry,
        essay_id: &str,
        inputs: &EssayInputs,
        note: &TeacherNote,
    ) -> std::result::Result<(String, ErrorRecord), SkipReason> {
        let config = &self.config;
        let wanted = match config.feedback {
            FeedbackType::Open => note.has_comment(),
            FeedbackType::Tagged => !note.has_comment(),
        };
        if !wanted {
            return Err(SkipReason::FeedbackMismatch);
        }

        let category = self.category_of(&entry.semester, note)?;
        let comment = match config.feedback {
            FeedbackType::Open => note
                .text
                .as_deref()
                .and_then(|text| self.filter.filter(text, &entry.course))
                .ok_or(SkipReason::CommentFiltered)?,
            FeedbackType::Tagged => category.clone(),
        };

        let in_scope = match (config.feedback, config.scope) {
            (FeedbackType::Open, _) => category == OPEN_ENDED,
            (FeedbackType::Tagged, ErrorScope::All) => true,
            (FeedbackType::Tagged, ErrorScope::LinkingAdverbials) => {
                self.lexicon.is_connector_category(&comment)
            }
        };
        if !in_scope {
            return Err(SkipReason::OutOfScope);
        }

        let targets = match note.target_tokens(config.max_error_span) {
            Ok(Some(targets)) => targets,
            Ok(None) => return Err(SkipReason::NoTarget),
            Err(RevalignError::SpanTooLong { .. }) => return Err(SkipReason::SpanTooLong),
            Err(err) => {
                debug!(error = %err, "unparseable note target");
                return Err(SkipReason::InvalidTarget);
            }
        };

        let original =
            context::locate(&inputs.original, &targets).ok_or(SkipReason::NoOriginalContext)?;

        let revision = match resolve(&inputs.edges, &targets, config.insertion_window)
            .and_then(|result| result.into_traceable(&targets))
        {
            Ok(result) => result,
            Err(RevalignError::EmptySpan) => {
                obs::emit_note_error(&RevalignError::EmptySpan);
                return Err(SkipReason::EmptySpan);
            }
            Err(err) => {
                debug!(error = %err, "revision not traceable");
                return Err(SkipReason::Untraceable);
            }
        };

        let revised = context::locate(&inputs.revision, &revision.revised_tokens)
            .ok_or(SkipReason::NoRevisedContext)?;
        let revised_sentence = context::repair_entities(&revised.target);
        if revised_sentence.contains(&mark(PLACEHOLDER))
            && revised_sentence.chars().count() < PLACEHOLDER_SENTENCE_MAX_CHARS
        {
            return Err(SkipReason::PlaceholderRevision);
        }

        let kind = revision.kind.ok_or(SkipReason::NotActionable)?;

        if config.scope == ErrorScope::LinkingAdverbials {
            let marks = self.lexicon.marks_linking(
                &original.target,
                Some(revised_sentence.as_str()),
                &category,
                targets.len(),
            );
            let linking = match config.feedback {
                FeedbackType::Open => marks || self.lexicon.mentions_linking(&comment),
                FeedbackType::Tagged => marks,
            };
            if !linking {
                return Err(SkipReason::NotLinking);
            }
        }

        let record = ErrorRecord {
            essay_id: essay_id.to_string(),
            comment,
            target_tokens: join_ids(&targets),
            revision_type: kind,
            revision_effort: revision.effort,
            original_sentence: original.target,
            revised_sentence,
            original_context: original.extended,
            revised_context: revised.extended,
        };
        Ok((category, record))
    }

    /// `open_ended` for notes without a code; the table's label otherwise.
    fn category_of(
        &self,
        semester: &str,
        note: &TeacherNote,
    ) -> std::result::Result<String, SkipReason> {
        if note.code.is_none() {
            return Ok(OPEN_ENDED.to_string());
        }
        let label = note
            .category_code()
            .and_then(|code| self.categories.lookup(semester, code));
        match label {
            Some(label) => Ok(label.to_string()),
            None => {
                warn!(code = note.code.as_deref().unwrap_or_default(), semester, "anomalous error code");
                Err(SkipReason::AnomalousCode)
            }
        }
    }
}

fn essay_failure(missing: SkipReason) -> impl Fn(RevalignError) -> (SkipReason, String) {
    move |err| {
        let reason = match err {
            RevalignError::NotFound(_) => missing,
            _ => SkipReason::MalformedInput,
        };
        (reason, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RevisionKind;
    use crate::filtering::PassThrough;

    const TABLE: &str = "Category,2007-08A\nWord order,11\nSpelling,5\n";

    fn pipeline(feedback: FeedbackType, scope: ErrorScope) -> Pipeline {
        let config = PipelineConfig {
            feedback,
            scope,
            ..Default::default()
        };
        Pipeline::new(
            config,
            CategoryTable::from_reader(TABLE.as_bytes()).unwrap(),
            LinkingLexicon::standard(),
            Box::new(PassThrough),
        )
    }

    fn entry() -> EssayEntry {
        EssayEntry {
            semester: "2007-08A".to_string(),
            course: "ENG".to_string(),
            assignment: "Asgn_1".to_string(),
            notes_path: "E_0001_1_Asgn_1_version1_fixed_notes.xml".into(),
        }
    }

    fn inputs() -> EssayInputs {
        use crate::domain::EditType::*;
        let original = Document::from_sentences(
            "orig.xml",
            vec![
                vec![("w1", "We"), ("w2", "studied"), ("w3", "the"), ("w4", "river"), ("w5", "banks"), ("w6", ".")],
                vec![("w7", "So"), ("w8", "the"), ("w9", "water"), ("w10", "was"), ("w11", "dirty"), ("w12", ".")],
            ],
        );
        let revision = Document::from_sentences(
            "rev.xml",
            vec![
                vec![("w1", "We"), ("w2", "studied"), ("w3", "the"), ("w4", "river"), ("w5", "banks"), ("w6", ".")],
                vec![("w7", "Therefore"), ("w8", "the"), ("w9", "water"), ("w10", "was"), ("w11", "dirty"), ("w12", ".")],
            ],
        );
        let mut edges: Vec<AlignmentEdge> = (1..=12)
            .filter(|i| *i != 7)
            .map(|i| {
                let id = format!("w{i}");
                AlignmentEdge::new(Some(id.as_str()), Some(id.as_str()), Identical)
            })
            .collect();
        edges.insert(6, AlignmentEdge::new(Some("w7"), Some("w7"), Replace));
        EssayInputs {
            original,
            revision,
            edges,
        }
    }

    fn note(text: Option<&str>, code: Option<&str>, target: &str) -> TeacherNote {
        TeacherNote {
            text: text.map(String::from),
            code: code.map(String::from),
            target: Some(target.to_string()),
        }
    }

    #[test]
    fn open_comment_becomes_record() {
        let p = pipeline(FeedbackType::Open, ErrorScope::All);
        let (category, record) = p
            .process_note(&entry(), "id", &inputs(), &note(Some("Use a linker here"), None, "#w7"))
            .unwrap();
        assert_eq!(category, OPEN_ENDED);
        assert_eq!(record.revision_type, RevisionKind::Replace);
        assert_eq!(record.revision_effort, 3);
        assert_eq!(record.original_sentence, "[[So]] the water was dirty .");
        assert_eq!(record.revised_sentence, "[[Therefore]] the water was dirty .");
        assert!(record.original_context.starts_with("We studied"));
    }

    #[test]
    fn tagged_note_uses_category_label() {
        let p = pipeline(FeedbackType::Tagged, ErrorScope::All);
        let (category, record) = p
            .process_note(&entry(), "id", &inputs(), &note(None, Some("cb:011"), "#w7"))
            .unwrap();
        assert_eq!(category, "Word order");
        assert_eq!(record.comment, "Word order");
    }

    #[test]
    fn classification_skips() {
        let p = pipeline(FeedbackType::Tagged, ErrorScope::All);
        let skip = |n: TeacherNote| p.process_note(&entry(), "id", &inputs(), &n).unwrap_err();
        assert_eq!(skip(note(Some("text"), None, "#w7")), SkipReason::FeedbackMismatch);
        assert_eq!(skip(note(None, Some("cb:099"), "#w7")), SkipReason::AnomalousCode);
        assert_eq!(skip(note(None, Some("cb:011"), "#range(w1,w10)")), SkipReason::SpanTooLong);
        assert_eq!(
            skip(note(None, Some("cb:011"), "#range(w1,w4000000000)")),
            SkipReason::SpanTooLong
        );
        assert_eq!(skip(note(None, Some("cb:011"), "#range(w9,w2)")), SkipReason::InvalidTarget);
        assert_eq!(skip(note(None, Some("cb:011"), "#w2")), SkipReason::NotActionable);
        assert_eq!(skip(note(None, Some("cb:011"), "#w90")), SkipReason::NoOriginalContext);
    }

    #[test]
    fn span_one_below_limit_passes_length_gate() {
        let p = pipeline(FeedbackType::Tagged, ErrorScope::All);
        assert_eq!(p.config().max_error_span, 10);
        let result = p.process_note(&entry(), "id", &inputs(), &note(None, Some("cb:011"), "#range(w1,w9)"));
        assert_ne!(result.err(), Some(SkipReason::SpanTooLong));
    }

    #[test]
    fn open_feedback_with_code_is_out_of_scope() {
        let p = pipeline(FeedbackType::Open, ErrorScope::All);
        let err = p
            .process_note(&entry(), "id", &inputs(), &note(Some("Word order"), Some("cb:011"), "#w7"))
            .unwrap_err();
        assert_eq!(err, SkipReason::OutOfScope);
    }

    #[test]
    fn linking_scope_requires_linking_evidence() {
        let p = pipeline(FeedbackType::Open, ErrorScope::LinkingAdverbials);
        assert!(p
            .process_note(&entry(), "id", &inputs(), &note(Some("Wrong word"), None, "#w7"))
            .is_ok());
        let err = p
            .process_note(&entry(), "id", &inputs(), &note(Some("Wrong word"), None, "#w9"))
            .unwrap_err();
        // w9 is identical in the revision
        assert_eq!(err, SkipReason::NotActionable);

        let tagged = pipeline(FeedbackType::Tagged, ErrorScope::LinkingAdverbials);
        assert_eq!(
            tagged
                .process_note(&entry(), "id", &inputs(), &note(None, Some("cb:5"), "#w7"))
                .unwrap_err(),
            SkipReason::OutOfScope
        );
    }

    #[test]
    fn stats_count_anomalous_codes() {
        let mut stats = PipelineStats::default();
        stats.skip_note(SkipReason::AnomalousCode);
        stats.skip_note(SkipReason::NoTarget);
        stats.skip_note(SkipReason::NoTarget);
        assert_eq!(stats.anomalous_codes, 1);
        assert_eq!(stats.notes_skipped["no_target"], 2);
        assert_eq!(stats.notes_skipped_total(), 3);
    }
}
