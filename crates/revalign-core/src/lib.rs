//! Revalign Core Library
//!
//! Revision alignment and error-span resolution for TEI learner corpora:
//! from a teacher-flagged span in one essay draft to the tokens, edit type
//! and sentence context of the student's revision in the next draft.

pub mod annotations;
pub mod categories;
pub mod config;
pub mod context;
pub mod corpus;
pub mod domain;
pub mod filtering;
pub mod lexicon;
pub mod loader;
pub mod locator;
pub mod obs;
pub mod pipeline;
pub mod reporting;
pub mod resolver;
pub mod telemetry;

pub use domain::{
    join_ids, AlignmentEdge, CategoryGroup, CategoryGroups, Document, EditType, ErrorRecord,
    Result, RevalignError, RevisionKind, RevisionResult, Sentence, Token, TokenId, OPEN_ENDED,
};

pub use annotations::{parse_target, TeacherNote};
pub use categories::CategoryTable;
pub use config::{ConfigOverrides, ErrorScope, FeedbackType, PipelineConfig};
pub use context::{locate, repair_entities, ContextWindow};
pub use corpus::EssayEntry;
pub use filtering::{CommentFilter, HeuristicCommentFilter, PassThrough, PraiseLexicon};
pub use lexicon::{FrequencyTable, LinkingLexicon};
pub use loader::{load_alignments, load_document, load_notes};
pub use locator::find_next_revision;
pub use pipeline::{Pipeline, PipelineOutput, PipelineStats, SkipReason};
pub use reporting::{load_snapshot, write_outputs, OutputPaths, Snapshot};
pub use resolver::resolve;
pub use telemetry::init_tracing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
