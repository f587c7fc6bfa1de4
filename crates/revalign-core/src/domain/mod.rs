//! Domain models for revalign.
//!
//! Canonical definitions for the core entities:
//! - `Document`: sentences and tokens of one TEI essay
//! - `AlignmentEdge`: one link between original and revised tokens
//! - `RevisionResult`: summarized revision of an error span
//! - `ErrorRecord`: one output row, grouped by error category

pub mod alignment;
pub mod document;
pub mod error;
pub mod record;

// Re-export main types and errors
pub use alignment::{join_ids, AlignmentEdge, EditType, RevisionKind, RevisionResult};
pub use document::{Document, Sentence, Token, TokenId};
pub use error::{Result, RevalignError};
pub use record::{CategoryGroup, CategoryGroups, ErrorRecord, OPEN_ENDED};
