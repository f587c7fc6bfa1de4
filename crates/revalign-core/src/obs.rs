//! Structured observability hooks for extraction run events.
//!
//! This module provides:
//! - Essay-scoped tracing spans via the `EssaySpan` RAII guard
//! - Emission functions for run start and finish, essay and note skips
//!
//! Events are emitted at `info!` level, skips at `debug!`, integrity
//! problems at `warn!`/`error!`. Filter with `RUST_LOG`.

use tracing::{debug, error, info, warn};

use crate::pipeline::SkipReason;

/// RAII guard that enters an essay-scoped tracing span while one annotated
/// draft is processed.
///
/// # Example
///
/// ```ignore
/// let _span = EssaySpan::enter("2007-08A_CTL_0011_3210_Asgn_2_version1");
/// // every event below carries essay_id
/// ```
pub struct EssaySpan {
    _span: tracing::span::EnteredSpan,
}

impl EssaySpan {
    pub fn enter(essay_id: &str) -> Self {
        let span = tracing::info_span!("revalign.essay", essay_id = %essay_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: extraction run started.
pub fn emit_run_started(feedback: &str, scope: &str, essays: usize) {
    info!(event = "run.started", feedback = %feedback, scope = %scope, essays = essays);
}

/// Emit event: run finished with record and skip totals.
pub fn emit_run_finished(
    essays: usize,
    records: usize,
    categories: usize,
    notes_skipped: usize,
    duration_ms: u64,
) {
    info!(
        event = "run.finished",
        essays = essays,
        records = records,
        categories = categories,
        notes_skipped = notes_skipped,
        duration_ms = duration_ms,
    );
}

/// Emit event: a whole essay was skipped.
pub fn emit_essay_skipped(reason: SkipReason, detail: &dyn std::fmt::Display) {
    warn!(event = "essay.skipped", reason = %reason, detail = %detail);
}

/// Emit event: one note was skipped.
pub fn emit_note_skipped(reason: SkipReason, target: Option<&str>) {
    debug!(event = "note.skipped", reason = %reason, note_target = target.unwrap_or("-"));
}

/// Emit event: data integrity problem in a single note (error level).
pub fn emit_note_error(error: &dyn std::fmt::Display) {
    error!(event = "note.error", error = %error);
}

/// Emit event: output files written.
pub fn emit_output_written(csv: &str, snapshot: &str, records: usize) {
    info!(event = "output.written", csv = %csv, snapshot = %snapshot, records = records);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn essay_span_enters_without_subscriber() {
        let _span = EssaySpan::enter("2007-08A_E_version1");
        emit_note_skipped(SkipReason::NoTarget, None);
    }
}
