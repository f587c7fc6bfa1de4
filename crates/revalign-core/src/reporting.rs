use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{ErrorScope, FeedbackType, PipelineConfig};
use crate::domain::{CategoryGroup, CategoryGroups, ErrorRecord, Result, RevalignError};
use crate::obs;
use crate::pipeline::{PipelineOutput, PipelineStats};

pub const SNAPSHOT_SCHEMA_VERSION: &str = "1.0";

/// Parameters a snapshot was produced with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunParams {
    pub feedback: FeedbackType,
    pub scope: ErrorScope,
    pub max_error_span: usize,
    pub insertion_window: u32,
    pub filter_no_lrr: bool,
    pub corpus_dir: String,
}

impl From<&PipelineConfig> for RunParams {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            feedback: config.feedback,
            scope: config.scope,
            max_error_span: config.max_error_span,
            insertion_window: config.insertion_window,
            filter_no_lrr: config.filter_no_lrr,
            corpus_dir: config.corpus_dir.display().to_string(),
        }
    }
}

/// Grouped records of one run, reloadable without recomputation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub params: RunParams,
    pub groups: Vec<CategoryGroup>,
    pub stats: PipelineStats,
    /// SHA-256 of the serialized groups.
    pub digest: String,
}

impl Snapshot {
    pub fn new(config: &PipelineConfig, output: &PipelineOutput) -> Result<Self> {
        let groups: Vec<CategoryGroup> = output.groups.iter().cloned().collect();
        let digest = records_digest(&groups)?;
        Ok(Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            params: RunParams::from(config),
            groups,
            stats: output.stats.clone(),
            digest,
        })
    }

    /// Fails with [`RevalignError::DigestMismatch`] when the records no
    /// longer match the stored digest.
    pub fn verify(&self) -> Result<()> {
        let actual = records_digest(&self.groups)?;
        if actual != self.digest {
            return Err(RevalignError::DigestMismatch {
                expected: self.digest.clone(),
                actual,
            });
        }
        Ok(())
    }

    pub fn record_count(&self) -> usize {
        self.groups.iter().map(|g| g.records.len()).sum()
    }

    pub fn into_groups(self) -> CategoryGroups {
        self.groups.into_iter().collect()
    }
}

/// SHA-256 hex digest of the groups' JSON form.
pub fn records_digest(groups: &[CategoryGroup]) -> Result<String> {
    let bytes = serde_json::to_vec(groups)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Write records category by category, one row each, without a header.
pub fn write_records_csv<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a ErrorRecord>,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    for record in records {
        writer.write_record(record.to_row())?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a snapshot in pretty JSON format.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let content = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, content)?;
    Ok(())
}

/// Read a snapshot back and verify its digest.
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    if !path.exists() {
        return Err(RevalignError::NotFound(path.to_path_buf()));
    }
    let snapshot: Snapshot = serde_json::from_str(&fs::read_to_string(path)?)?;
    snapshot.verify()?;
    Ok(snapshot)
}

/// Paths of the files written by [`write_outputs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub csv: PathBuf,
    pub snapshot: PathBuf,
}

/// Write `<feedback>_<scope>.csv` and `.json` into the result directory.
pub fn write_outputs(config: &PipelineConfig, output: &PipelineOutput) -> Result<OutputPaths> {
    fs::create_dir_all(&config.result_dir)?;
    let paths = OutputPaths {
        csv: config.csv_path(),
        snapshot: config.snapshot_path(),
    };
    write_records_csv(&paths.csv, output.groups.flatten())?;
    write_snapshot(&paths.snapshot, &Snapshot::new(config, output)?)?;
    obs::emit_output_written(
        &paths.csv.display().to_string(),
        &paths.snapshot.display().to_string(),
        output.groups.record_count(),
    );
    Ok(paths)
}

/// Render per-category counts and skip totals as plain text.
pub fn render_summary(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}_{} ({} records, generated {})\n\n",
        snapshot.params.feedback,
        snapshot.params.scope,
        snapshot.record_count(),
        snapshot.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str("Categories\n");
    for group in &snapshot.groups {
        out.push_str(&format!("- {}: {}\n", group.category, group.records.len()));
    }

    let stats = &snapshot.stats;
    out.push_str(&format!(
        "\nEssays: {} seen, {} processed\nNotes: {} seen, {} anomalous codes\n",
        stats.essays_seen, stats.essays_processed, stats.notes_seen, stats.anomalous_codes
    ));
    if !stats.essays_skipped.is_empty() {
        out.push_str("\nSkipped essays\n");
        for (reason, count) in &stats.essays_skipped {
            out.push_str(&format!("- {reason}: {count}\n"));
        }
    }
    if !stats.notes_skipped.is_empty() {
        out.push_str("\nSkipped notes\n");
        for (reason, count) in &stats.notes_skipped {
            out.push_str(&format!("- {reason}: {count}\n"));
        }
    }
    out
}
