//! Revalign - revision alignment CLI
//!
//! The `revalign` command extracts teacher feedback and the student
//! revisions it triggered from a TEI learner corpus.
//!
//! ## Commands
//!
//! - `extract`: Walk the corpus and write `<feedback>_<scope>.csv/.json`
//! - `summary`: Print per-category counts of a saved snapshot
//! - `context`: Show the marked sentence context of tokens in one essay

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use revalign_core::config::DEFAULT_MAX_ERROR_SPAN;
use revalign_core::{
    ConfigOverrides, ErrorScope, FeedbackType, Pipeline, PipelineConfig, TokenId,
};

#[derive(Parser)]
#[command(name = "revalign")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Teacher feedback and student revision extraction for TEI learner corpora", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract error records from a corpus
    Extract {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Corpus root (<semester>/<course>/<assignment>/<files>)
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Error category table (CSV)
        #[arg(long)]
        categories: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Feedback type: open or tagged
        #[arg(long)]
        feedback: Option<FeedbackType>,

        /// Error scope: ALL or LA (linking adverbials)
        #[arg(long)]
        scope: Option<ErrorScope>,

        /// Skip spans of this many tokens or more
        #[arg(long)]
        max_error_span: Option<usize>,

        /// Capture insertions this many positions beyond the revised span
        #[arg(long)]
        insertion_window: Option<u32>,

        /// Drop open-ended comments this many characters or longer
        #[arg(long)]
        max_comment_len: Option<usize>,

        /// Drop praise-only and holistic comments
        #[arg(long)]
        filter_no_lrr: bool,
    },

    /// Summarize a snapshot written by `extract`
    Summary {
        /// Snapshot JSON file
        snapshot: PathBuf,
    },

    /// Show the marked context of tokens in one essay
    Context {
        /// TEI essay file
        document: PathBuf,

        /// Token ids (`w12`) or ranges (`range(w3,w5)`)
        #[arg(required = true)]
        tokens: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    revalign_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Extract {
            config,
            corpus,
            categories,
            output,
            feedback,
            scope,
            max_error_span,
            insertion_window,
            max_comment_len,
            filter_no_lrr,
        } => {
            let overrides = ConfigOverrides {
                corpus_dir: corpus,
                categories,
                result_dir: output,
                feedback,
                scope,
                max_error_span,
                insertion_window,
                max_comment_len,
                filter_no_lrr: filter_no_lrr.then_some(true),
            };
            cmd_extract(config.as_deref(), &overrides)
        }
        Commands::Summary { snapshot } => cmd_summary(&snapshot),
        Commands::Context { document, tokens } => cmd_context(&document, &tokens),
    }
}

/// Run the pipeline and write its outputs
fn cmd_extract(config_path: Option<&Path>, overrides: &ConfigOverrides) -> Result<()> {
    let config = PipelineConfig::load(config_path, overrides).context("Invalid configuration")?;
    info!(
        corpus = %config.corpus_dir.display(),
        output = %config.result_dir.display(),
        "starting extraction"
    );

    let pipeline = Pipeline::from_config(config).context("Failed to prepare pipeline")?;
    let output = pipeline
        .run()
        .with_context(|| format!("Extraction failed for {:?}", pipeline.config().corpus_dir))?;
    let paths = revalign_core::write_outputs(pipeline.config(), &output)
        .with_context(|| format!("Failed to write results to {:?}", pipeline.config().result_dir))?;

    println!(
        "Extracted {} records in {} categories from {} essays",
        output.groups.record_count(),
        output.groups.category_count(),
        output.stats.essays_processed
    );
    for group in output.groups.iter() {
        println!("  {:<50} {}", group.category, group.records.len());
    }
    println!();
    println!("CSV:      {}", paths.csv.display());
    println!("Snapshot: {}", paths.snapshot.display());
    Ok(())
}

/// Print counts from a saved snapshot
fn cmd_summary(path: &Path) -> Result<()> {
    let snapshot = revalign_core::load_snapshot(path)
        .with_context(|| format!("Failed to load snapshot: {:?}", path))?;
    print!("{}", revalign_core::reporting::render_summary(&snapshot));
    Ok(())
}

/// Print the context window of tokens as JSON
fn cmd_context(path: &Path, tokens: &[String]) -> Result<()> {
    let document = revalign_core::load_document(path)
        .with_context(|| format!("Failed to load document: {:?}", path))?;

    let mut ids: Vec<TokenId> = Vec::new();
    for reference in tokens {
        ids.extend(
            revalign_core::parse_target(reference, DEFAULT_MAX_ERROR_SPAN)
                .with_context(|| format!("Invalid token reference: {}", reference))?,
        );
    }

    match revalign_core::locate(&document, &ids) {
        Some(window) => println!("{}", serde_json::to_string_pretty(&window)?),
        None => println!("No token of {} occurs in {:?}", tokens.join(" "), path),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn extract_flags_parse_into_overrides() {
        let cli = Cli::try_parse_from([
            "revalign",
            "extract",
            "--corpus",
            "/data/corpus",
            "--feedback",
            "tagged",
            "--scope",
            "LA",
            "--filter-no-lrr",
        ])
        .unwrap();
        match cli.command {
            Commands::Extract {
                corpus,
                feedback,
                scope,
                filter_no_lrr,
                config,
                ..
            } => {
                assert_eq!(corpus, Some(PathBuf::from("/data/corpus")));
                assert_eq!(feedback, Some(FeedbackType::Tagged));
                assert_eq!(scope, Some(ErrorScope::LinkingAdverbials));
                assert!(filter_no_lrr);
                assert!(config.is_none());
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn unknown_scope_is_rejected() {
        assert!(Cli::try_parse_from(["revalign", "extract", "--scope", "XX"]).is_err());
    }

    #[test]
    fn context_prints_window_for_essay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("essay_version1_fixed.xml");
        std::fs::write(
            &path,
            r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><text><body>
<s><w xml:id="w1">However</w><w xml:id="w2">the</w><w xml:id="w3">survey</w><w xml:id="w4">failed</w><w xml:id="w5">badly</w><w xml:id="w6">.</w></s>
</body></text></TEI>"#,
        )
        .unwrap();
        cmd_context(&path, &["w1".to_string()]).unwrap();
        assert!(cmd_context(&path, &["#range(w4,w2)".to_string()]).is_err());
    }
}
