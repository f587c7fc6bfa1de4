//! Pipeline configuration.
//!
//! Resolution order (highest priority first):
//! 1. CLI flags (applied via [`PipelineConfig::apply_overrides`])
//! 2. TOML config file
//! 3. Compiled defaults

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{Result, RevalignError};
use crate::filtering::DEFAULT_MAX_COMMENT_LEN;
use crate::resolver::DEFAULT_INSERTION_WINDOW;

/// Spans of this many tokens or more are not a local error.
pub const DEFAULT_MAX_ERROR_SPAN: usize = 10;

/// Which teacher notes a run collects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    /// Notes carrying an open-ended comment.
    #[default]
    Open,
    /// Notes carrying only a tag-bank code.
    Tagged,
}

impl FeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Tagged => "tagged",
        }
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackType {
    type Err = RevalignError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "open" => Ok(Self::Open),
            "tagged" => Ok(Self::Tagged),
            other => Err(RevalignError::Config(format!(
                "unknown feedback type '{other}' (expected open or tagged)"
            ))),
        }
    }
}

/// Which errors a run keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorScope {
    #[default]
    #[serde(rename = "ALL")]
    All,
    /// Linking adverbials only.
    #[serde(rename = "LA")]
    LinkingAdverbials,
}

impl ErrorScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::LinkingAdverbials => "LA",
        }
    }
}

impl fmt::Display for ErrorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorScope {
    type Err = RevalignError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ALL" | "all" => Ok(Self::All),
            "LA" | "la" => Ok(Self::LinkingAdverbials),
            other => Err(RevalignError::Config(format!(
                "unknown error scope '{other}' (expected ALL or LA)"
            ))),
        }
    }
}

/// Settings of one extraction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Corpus root: `<semester>/<course>/<assignment>/<files>`.
    pub corpus_dir: PathBuf,
    /// Category table CSV.
    pub categories: PathBuf,
    /// Where the CSV and snapshot are written.
    pub result_dir: PathBuf,
    pub feedback: FeedbackType,
    pub scope: ErrorScope,
    pub max_error_span: usize,
    pub insertion_window: u32,
    /// Open-ended comments this many characters or longer are dropped.
    pub max_comment_len: usize,
    /// Drop praise-only and holistic comments.
    pub filter_no_lrr: bool,
    /// Promote rare linking expressions using the frequency tables below.
    pub promote_infrequent: bool,
    pub unigrams: Option<PathBuf>,
    pub bigrams: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("corpus"),
            categories: PathBuf::from("error_categories.csv"),
            result_dir: PathBuf::from("results"),
            feedback: FeedbackType::default(),
            scope: ErrorScope::default(),
            max_error_span: DEFAULT_MAX_ERROR_SPAN,
            insertion_window: DEFAULT_INSERTION_WINDOW,
            max_comment_len: DEFAULT_MAX_COMMENT_LEN,
            filter_no_lrr: false,
            promote_infrequent: true,
            unigrams: None,
            bigrams: None,
        }
    }
}

/// Values given on the command line. `None` leaves the configured value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub corpus_dir: Option<PathBuf>,
    pub categories: Option<PathBuf>,
    pub result_dir: Option<PathBuf>,
    pub feedback: Option<FeedbackType>,
    pub scope: Option<ErrorScope>,
    pub max_error_span: Option<usize>,
    pub insertion_window: Option<u32>,
    pub max_comment_len: Option<usize>,
    pub filter_no_lrr: Option<bool>,
}

impl PipelineConfig {
    /// Load from an optional TOML file, apply `overrides` and validate.
    pub fn load(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(RevalignError::NotFound(path.to_path_buf()));
                }
                Self::from_toml(&std::fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(dir) = &overrides.corpus_dir {
            self.corpus_dir = dir.clone();
        }
        if let Some(path) = &overrides.categories {
            self.categories = path.clone();
        }
        if let Some(dir) = &overrides.result_dir {
            self.result_dir = dir.clone();
        }
        if let Some(feedback) = overrides.feedback {
            self.feedback = feedback;
        }
        if let Some(scope) = overrides.scope {
            self.scope = scope;
        }
        if let Some(max) = overrides.max_error_span {
            self.max_error_span = max;
        }
        if let Some(window) = overrides.insertion_window {
            self.insertion_window = window;
        }
        if let Some(len) = overrides.max_comment_len {
            self.max_comment_len = len;
        }
        if let Some(filter) = overrides.filter_no_lrr {
            self.filter_no_lrr = filter;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_error_span < 2 {
            return Err(RevalignError::Config(
                "max_error_span must be at least 2".to_string(),
            ));
        }
        if self.max_comment_len == 0 {
            return Err(RevalignError::Config(
                "max_comment_len must be positive".to_string(),
            ));
        }
        if self.promote_infrequent && self.unigrams.is_some() != self.bigrams.is_some() {
            return Err(RevalignError::Config(
                "unigrams and bigrams must be configured together".to_string(),
            ));
        }
        Ok(())
    }

    /// `<feedback>_<scope>`, the name of both output files.
    pub fn output_stem(&self) -> String {
        format!("{}_{}", self.feedback, self.scope)
    }

    pub fn csv_path(&self) -> PathBuf {
        self.result_dir.join(format!("{}.csv", self.output_stem()))
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.result_dir.join(format!("{}.json", self.output_stem()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_study() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_error_span, 10);
        assert_eq!(config.insertion_window, 1);
        assert_eq!(config.feedback, FeedbackType::Open);
        assert_eq!(config.scope, ErrorScope::All);
        assert_eq!(config.output_stem(), "open_ALL");
    }

    #[test]
    fn toml_fills_missing_fields_with_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
corpus_dir = "/data/corpus"
feedback = "tagged"
scope = "LA"
"#,
        )
        .unwrap();
        assert_eq!(config.corpus_dir, PathBuf::from("/data/corpus"));
        assert_eq!(config.feedback, FeedbackType::Tagged);
        assert_eq!(config.scope, ErrorScope::LinkingAdverbials);
        assert_eq!(config.max_error_span, DEFAULT_MAX_ERROR_SPAN);
        assert_eq!(config.csv_path(), PathBuf::from("results/tagged_LA.csv"));
    }

    #[test]
    fn bad_toml_is_a_toml_error() {
        let err = PipelineConfig::from_toml("scope = \"XX\"").unwrap_err();
        assert!(matches!(err, RevalignError::Toml(_)));
    }

    #[test]
    fn overrides_take_precedence() {
        let mut config = PipelineConfig::default();
        config.apply_overrides(&ConfigOverrides {
            scope: Some(ErrorScope::LinkingAdverbials),
            max_error_span: Some(5),
            max_comment_len: Some(120),
            ..Default::default()
        });
        assert_eq!(config.scope, ErrorScope::LinkingAdverbials);
        assert_eq!(config.max_error_span, 5);
        assert_eq!(config.max_comment_len, 120);
        assert_eq!(config.feedback, FeedbackType::Open);
    }

    #[test]
    fn validation_rejects_degenerate_settings() {
        let config = PipelineConfig {
            max_error_span: 1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RevalignError::Config(_))));

        let config = PipelineConfig {
            max_comment_len: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RevalignError::Config(_))));

        let config = PipelineConfig {
            unigrams: Some(PathBuf::from("freq_unigrams")),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RevalignError::Config(_))));
    }

    #[test]
    fn parse_cli_values() {
        assert_eq!("tagged".parse::<FeedbackType>().unwrap(), FeedbackType::Tagged);
        assert_eq!("la".parse::<ErrorScope>().unwrap(), ErrorScope::LinkingAdverbials);
        assert!("both".parse::<FeedbackType>().is_err());
    }

    #[test]
    fn missing_config_file_is_not_found() {
        let err = PipelineConfig::load(
            Some(Path::new("/no/such/revalign.toml")),
            &ConfigOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RevalignError::NotFound(_)));
    }
}
