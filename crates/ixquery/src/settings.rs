// crates/ixquery/src/settings.rs

use crate::error::{Error, Result};
use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// How query text is turned into terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Analyzer {
    /// Every clause value is one exact term.
    #[default]
    #[serde(alias = "KeywordAnalyzer")]
    #[value(alias = "KeywordAnalyzer")]
    Keyword,

    /// Clause values go through the field's own tokenizer.
    #[serde(alias = "StandardAnalyzer")]
    #[value(alias = "StandardAnalyzer")]
    Standard,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FormatKind {
    #[default]
    Multiline,
    Tabular,
    Json,
    JsonPretty,
}

/// Everything that shapes a query run. Set once, validated when the
/// executor is built, then shared by every directive of the run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct QuerySettings {
    /// Fields to include in output; empty means all stored fields.
    pub fields: Vec<String>,
    pub analyzer: Analyzer,
    /// Default field for unqualified query clauses.
    pub query_field: Option<String>,
    pub output_limit: Option<usize>,
    /// Older name for `output_limit`.
    pub query_limit: Option<usize>,
    /// `field:/regex/`
    pub regex: Option<String>,
    pub show_id: bool,
    pub show_score: bool,
    pub show_hits: bool,
    pub sort_fields: bool,
    pub suppress_names: bool,
    pub format: FormatKind,
}

impl QuerySettings {
    /// The effective cap on printed documents.
    pub fn limit(&self) -> usize {
        self.output_limit
            .or(self.query_limit)
            .unwrap_or(usize::MAX)
    }
}

/// Contents of an optional `--config` TOML file.
///
/// ```toml
/// index = ["/var/idx/a", "/var/idx/b"]
///
/// [query]
/// fields = ["title", "tag"]
/// format = "json-pretty"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub index: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub query: QuerySettings,
}

impl Settings {
    #[tracing::instrument(skip_all)]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::config(format!(
                "settings file not found at {}",
                path.display()
            )));
        }

        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}
