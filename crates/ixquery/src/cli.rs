// crates/ixquery/src/cli.rs

use crate::error::{Error, Result};
use crate::executor::QueryExecutor;
use crate::index::IndexSet;
use crate::mode::{self, Mode};
use crate::settings::{Analyzer, FormatKind, Settings};
use clap::{builder::ValueHint, Parser};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info};

/// Query a prebuilt full-text index from the command line
#[derive(Parser, Debug)]
#[command(name = "ixquery", version, about = "Query a prebuilt full-text index")]
pub struct Cli {
    /// Index directory. Repeat to search several indexes as one.
    #[arg(
        short = 'i',
        long = "index",
        value_name = "DIR",
        value_hint = ValueHint::DirPath,
        value_parser = dir_must_exist
    )]
    pub index: Vec<PathBuf>,

    /// Query text, or a mode such as `%all`, `%ids 3 7`, `%enumerate-terms FIELD`
    #[arg(short = 'q', long = "query", value_name = "QUERY", num_args = 1..)]
    pub query: Vec<String>,

    /// Fields to print (default: every stored field)
    #[arg(long, value_name = "FIELD", num_args = 1.., value_delimiter = ',')]
    pub fields: Vec<String>,

    #[arg(long)]
    pub sort_fields: bool,

    /// Older spelling of --output-limit
    #[arg(long, value_name = "N")]
    pub query_limit: Option<usize>,

    /// Print at most N documents per query
    #[arg(long, value_name = "N")]
    pub output_limit: Option<usize>,

    #[arg(long, value_enum, ignore_case = true)]
    pub analyzer: Option<Analyzer>,

    /// Default field for unqualified query terms
    #[arg(long, value_name = "FIELD")]
    pub query_field: Option<String>,

    /// Print only documents where FIELD fully matches REGEX: `FIELD:/REGEX/`
    #[arg(long, value_name = "FIELD:/REGEX/")]
    pub regex: Option<String>,

    #[arg(long)]
    pub show_id: bool,

    #[arg(long)]
    pub show_score: bool,

    /// Print `totalHits: N` after each query
    #[arg(long)]
    pub show_hits: bool,

    /// Print values without field names
    #[arg(long)]
    pub suppress_names: bool,

    /// Same as `--format tabular`
    #[arg(long, conflicts_with = "format")]
    pub tabular: bool,

    #[arg(long, value_enum)]
    pub format: Option<FormatKind>,

    /// Write results to FILE instead of stdout
    #[arg(short = 'o', long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// TOML settings file; command-line flags win over its values
    #[arg(long, value_name = "FILE", env = "IXQUERY_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// The settings file (if any) with command-line flags laid over it.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };

        if !self.index.is_empty() {
            settings.index = self.index.clone();
        }
        if self.output.is_some() {
            settings.output = self.output.clone();
        }

        let query = &mut settings.query;
        if !self.fields.is_empty() {
            query.fields = self.fields.clone();
        }
        if let Some(analyzer) = self.analyzer {
            query.analyzer = analyzer;
        }
        if self.query_field.is_some() {
            query.query_field = self.query_field.clone();
        }
        if self.output_limit.is_some() {
            query.output_limit = self.output_limit;
        }
        if self.query_limit.is_some() {
            query.query_limit = self.query_limit;
        }
        if self.regex.is_some() {
            query.regex = self.regex.clone();
        }
        query.show_id |= self.show_id;
        query.show_score |= self.show_score;
        query.show_hits |= self.show_hits;
        query.sort_fields |= self.sort_fields;
        query.suppress_names |= self.suppress_names;
        if self.tabular {
            query.format = FormatKind::Tabular;
        } else if let Some(format) = self.format {
            query.format = format;
        }

        Ok(settings)
    }
}

#[tracing::instrument(skip_all)]
pub fn start() -> ExitCode {
    let cli = Cli::parse();

    run(&cli).map_or_else(
        |e| {
            error!("ixquery failed: {}", e);
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
        |_| {
            info!("ixquery finished");
            ExitCode::SUCCESS
        },
    )
}

/// One full invocation: resolve settings, open the index, run the directive.
#[tracing::instrument(skip_all)]
pub fn run(cli: &Cli) -> Result<()> {
    let settings = cli.settings()?;
    debug!(?settings, "settings resolved");

    let mode = Mode::parse(&cli.query)?;
    if settings.index.is_empty() {
        return Err(Error::config("no index given; use -i/--index or `index` in the settings file"));
    }

    let index = IndexSet::open(&settings.index)?;
    let mut exec = QueryExecutor::new(&index, settings.query)?;

    match &settings.output {
        Some(path) => {
            let mut sink = BufWriter::new(File::create(path)?);
            mode::dispatch(&mut exec, &mode, &mut sink)?;
            sink.flush()?;
        }
        None => {
            let mut sink = io::stdout().lock();
            mode::dispatch(&mut exec, &mode, &mut sink)?;
            sink.flush()?;
        }
    }
    Ok(())
}

fn dir_must_exist(s: &str) -> std::result::Result<PathBuf, String> {
    let p = PathBuf::from(s);
    if !p.exists() {
        return Err(format!("Not found: {}", p.display()));
    }
    if !p.is_dir() {
        return Err(format!("Not a directory: {}", p.display()));
    }
    Ok(p)
}
