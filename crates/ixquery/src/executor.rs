// crates/ixquery/src/executor.rs

use crate::error::{Error, Result};
use crate::filter::{self, RegexFilter};
use crate::format::{self, Formatter};
use crate::index::IndexSet;
use crate::projection::{Projection, Projector};
use crate::settings::{FormatKind, QuerySettings};
use std::io::Write;
use tracing::{debug, info};

/// Counts for one finished query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Every predicate match, regardless of limit or regex filter.
    pub total_hits: u64,
    /// Documents actually written.
    pub printed: usize,
}

/// Runs queries against a shared index with one validated configuration.
pub struct QueryExecutor<'a> {
    index: &'a IndexSet,
    settings: QuerySettings,
    projector: Projector,
    filter: Option<RegexFilter>,
    formatter: Box<dyn Formatter>,
    printed: usize,
}

impl<'a> QueryExecutor<'a> {
    /// Validate `settings` against the index's field universe.
    #[tracing::instrument(skip_all)]
    pub fn new(index: &'a IndexSet, settings: QuerySettings) -> Result<Self> {
        let universe = index.universe();
        universe.validate(&settings.fields)?;

        if let Some(field) = &settings.query_field {
            universe.validate_one(field)?;
        }

        if settings.format == FormatKind::Tabular && settings.fields.is_empty() {
            // documents can differ in fields, so columns need a declared list
            return Err(Error::config("tabular format requires an explicit field list"));
        }

        let filter = settings
            .regex
            .as_deref()
            .map(RegexFilter::parse)
            .transpose()?;
        if let Some(filter) = &filter {
            universe.validate_one(filter.field())?;
            if !settings.fields.is_empty() && !settings.fields.iter().any(|f| f == filter.field()) {
                return Err(Error::config(format!(
                    "attempted to apply regex to field not in results: {}",
                    filter.field()
                )));
            }
        }

        let projector = Projector::new(
            &settings.fields,
            settings.show_id,
            settings.show_score,
            settings.sort_fields,
        );
        let formatter = format::build(settings.format, settings.suppress_names);
        debug!(format = ?settings.format, limit = settings.limit(), "executor configured");

        Ok(Self {
            index,
            settings,
            projector,
            filter,
            formatter,
            printed: 0,
        })
    }

    pub fn index(&self) -> &'a IndexSet {
        self.index
    }

    /// Documents written by the current (or last) invocation.
    pub fn printed(&self) -> usize {
        self.printed
    }

    pub(crate) fn projector(&self) -> &Projector {
        &self.projector
    }

    /// Start a new top-level invocation.
    pub(crate) fn begin(&mut self) {
        self.printed = 0;
    }

    /// Format one projection into `out`. Returns false when the formatter
    /// had nothing to print.
    pub(crate) fn emit(&mut self, projection: &Projection, out: &mut dyn Write) -> Result<bool> {
        let text = self.formatter.format(projection);
        if text.is_empty() {
            return Ok(false);
        }

        if self.printed == 0 {
            if let Some(header) = self.formatter.header(projection.fields()) {
                writeln!(out, "{header}")?;
            }
        } else if self.formatter.separates_documents() {
            writeln!(out)?;
        }

        writeln!(out, "{text}")?;
        self.printed += 1;
        Ok(true)
    }

    /// Run one query; `None` matches every document.
    ///
    /// Parsing and validation finish before the first byte is written, so a
    /// rejected query prints nothing. Documents then stream straight to `out`.
    #[tracing::instrument(skip(self, out))]
    pub fn run_query(&mut self, query: Option<&str>, out: &mut dyn Write) -> Result<QueryStats> {
        self.begin();

        let predicate = match query {
            None => self.index.match_all(),
            Some(text) => self.index.parse(
                text,
                self.settings.query_field.as_deref(),
                self.settings.analyzer,
            )?,
        };

        let limit = self.settings.limit();
        let mut total_hits = 0u64;
        let mut hits = self.index.search(&predicate)?;

        while let Some(at) = hits.next() {
            let at = at?;
            total_hits += 1;
            if self.printed >= limit {
                continue;
            }

            let doc = self.index.fetch(&at, self.projector.selection())?;
            if !filter::passes(self.filter.as_ref(), &doc) {
                continue;
            }
            let score = if self.settings.show_score {
                hits.score()
            } else {
                0.0
            };
            let projection = self.projector.project(&doc, at.ordinal, score);
            self.emit(&projection, out)?;
        }

        if self.settings.show_hits {
            writeln!(out, "totalHits: {total_hits}")?;
            writeln!(out)?;
        }

        info!(total_hits, printed = self.printed, "query finished");

        Ok(QueryStats {
            total_hits,
            printed: self.printed,
        })
    }
}
