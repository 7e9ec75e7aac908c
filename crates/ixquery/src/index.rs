// crates/ixquery/src/index.rs

//! Read-only logical view over one or more tantivy indexes.
//!
//! Documents are addressed by a global ordinal: indexes are laid end to end
//! in the order they were opened, segments in searcher order within each
//! index, and the ordinal is the segment's base plus the local doc id.

use crate::error::{Error, Result};
use crate::projection::{RawValue, StoredDoc};
use crate::settings::Analyzer;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::Path;
use std::sync::LazyLock;
use tantivy::directory::MmapDirectory;
use tantivy::query::{AllQuery, EnableScoring, Query, QueryParser, QueryParserError, Scorer, Weight};
use tantivy::schema::document::{OwnedValue, TantivyDocument};
use tantivy::schema::{Field, FieldType, IndexRecordOption, Schema, Value};
use tantivy::tokenizer::{RawTokenizer, TokenizerManager};
use tantivy::{
    DocAddress, DocId, DocSet, Document, Index, IndexReader, ReloadPolicy, Score, Searcher,
    SegmentReader, TERMINATED,
};
use tracing::{debug, info};

/// `name:` at the start of a clause.
static QUALIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[\s(+\-!])([A-Za-z_][A-Za-z0-9_.\-]*):"#).expect("valid qualifier regex")
});

/// Every field name known to any opened index. Built once at open time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldUniverse(BTreeSet<String>);

impl FieldUniverse {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Field names in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Fail with every unknown name at once.
    pub fn validate<I, S>(&self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let invalid: Vec<String> = names
            .into_iter()
            .filter(|n| !self.contains(n.as_ref()))
            .map(|n| n.as_ref().to_string())
            .collect();
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(Error::config(format!("invalid field names: {invalid:?}")))
        }
    }

    pub fn validate_one(&self, name: &str) -> Result<()> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(Error::config(format!("invalid field name: {name}")))
        }
    }

    /// `a.b` resolves to JSON field `a` when `a.b` itself is not a field.
    fn accepts_qualifier(&self, qualifier: &str) -> bool {
        self.contains(qualifier) || self.contains(qualifier_root(qualifier))
    }
}

impl FromIterator<String> for FieldUniverse {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn qualifier_root(qualifier: &str) -> &str {
    qualifier.split('.').next().unwrap_or(qualifier)
}

/// Field qualifiers referenced by a query string, ignoring quoted phrases
/// and escaped colons.
pub fn field_qualifiers(text: &str) -> BTreeSet<String> {
    let mut unquoted = String::with_capacity(text.len());
    let mut in_quotes = false;
    let mut escaped = false;
    for c in text.chars() {
        if escaped {
            escaped = false;
            unquoted.push(if in_quotes { ' ' } else { '_' });
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                unquoted.push(' ');
            }
            '"' => {
                in_quotes = !in_quotes;
                unquoted.push(' ');
            }
            _ if in_quotes => unquoted.push(' '),
            _ => unquoted.push(c),
        }
    }

    QUALIFIER
        .captures_iter(&unquoted)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// A parsed query, one per physical index. Clauses naming a field an index
/// does not have are dropped from that index's query only.
pub struct Predicate {
    queries: Vec<Box<dyn Query>>,
}

/// Position of one document in the logical view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocRef {
    part: usize,
    address: DocAddress,
    pub ordinal: u64,
}

struct Physical {
    index: Index,
    schema: Schema,
    searcher: Searcher,
    _reader: IndexReader,
    segment_bases: Vec<u64>,
}

impl Physical {
    fn query_parser(&self, default_fields: Vec<Field>, analyzer: Analyzer) -> QueryParser {
        match analyzer {
            Analyzer::Standard => QueryParser::for_index(&self.index, default_fields),
            Analyzer::Keyword => QueryParser::new(
                self.schema.clone(),
                default_fields,
                keyword_tokenizers(&self.schema),
            ),
        }
    }

    fn doc_ref(&self, part: usize, segment: usize, doc: DocId) -> DocRef {
        DocRef {
            part,
            address: DocAddress::new(segment as u32, doc),
            ordinal: self.segment_bases[segment] + u64::from(doc),
        }
    }
}

/// Maps every text tokenizer used by the schema to the raw tokenizer, so
/// query values stay single exact terms.
fn keyword_tokenizers(schema: &Schema) -> TokenizerManager {
    let manager = TokenizerManager::default();
    for (_, entry) in schema.fields() {
        let indexing = match entry.field_type() {
            FieldType::Str(opts) => opts.get_indexing_options(),
            FieldType::JsonObject(opts) => opts.get_text_indexing_options(),
            _ => None,
        };
        if let Some(indexing) = indexing {
            manager.register(indexing.tokenizer(), RawTokenizer::default());
        }
    }
    manager
}

/// The logical index. Opened once, never mutated.
pub struct IndexSet {
    parts: Vec<Physical>,
    universe: FieldUniverse,
}

impl IndexSet {
    /// Open each directory read-only and concatenate them.
    #[tracing::instrument(skip_all)]
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut indexes = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            if !path.is_dir() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("index directory not found: {}", path.display()),
                )));
            }
            let directory = MmapDirectory::open(path)?;
            indexes.push(Index::open(directory)?);
            info!("opened index at {}", path.display());
        }
        Self::from_indexes(indexes)
    }

    pub fn from_indexes(indexes: Vec<Index>) -> Result<Self> {
        if indexes.is_empty() {
            return Err(Error::config("at least one index is required"));
        }

        let mut parts = Vec::with_capacity(indexes.len());
        let mut names = BTreeSet::new();
        let mut next_base = 0u64;

        for index in indexes {
            let reader: IndexReader = index
                .reader_builder()
                .reload_policy(ReloadPolicy::Manual)
                .try_into()?;
            let searcher = reader.searcher();
            let schema = index.schema();
            names.extend(schema.fields().map(|(_, entry)| entry.name().to_string()));

            let mut segment_bases = Vec::with_capacity(searcher.segment_readers().len());
            for segment in searcher.segment_readers() {
                segment_bases.push(next_base);
                next_base += u64::from(segment.max_doc());
            }

            parts.push(Physical {
                index,
                schema,
                searcher,
                _reader: reader,
                segment_bases,
            });
        }

        debug!("logical index spans {next_base} document slots");
        Ok(Self {
            parts,
            universe: names.into_iter().collect(),
        })
    }

    pub fn universe(&self) -> &FieldUniverse {
        &self.universe
    }

    pub fn match_all(&self) -> Predicate {
        Predicate {
            queries: self
                .parts
                .iter()
                .map(|_| Box::new(AllQuery) as Box<dyn Query>)
                .collect(),
        }
    }

    /// Parse `text` against every index. Unknown field qualifiers are all
    /// reported in one configuration error before the parser runs.
    #[tracing::instrument(skip(self))]
    pub fn parse(
        &self,
        text: &str,
        default_field: Option<&str>,
        analyzer: Analyzer,
    ) -> Result<Predicate> {
        if default_field.is_none() && !text.contains(':') {
            return Err(Error::config(
                "query has no ':' and no query-field defined",
            ));
        }

        let qualifiers = field_qualifiers(text);
        let unknown: Vec<&String> = qualifiers
            .iter()
            .filter(|q| !self.universe.accepts_qualifier(q))
            .collect();
        if !unknown.is_empty() {
            return Err(Error::config(format!("invalid field names: {unknown:?}")));
        }

        let mut queries = Vec::with_capacity(self.parts.len());
        for (ord, part) in self.parts.iter().enumerate() {
            let default_fields: Vec<Field> = default_field
                .and_then(|name| part.schema.get_field(name).ok())
                .into_iter()
                .collect();
            let parser = part.query_parser(default_fields, analyzer);

            let query = match parser.parse_query(text) {
                Ok(query) => query,
                Err(e) if absent_from_part(&e, default_field) => {
                    // keep the clauses this index can answer
                    let (query, errors) = parser.parse_query_lenient(text);
                    for e in errors {
                        match e {
                            QueryParserError::FieldDoesNotExist(name)
                                if !self.universe.accepts_qualifier(&name) =>
                            {
                                return Err(Error::config(format!("invalid field name: {name}")));
                            }
                            e if absent_from_part(&e, default_field) => {}
                            e => return Err(e.into()),
                        }
                    }
                    debug!("index {ord} lacks some queried fields; their clauses are dropped");
                    query
                }
                Err(e) => return Err(e.into()),
            };
            queries.push(query);
        }

        Ok(Predicate { queries })
    }

    /// Lazily walk matching documents in index order.
    pub fn search(&self, predicate: &Predicate) -> Result<Hits<'_>> {
        let mut weights = Vec::with_capacity(self.parts.len());
        for (part, query) in self.parts.iter().zip(&predicate.queries) {
            weights.push(query.weight(EnableScoring::enabled_from_searcher(&part.searcher))?);
        }

        Ok(Hits {
            set: self,
            weights,
            part: 0,
            segment: 0,
            scorer: None,
            positioned: true,
        })
    }

    /// Locate the live document at a global ordinal.
    pub fn resolve(&self, ordinal: u64) -> Result<DocRef> {
        for (ord, part) in self.parts.iter().enumerate() {
            for (segment, base) in part.segment_bases.iter().enumerate() {
                let reader = part.searcher.segment_reader(segment as u32);
                let end = base + u64::from(reader.max_doc());
                if (*base..end).contains(&ordinal) {
                    let doc = (ordinal - base) as DocId;
                    if !is_alive(reader, doc) {
                        return Err(Error::config(format!("document {ordinal} is deleted")));
                    }
                    return Ok(part.doc_ref(ord, segment, doc));
                }
            }
        }
        Err(Error::config(format!("no document with id {ordinal}")))
    }

    /// Stored fields of a document in storage order, optionally restricted
    /// to `subset`.
    pub fn fetch(&self, at: &DocRef, subset: Option<&[String]>) -> Result<StoredDoc> {
        let part = &self.parts[at.part];
        let retrieved: TantivyDocument = part.searcher.doc(at.address)?;

        let mut doc = StoredDoc::default();
        for (field, value) in retrieved.iter_fields_and_values() {
            let name = part.schema.get_field_name(field);
            if subset.is_some_and(|wanted| !wanted.iter().any(|w| w == name)) {
                continue;
            }
            doc.push(name, raw_value(OwnedValue::from(value.as_value())));
        }
        Ok(doc)
    }

    /// term -> document frequency for `field`, summed over every segment of
    /// every index.
    #[tracing::instrument(skip(self))]
    pub fn term_counts(&self, field: &str) -> Result<BTreeMap<String, u64>> {
        self.universe.validate_one(field)?;

        let mut counts = BTreeMap::new();
        let mut indexed = false;

        for part in &self.parts {
            let Ok(f) = part.schema.get_field(field) else {
                continue;
            };
            let entry = part.schema.get_field_entry(f);
            if !entry.is_indexed() {
                continue;
            }

            for reader in part.searcher.segment_readers() {
                let inverted = reader.inverted_index(f)?;
                let dictionary = inverted.terms();
                if dictionary.num_terms() == 0 {
                    continue;
                }
                indexed = true;

                let mut stream = dictionary.stream()?;
                while stream.advance() {
                    let term = render_term(entry.field_type(), stream.key());
                    *counts.entry(term).or_insert(0) += u64::from(stream.value().doc_freq);
                }
            }
        }

        if !indexed {
            return Err(Error::config(format!("unindexed field: {field}")));
        }
        Ok(counts)
    }

    /// Number of live documents holding `field`, summed over segments.
    pub fn field_doc_count(&self, field: &str) -> Result<u64> {
        let mut total = 0u64;
        for part in &self.parts {
            let Ok(f) = part.schema.get_field(field) else {
                continue;
            };
            let entry = part.schema.get_field_entry(f);
            for (segment, reader) in part.searcher.segment_readers().iter().enumerate() {
                total += if entry.is_indexed() {
                    posting_doc_count(reader, f)?
                } else if entry.is_stored() {
                    stored_doc_count(&part.searcher, segment as u32, reader, f)?
                } else {
                    0
                };
            }
        }
        Ok(total)
    }
}

/// Errors a field-complete index would not raise: the field exists in the
/// logical view (checked up front) but not in this physical index.
fn absent_from_part(err: &QueryParserError, default_field: Option<&str>) -> bool {
    match err {
        QueryParserError::FieldDoesNotExist(_) => true,
        QueryParserError::NoDefaultFieldDeclared => default_field.is_some(),
        _ => false,
    }
}

fn is_alive(reader: &SegmentReader, doc: DocId) -> bool {
    reader
        .alive_bitset()
        .map_or(true, |alive| alive.is_alive(doc))
}

fn posting_doc_count(reader: &SegmentReader, field: Field) -> Result<u64> {
    let inverted = reader.inverted_index(field)?;
    let mut seen = vec![false; reader.max_doc() as usize];

    let mut stream = inverted.terms().stream()?;
    while stream.advance() {
        let mut postings =
            inverted.read_postings_from_terminfo(stream.value(), IndexRecordOption::Basic)?;
        let mut doc = postings.doc();
        while doc != TERMINATED {
            seen[doc as usize] = true;
            doc = postings.advance();
        }
    }

    Ok(seen
        .iter()
        .enumerate()
        .filter(|(doc, hit)| **hit && is_alive(reader, *doc as DocId))
        .count() as u64)
}

fn stored_doc_count(
    searcher: &Searcher,
    segment: u32,
    reader: &SegmentReader,
    field: Field,
) -> Result<u64> {
    let mut count = 0;
    for doc in reader.doc_ids_alive() {
        let stored: TantivyDocument = searcher.doc(DocAddress::new(segment, doc))?;
        if stored.get_first(field).is_some() {
            count += 1;
        }
    }
    Ok(count)
}

fn raw_value(value: OwnedValue) -> RawValue {
    match value {
        OwnedValue::Null => RawValue::Absent,
        OwnedValue::Str(s) => RawValue::Text(s),
        OwnedValue::PreTokStr(p) => RawValue::Text(p.text),
        OwnedValue::Bytes(b) => RawValue::Binary(b),
        OwnedValue::U64(n) => RawValue::Text(n.to_string()),
        OwnedValue::I64(n) => RawValue::Text(n.to_string()),
        OwnedValue::F64(n) => RawValue::Text(n.to_string()),
        OwnedValue::Bool(b) => RawValue::Text(b.to_string()),
        OwnedValue::Facet(f) => RawValue::Text(f.to_string()),
        // dates, ip addresses, nested JSON
        other => match serde_json::to_value(&other) {
            Ok(JsonValue::String(s)) => RawValue::Text(s),
            Ok(json) => RawValue::Text(json.to_string()),
            Err(_) => RawValue::Text(format!("{other:?}")),
        },
    }
}

/// Term dictionary keys are raw bytes; numeric fields store them as
/// big-endian order-preserving u64.
fn render_term(field_type: &FieldType, bytes: &[u8]) -> String {
    let as_u64 = || <[u8; 8]>::try_from(bytes).ok().map(u64::from_be_bytes);
    let rendered = match field_type {
        FieldType::Str(_) => Some(String::from_utf8_lossy(bytes).into_owned()),
        FieldType::U64(_) => as_u64().map(|v| v.to_string()),
        FieldType::I64(_) => as_u64().map(|v| tantivy::u64_to_i64(v).to_string()),
        FieldType::F64(_) => as_u64().map(|v| tantivy::u64_to_f64(v).to_string()),
        FieldType::Bool(_) => as_u64().map(|v| (v != 0).to_string()),
        _ => None,
    };
    rendered.unwrap_or_else(|| format!("0x{}", hex::encode(bytes)))
}

/// Matching documents, produced one segment at a time.
///
/// Scoring is deferred: [`Hits::score`] computes the score of the document
/// last returned, only when asked.
pub struct Hits<'a> {
    set: &'a IndexSet,
    weights: Vec<Box<dyn Weight>>,
    part: usize,
    segment: usize,
    scorer: Option<Box<dyn Scorer>>,
    /// The scorer still sits on a document not yet handed out.
    positioned: bool,
}

impl Hits<'_> {
    /// Score of the most recently returned document.
    pub fn score(&mut self) -> Score {
        self.scorer.as_mut().map_or(0.0, |scorer| scorer.score())
    }
}

impl Iterator for Hits<'_> {
    type Item = Result<DocRef>;

    fn next(&mut self) -> Option<Self::Item> {
        let set = self.set;
        loop {
            let physical = set.parts.get(self.part)?;

            if let Some(scorer) = self.scorer.as_mut() {
                let doc = if self.positioned {
                    self.positioned = false;
                    scorer.doc()
                } else {
                    scorer.advance()
                };
                if doc == TERMINATED {
                    self.scorer = None;
                    self.segment += 1;
                    continue;
                }

                let reader = physical.searcher.segment_reader(self.segment as u32);
                if !is_alive(reader, doc) {
                    continue;
                }
                return Some(Ok(physical.doc_ref(self.part, self.segment, doc)));
            }

            if self.segment >= physical.searcher.segment_readers().len() {
                self.part += 1;
                self.segment = 0;
                continue;
            }

            let reader = physical.searcher.segment_reader(self.segment as u32);
            match self.weights[self.part].scorer(reader, 1.0) {
                Ok(scorer) => {
                    self.scorer = Some(scorer);
                    self.positioned = true;
                }
                Err(e) => {
                    self.part = set.parts.len();
                    return Some(Err(e.into()));
                }
            }
        }
    }
}
