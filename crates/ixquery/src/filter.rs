// crates/ixquery/src/filter.rs

use crate::error::{Error, Result};
use crate::projection::StoredDoc;
use regex::Regex;

/// Per-document acceptance test on one field.
#[derive(Debug, Clone)]
pub struct RegexFilter {
    field: String,
    pattern: Regex,
}

impl RegexFilter {
    /// Build a filter whose pattern must match a whole value, not a substring.
    pub fn new(field: impl Into<String>, pattern: &str) -> Result<Self> {
        let anchored = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(Self {
            field: field.into(),
            pattern: anchored,
        })
    }

    /// Parse the `field:/regex/` option form.
    pub fn parse(text: &str) -> Result<Self> {
        let (field, rest) = text
            .split_once(":/")
            .ok_or_else(|| Error::config("invalid regex, should be field:/regex/"))?;
        let pattern = rest
            .strip_suffix('/')
            .ok_or_else(|| Error::config("invalid regex, should be field:/regex/"))?;
        if field.is_empty() {
            return Err(Error::config("invalid regex, field name is empty"));
        }
        Self::new(field, pattern)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// True when at least one value of the field fully matches.
    pub fn accepts(&self, doc: &StoredDoc) -> bool {
        doc.values(&self.field).any(|v| self.pattern.is_match(&v))
    }
}

/// Applies an optional filter; no filter accepts everything.
pub fn passes(filter: Option<&RegexFilter>, doc: &StoredDoc) -> bool {
    filter.map_or(true, |f| f.accepts(doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::RawValue;

    fn doc_with(field: &str, values: &[&str]) -> StoredDoc {
        let mut doc = StoredDoc::default();
        doc.push("other", RawValue::Text("zzz".into()));
        for v in values {
            doc.push(field, RawValue::Text((*v).into()));
        }
        doc
    }

    #[test]
    fn parse_splits_field_and_pattern() {
        let f = RegexFilter::parse("title:/ab+c/").unwrap();
        assert_eq!(f.field(), "title");
        assert!(f.accepts(&doc_with("title", &["abbbc"])));
    }

    #[test]
    fn parse_keeps_slashes_and_colons_inside_pattern() {
        let f = RegexFilter::parse("url:/https?://x\\.org/.*/").unwrap();
        assert_eq!(f.field(), "url");
        assert!(f.accepts(&doc_with("url", &["http://x.org/a/b"])));
    }

    #[test]
    fn parse_rejects_malformed_specs() {
        for bad in ["title", "title:abc", "title:/abc", ":/abc/"] {
            let err = RegexFilter::parse(bad).unwrap_err();
            assert!(err.is_config(), "{bad}: unexpected error {err:?}");
        }
    }

    #[test]
    fn parse_reports_bad_pattern_as_regex_error() {
        let err = RegexFilter::parse("title:/(unclosed/").unwrap_err();
        assert!(matches!(err, Error::Regex(_)));
    }

    #[test]
    fn match_is_full_value_not_substring() {
        let f = RegexFilter::new("title", "ell").unwrap();
        assert!(!f.accepts(&doc_with("title", &["hello"])));
        let f = RegexFilter::new("title", "h.*o").unwrap();
        assert!(f.accepts(&doc_with("title", &["hello"])));
    }

    #[test]
    fn alternation_is_anchored_as_a_whole() {
        let f = RegexFilter::new("title", "a|b").unwrap();
        assert!(f.accepts(&doc_with("title", &["b"])));
        assert!(!f.accepts(&doc_with("title", &["ab"])));
    }

    #[test]
    fn any_value_of_a_multi_valued_field_may_match() {
        let f = RegexFilter::new("tag", "b").unwrap();
        assert!(f.accepts(&doc_with("tag", &["a", "b"])));
        assert!(!f.accepts(&doc_with("tag", &["a", "c"])));
        assert!(!f.accepts(&doc_with("tag", &[])));
    }

    #[test]
    fn no_filter_passes_everything() {
        assert!(passes(None, &StoredDoc::default()));
    }

    #[test]
    fn filtering_is_idempotent() {
        let f = RegexFilter::new("tag", "[ab]").unwrap();
        let docs = vec![
            doc_with("tag", &["a"]),
            doc_with("tag", &["c"]),
            doc_with("tag", &["c", "b"]),
            doc_with("tag", &[]),
        ];
        let once: Vec<&StoredDoc> = docs.iter().filter(|d| passes(Some(&f), d)).collect();
        let twice: Vec<&StoredDoc> = once
            .iter()
            .copied()
            .filter(|d| passes(Some(&f), d))
            .collect();
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }
}
