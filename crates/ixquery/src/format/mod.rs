// crates/ixquery/src/format/mod.rs

//! Output encodings for projections.
//!
//! A formatter is chosen once per run from [`FormatKind`]. It renders one
//! projection at a time; an empty string means "skip this document", in which
//! case the caller prints nothing for it and does not count it.

mod json;
mod multiline;
mod tabular;

pub use json::Json;
pub use multiline::Multiline;
pub use tabular::{Tabular, MULTI_VALUE_DELIMITER};

use crate::projection::Projection;
use crate::settings::FormatKind;

pub trait Formatter {
    fn format(&self, projection: &Projection) -> String;

    /// Line printed once before the first document of a query.
    fn header(&self, _fields: &[String]) -> Option<String> {
        None
    }

    /// Whether a blank line goes between successive documents.
    fn separates_documents(&self) -> bool {
        false
    }
}

pub fn build(kind: FormatKind, suppress_names: bool) -> Box<dyn Formatter> {
    match kind {
        FormatKind::Multiline => Box::new(Multiline::new(suppress_names)),
        FormatKind::Tabular => Box::new(Tabular::new(suppress_names)),
        FormatKind::Json => Box::new(Json::compact()),
        FormatKind::JsonPretty => Box::new(Json::pretty()),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::projection::{Projection, Projector, RawValue, StoredDoc};

    /// Projection of a doc with `title` = "Hello" and `tag` = ["a", "b"].
    pub fn sample(fields: &[&str]) -> Projection {
        let mut doc = StoredDoc::default();
        doc.push("title", RawValue::Text("Hello".into()));
        doc.push("tag", RawValue::Text("a".into()));
        doc.push("tag", RawValue::Text("b".into()));
        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
        Projector::new(&fields, false, false, false).project(&doc, 0, 1.0)
    }
}
