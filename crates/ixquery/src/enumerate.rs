// crates/ixquery/src/enumerate.rs

//! Index introspection: field names, per-field document counts, and the
//! term dictionary of a single field.

use crate::error::Result;
use crate::index::IndexSet;
use std::io::Write;

/// One line per field, lexical order.
pub fn enumerate_fields(index: &IndexSet, out: &mut dyn Write) -> Result<()> {
    for field in index.universe().iter() {
        writeln!(out, "{field}")?;
    }
    Ok(())
}

/// `field: count` for every field, where count is the number of live
/// documents holding at least one value for it.
#[tracing::instrument(skip_all)]
pub fn count_fields(index: &IndexSet, out: &mut dyn Write) -> Result<()> {
    let counts = index
        .universe()
        .iter()
        .map(|field| -> Result<(&str, u64)> { Ok((field, index.field_doc_count(field)?)) })
        .collect::<Result<Vec<_>>>()?;

    for (field, count) in counts {
        writeln!(out, "{field}: {count}")?;
    }
    Ok(())
}

/// `term (docFreq)` for each distinct term of `field`, byte order.
pub fn enumerate_terms(index: &IndexSet, field: &str, out: &mut dyn Write) -> Result<()> {
    for (term, count) in index.term_counts(field)? {
        writeln!(out, "{term} ({count})")?;
    }
    Ok(())
}
