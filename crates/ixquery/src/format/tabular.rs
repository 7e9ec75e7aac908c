use super::Formatter;
use crate::projection::Projection;

/// Joins the values of a multi-valued field inside one cell.
pub const MULTI_VALUE_DELIMITER: &str = "|";

/// Tab separated columns, one row per document. Needs a declared field list
/// so rows from heterogeneous documents line up.
#[derive(Debug, Clone, Copy)]
pub struct Tabular {
    suppress_names: bool,
}

impl Tabular {
    pub fn new(suppress_names: bool) -> Self {
        Self { suppress_names }
    }
}

impl Formatter for Tabular {
    fn format(&self, projection: &Projection) -> String {
        if projection.is_empty() {
            return String::new();
        }
        projection
            .fields()
            .iter()
            .map(|name| projection.get(name).join(MULTI_VALUE_DELIMITER))
            .collect::<Vec<_>>()
            .join("\t")
    }

    fn header(&self, fields: &[String]) -> Option<String> {
        (!self.suppress_names).then(|| fields.join("\t"))
    }
}
