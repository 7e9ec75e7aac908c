use super::Formatter;
use crate::projection::Projection;

/// `name: value`, one line per value.
#[derive(Debug, Clone, Copy)]
pub struct Multiline {
    suppress_names: bool,
}

impl Multiline {
    pub fn new(suppress_names: bool) -> Self {
        Self { suppress_names }
    }
}

impl Formatter for Multiline {
    fn format(&self, projection: &Projection) -> String {
        let mut lines = Vec::new();
        for name in projection.fields() {
            for value in projection.get(name) {
                if self.suppress_names {
                    lines.push(value.clone());
                } else {
                    lines.push(format!("{name}: {value}"));
                }
            }
        }
        lines.join("\n")
    }

    fn separates_documents(&self) -> bool {
        true
    }
}
