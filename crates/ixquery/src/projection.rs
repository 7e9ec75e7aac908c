// crates/ixquery/src/projection.rs

use std::collections::{HashMap, HashSet};

pub const ID_FIELD: &str = "<id>";
pub const SCORE_FIELD: &str = "<score>";

/// One stored value as it came out of the document store.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Binary(Vec<u8>),
    Absent,
}

impl RawValue {
    /// Textual values verbatim, binary as `0x` + lowercase hex, absent as `null`.
    pub fn render(&self) -> String {
        match self {
            RawValue::Text(s) => s.clone(),
            RawValue::Binary(bytes) => format!("0x{}", hex::encode(bytes)),
            RawValue::Absent => "null".to_string(),
        }
    }
}

/// Stored fields of one document in storage order. A name repeats once per
/// value of a multi-valued field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredDoc {
    pub fields: Vec<(String, RawValue)>,
}

impl StoredDoc {
    pub fn push(&mut self, name: impl Into<String>, value: RawValue) {
        self.fields.push((name.into(), value));
    }

    /// Rendered values of `name`, in storage order.
    pub fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = String> + 'a {
        self.fields
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v.render())
    }

    /// Field names in storage order, first occurrence wins.
    pub fn field_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.fields
            .iter()
            .filter(|(n, _)| seen.insert(n.as_str()))
            .map(|(n, _)| n.clone())
            .collect()
    }
}

/// The ordered field/value view handed to a formatter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    fields: Vec<String>,
    values: HashMap<String, Vec<String>>,
}

impl Projection {
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Values of `name`; empty when the document has none.
    pub fn get(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.values.values().all(Vec::is_empty)
    }
}

/// Builds projections with a fixed field policy.
#[derive(Debug, Clone, Default)]
pub struct Projector {
    selected: Vec<String>,
    show_id: bool,
    show_score: bool,
    sort: bool,
}

impl Projector {
    pub fn new(selected: &[String], show_id: bool, show_score: bool, sort: bool) -> Self {
        let mut seen = HashSet::new();
        let mut selected: Vec<String> = selected
            .iter()
            .filter(|f| seen.insert(f.as_str()))
            .cloned()
            .collect();
        if sort {
            selected.sort();
        }

        Self {
            selected,
            show_id,
            show_score,
            sort,
        }
    }

    /// The configured selection, or `None` when every stored field is wanted.
    pub fn selection(&self) -> Option<&[String]> {
        (!self.selected.is_empty()).then_some(self.selected.as_slice())
    }

    pub fn project(&self, doc: &StoredDoc, ordinal: u64, score: f32) -> Projection {
        let mut fields = self.synthetic_fields();
        let mut values: HashMap<String, Vec<String>> = HashMap::new();

        if self.show_id {
            values.insert(ID_FIELD.to_string(), vec![ordinal.to_string()]);
        }
        if self.show_score {
            values.insert(SCORE_FIELD.to_string(), vec![render_score(score)]);
        }

        let doc_fields = match self.selection() {
            Some(selected) => selected.to_vec(),
            None => doc.field_names(),
        };

        for name in &doc_fields {
            let vals: Vec<String> = doc.values(name).collect();
            if !vals.is_empty() {
                values.insert(name.clone(), vals);
            }
        }
        fields.extend(doc_fields);

        if self.sort {
            fields.sort();
        }

        Projection { fields, values }
    }

    fn synthetic_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        if self.show_id {
            fields.push(ID_FIELD.to_string());
        }
        if self.show_score {
            fields.push(SCORE_FIELD.to_string());
        }
        fields
    }
}

/// `{:?}` keeps a trailing `.0` on whole numbers, so the lookup sentinel
/// prints as `1.0`.
pub fn render_score(score: f32) -> String {
    format!("{score:?}")
}
