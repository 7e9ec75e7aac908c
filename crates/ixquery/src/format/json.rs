use super::Formatter;
use crate::projection::Projection;
use serde_json::{Map, Value as JsonValue};

/// One JSON object per document. Field names are always printed.
#[derive(Debug, Clone, Copy)]
pub struct Json {
    pretty: bool,
}

impl Json {
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    fn to_object(projection: &Projection) -> Map<String, JsonValue> {
        let mut obj = Map::new();
        for name in projection.fields() {
            let value = match projection.get(name) {
                [] => continue,
                [single] => JsonValue::String(single.clone()),
                many => JsonValue::Array(many.iter().cloned().map(JsonValue::String).collect()),
            };
            obj.insert(name.clone(), value);
        }
        obj
    }
}

impl Formatter for Json {
    fn format(&self, projection: &Projection) -> String {
        let obj = Self::to_object(projection);
        if obj.is_empty() {
            return String::new();
        }
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&obj)
        } else {
            serde_json::to_string(&obj)
        };
        // a map of strings always serializes
        rendered.unwrap_or_default()
    }
}
