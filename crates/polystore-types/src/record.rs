//! The uniform row representation returned by backend adapters.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A fetched row or document as an ordered list of named field values.
///
/// Adapters decode backend rows into this shape; callers that want typed
/// structs map from it themselves. The engine only reads individual fields
/// (to build cursors), never the whole payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record(pub Vec<(String, Value)>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Get a field value by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.iter().find(|(name, _)| name == field).map(|(_, v)| v)
    }

    /// Append a field.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.push((name.into(), value.into()));
    }

    /// Keep only the listed fields, preserving the requested order.
    pub fn project(&self, fields: &[String]) -> Record {
        let mut out = Vec::with_capacity(fields.len());
        for name in fields {
            if let Some(value) = self.get(name) {
                out.push((name.clone(), value.clone()));
            }
        }
        Record(out)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_push() {
        let mut rec = Record::new();
        rec.push("name", "Alice");
        rec.push("age", 30i64);

        assert_eq!(rec.get("name"), Some(&Value::String("Alice".into())));
        assert_eq!(rec.get("age"), Some(&Value::Int64(30)));
        assert_eq!(rec.get("missing"), None);
    }

    #[test]
    fn test_project() {
        let mut rec = Record::new();
        rec.push("id", 1i64);
        rec.push("name", "Alice");
        rec.push("email", "alice@example.com");

        let sub = rec.project(&["email".into(), "id".into()]);
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.0[0].0, "email");
        assert_eq!(sub.0[1].0, "id");
    }
}
