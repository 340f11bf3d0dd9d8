use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::condition::Condition;
use crate::error::FilterError;

/// A set of per-field conditions, all of which must hold for a record
/// to match. Used both as a clause inside a filter statement and as the
/// nested document of a `FIND`/`NFIND` condition.
///
/// Field ids keep insertion order; `field_ids` and the serialized key
/// order are stable across a round-trip.
///
/// On the wire, a literal `.` in a field id would read as a nested-path
/// separator, so dots are rewritten to `/` when serializing and back
/// when deserializing. The rewrite is a one-way heuristic: a field id
/// containing a literal `/` comes back with `.` in its place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    fields: IndexMap<String, Condition>,
}

impl Query {
    pub fn new() -> Query {
        Query::default()
    }

    /// Create a query with one condition already set.
    pub fn with(field_id: impl Into<String>, condition: Condition) -> Query {
        let mut query = Query::new();
        query.field(field_id, condition);
        query
    }

    /// Set or overwrite the condition on a field. Chainable.
    pub fn field(&mut self, field_id: impl Into<String>, condition: Condition) -> &mut Query {
        self.fields.insert(field_id.into(), condition);
        self
    }

    /// Field ids with a condition set, in insertion order.
    pub fn field_ids(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn field_condition(&self, field_id: &str) -> Option<&Condition> {
        self.fields.get(field_id)
    }

    /// Remove the condition on a field. Idempotent; chainable.
    pub fn remove_field_condition(&mut self, field_id: &str) -> &mut Query {
        self.fields.shift_remove(field_id);
        self
    }

    /// Apply `map_fn` to every field/condition pair, in `field_ids`
    /// order.
    pub fn map_field_conditions<T>(&self, mut map_fn: impl FnMut(&str, &Condition) -> T) -> Vec<T> {
        self.fields
            .iter()
            .map(|(field_id, condition)| map_fn(field_id, condition))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Serialize to a field-id to condition mapping, escaping dotted
    /// field ids.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (field_id, condition) in &self.fields {
            map.insert(escape_field_id(field_id), condition.to_json());
        }
        Value::Object(map)
    }

    /// Parse the wire mapping, unescaping field ids. All-or-nothing: a
    /// bad condition fails the whole query.
    pub fn from_json(json: &Value) -> Result<Query, FilterError> {
        let obj = json
            .as_object()
            .ok_or_else(|| FilterError::InvalidQuery("expected an object".into()))?;
        let mut query = Query::new();
        for (field_id, condition) in obj {
            query.field(unescape_field_id(field_id), Condition::from_json(condition)?);
        }
        Ok(query)
    }
}

fn escape_field_id(field_id: &str) -> String {
    field_id.replace('.', "/")
}

fn unescape_field_id(field_id: &str) -> String {
    field_id.replace('/', ".")
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Query {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Query::from_json(&value).map_err(D::Error::custom)
    }
}
