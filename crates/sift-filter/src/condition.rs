use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};

use crate::error::FilterError;
use crate::query::Query;

/// A single constraint on a field.
///
/// The wire form is `{ "op": <tag>, "value": <value> }` and the value
/// shape is fixed by the operator tag: an array of child conditions for
/// `ALL`/`ANY`, an arbitrary scalar for the equality and order operators
/// (including structured comparison tokens such as `{"daysAgo": 5}`,
/// which are interpreted by the query engine), a string for `PREFIX`,
/// and a nested query document for `FIND`/`NFIND`.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    // Match: logical combination over child conditions
    All(Vec<Condition>),
    Any(Vec<Condition>),
    // Equality: `Eq(Value::Null)` means "field unset"
    Eq(Value),
    Neq(Value),
    // Order
    Lt(Value),
    Gt(Value),
    Lte(Value),
    Gte(Value),
    // String
    Prefix(String),
    // Existence of an element matching the nested query in an
    // array-valued field
    Find(Query),
    NFind(Query),
}

impl Condition {
    /// Wire tag for this condition's operator.
    pub fn op(&self) -> &'static str {
        match self {
            Condition::All(_) => "ALL",
            Condition::Any(_) => "ANY",
            Condition::Eq(_) => "EQ",
            Condition::Neq(_) => "NEQ",
            Condition::Lt(_) => "LT",
            Condition::Gt(_) => "GT",
            Condition::Lte(_) => "LTE",
            Condition::Gte(_) => "GTE",
            Condition::Prefix(_) => "PREFIX",
            Condition::Find(_) => "FIND",
            Condition::NFind(_) => "NFIND",
        }
    }

    /// Serialize to the wire form. Child conditions and nested queries
    /// are serialized recursively.
    pub fn to_json(&self) -> Value {
        let value = match self {
            Condition::All(children) | Condition::Any(children) => {
                Value::Array(children.iter().map(Condition::to_json).collect())
            }
            Condition::Eq(value)
            | Condition::Neq(value)
            | Condition::Lt(value)
            | Condition::Gt(value)
            | Condition::Lte(value)
            | Condition::Gte(value) => value.clone(),
            Condition::Prefix(prefix) => Value::String(prefix.clone()),
            Condition::Find(query) | Condition::NFind(query) => query.to_json(),
        };
        json!({ "op": self.op(), "value": value })
    }

    /// Parse the wire form, dispatching on the `op` tag.
    ///
    /// This is the single schema-validation point for condition wire
    /// data: an unrecognized operator tag is rejected, never passed
    /// through. Parsing is all-or-nothing; a bad child condition fails
    /// the whole document.
    pub fn from_json(json: &Value) -> Result<Condition, FilterError> {
        let obj = json
            .as_object()
            .ok_or_else(|| FilterError::InvalidCondition("expected an object".into()))?;
        let op = obj
            .get("op")
            .and_then(Value::as_str)
            .ok_or_else(|| FilterError::InvalidCondition("missing op tag".into()))?;
        let value = obj.get("value").unwrap_or(&Value::Null);

        match op {
            "ALL" => Ok(Condition::All(condition_array(value)?)),
            "ANY" => Ok(Condition::Any(condition_array(value)?)),
            "EQ" => Ok(Condition::Eq(value.clone())),
            "NEQ" => Ok(Condition::Neq(value.clone())),
            "LT" => Ok(Condition::Lt(value.clone())),
            "GT" => Ok(Condition::Gt(value.clone())),
            "LTE" => Ok(Condition::Lte(value.clone())),
            "GTE" => Ok(Condition::Gte(value.clone())),
            "PREFIX" => match value {
                Value::String(prefix) => Ok(Condition::Prefix(prefix.clone())),
                _ => Err(FilterError::InvalidCondition(
                    "PREFIX value must be a string".into(),
                )),
            },
            "FIND" => Ok(Condition::Find(Query::from_json(value)?)),
            "NFIND" => Ok(Condition::NFind(Query::from_json(value)?)),
            other => Err(FilterError::UnknownOperation(other.to_string())),
        }
    }
}

fn condition_array(value: &Value) -> Result<Vec<Condition>, FilterError> {
    match value {
        Value::Array(items) => items.iter().map(Condition::from_json).collect(),
        _ => Err(FilterError::InvalidCondition(
            "ALL/ANY value must be an array".into(),
        )),
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Condition::from_json(&value).map_err(D::Error::custom)
    }
}

// ── Constructor helpers ─────────────────────────────────────────

pub fn eq(value: impl Into<Value>) -> Condition {
    Condition::Eq(value.into())
}

pub fn neq(value: impl Into<Value>) -> Condition {
    Condition::Neq(value.into())
}

pub fn lt(value: impl Into<Value>) -> Condition {
    Condition::Lt(value.into())
}

pub fn gt(value: impl Into<Value>) -> Condition {
    Condition::Gt(value.into())
}

pub fn lte(value: impl Into<Value>) -> Condition {
    Condition::Lte(value.into())
}

pub fn gte(value: impl Into<Value>) -> Condition {
    Condition::Gte(value.into())
}

pub fn prefix(value: impl Into<String>) -> Condition {
    Condition::Prefix(value.into())
}

pub fn all(children: Vec<Condition>) -> Condition {
    Condition::All(children)
}

pub fn any(children: Vec<Condition>) -> Condition {
    Condition::Any(children)
}

pub fn find(query: Query) -> Condition {
    Condition::Find(query)
}

pub fn nfind(query: Query) -> Condition {
    Condition::NFind(query)
}
