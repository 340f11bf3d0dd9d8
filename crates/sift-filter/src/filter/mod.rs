mod paginate;

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::condition::Condition;
use crate::error::FilterError;
use crate::query::Query;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// An OR-group of queries: at least one must match.
pub type Statement = Vec<Query>;

/// A filter in conjunctive normal form: every statement must hold, and
/// within a statement at least one query must hold. Sort field,
/// direction and result limit ride along for the query service.
///
/// The builder keeps an active query, which is always the first query
/// of the first statement. `field` writes to it; `or` and `and` insert
/// a fresh query (respectively a fresh statement) at the FRONT of the
/// list and focus it, so the most recently opened clause is always
/// first in the serialized output.
///
/// ```
/// use sift_filter::{Filter, eq};
///
/// let mut filter = Filter::new();
/// filter
///     .field("id", eq("this"))
///     .or()
///     .field("id", eq("that"))
///     .and()
///     .field("name", eq("bob"));
/// // (id is "that" OR id is "this") AND name is "bob"
/// ```
///
/// Invariant: the statement list is never empty and no statement is
/// ever empty. `set_statements` and `add_statement` reject input that
/// would break this.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    statements: Vec<Statement>,
    sort_field_id: Option<String>,
    sort_field_sub_id: Option<String>,
    sort_field_sub_prop: Option<String>,
    sort_dir: SortDirection,
    limit: usize,
}

impl Default for Filter {
    fn default() -> Filter {
        Filter {
            statements: vec![vec![Query::new()]],
            sort_field_id: Some("id".to_string()),
            sort_field_sub_id: None,
            sort_field_sub_prop: None,
            sort_dir: SortDirection::Desc,
            limit: 100,
        }
    }
}

/// Wire form of a filter, as stored and sent to the query service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterJson {
    pub statements: Vec<Statement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_field_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_field_sub_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_field_sub_prop: Option<String>,
    pub sort_dir: SortDirection,
    pub limit: usize,
}

impl Filter {
    pub fn new() -> Filter {
        Filter::default()
    }

    /// Set or overwrite a condition on the active query. Chainable.
    pub fn field(&mut self, field_id: impl Into<String>, condition: Condition) -> &mut Filter {
        self.statements[0][0].field(field_id, condition);
        self
    }

    /// Read a condition from the active query.
    pub fn field_condition(&self, field_id: &str) -> Option<&Condition> {
        self.statements[0][0].field_condition(field_id)
    }

    /// Widen the current OR-group: prepend a fresh query to the first
    /// statement and make it the active query.
    pub fn or(&mut self) -> &mut Filter {
        self.statements[0].insert(0, Query::new());
        self
    }

    /// Open a new AND-ed statement: prepend a statement holding one
    /// empty query, which becomes the active query.
    pub fn and(&mut self) -> &mut Filter {
        self.statements.insert(0, vec![Query::new()]);
        self
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Replace the statement list. Rejects an empty list and any
    /// statement with no queries.
    pub fn set_statements(&mut self, statements: Vec<Statement>) -> Result<&mut Filter, FilterError> {
        if statements.is_empty() {
            return Err(FilterError::NoStatements);
        }
        if statements.iter().any(Vec::is_empty) {
            return Err(FilterError::EmptyStatement);
        }
        self.statements = statements;
        Ok(self)
    }

    /// Append a statement, AND-ed with all existing statements.
    pub fn add_statement(&mut self, statement: Statement) -> Result<&mut Filter, FilterError> {
        if statement.is_empty() {
            return Err(FilterError::EmptyStatement);
        }
        self.statements.push(statement);
        Ok(self)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn set_limit(&mut self, limit: usize) -> &mut Filter {
        self.limit = limit;
        self
    }

    pub fn sort_field_id(&self) -> Option<&str> {
        self.sort_field_id.as_deref()
    }

    pub fn sort_field_sub_id(&self) -> Option<&str> {
        self.sort_field_sub_id.as_deref()
    }

    pub fn sort_field_sub_prop(&self) -> Option<&str> {
        self.sort_field_sub_prop.as_deref()
    }

    /// Sort on a top-level or dotted-path field. Clears any nested
    /// sort.
    pub fn set_sort_field_id(&mut self, field_id: impl Into<String>) -> &mut Filter {
        self.sort_field_id = Some(field_id.into());
        self.sort_field_sub_id = None;
        self.sort_field_sub_prop = None;
        self
    }

    /// Sort on `sub_prop` of the element whose `id` is `sub_id` inside
    /// the array-valued field `field_id`.
    pub fn set_nested_sort_field(
        &mut self,
        field_id: impl Into<String>,
        sub_id: impl Into<String>,
        sub_prop: impl Into<String>,
    ) -> &mut Filter {
        self.sort_field_id = Some(field_id.into());
        self.sort_field_sub_id = Some(sub_id.into());
        self.sort_field_sub_prop = Some(sub_prop.into());
        self
    }

    /// Drop the sort field entirely; the querystring form then omits
    /// the whole sort block.
    pub fn clear_sort_field(&mut self) -> &mut Filter {
        self.sort_field_id = None;
        self.sort_field_sub_id = None;
        self.sort_field_sub_prop = None;
        self
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_dir
    }

    pub fn set_sort_direction(&mut self, dir: SortDirection) -> &mut Filter {
        self.sort_dir = dir;
        self
    }

    /// Wire form. The nested-sort pair is emitted only when both halves
    /// are set.
    pub fn to_json(&self) -> FilterJson {
        let (sort_field_sub_id, sort_field_sub_prop) =
            match (&self.sort_field_sub_id, &self.sort_field_sub_prop) {
                (Some(sub_id), Some(sub_prop)) => (Some(sub_id.clone()), Some(sub_prop.clone())),
                _ => (None, None),
            };
        FilterJson {
            statements: self.statements.clone(),
            sort_field_id: self.sort_field_id.clone(),
            sort_field_sub_id,
            sort_field_sub_prop,
            sort_dir: self.sort_dir,
            limit: self.limit,
        }
    }

    /// Rebuild from the wire form, enforcing the statement invariants
    /// the same way `set_statements` does.
    pub fn from_json(json: FilterJson) -> Result<Filter, FilterError> {
        let mut filter = Filter {
            statements: vec![vec![Query::new()]],
            sort_field_id: json.sort_field_id,
            sort_field_sub_id: json.sort_field_sub_id,
            sort_field_sub_prop: json.sort_field_sub_prop,
            sort_dir: json.sort_dir,
            limit: json.limit,
        };
        filter.set_statements(json.statements)?;
        Ok(filter)
    }

    /// Alias for the `Display` querystring form.
    pub fn to_query_string(&self) -> String {
        self.to_string()
    }

    /// Sort field, treating an empty id the same as unset. The
    /// querystring form and pagination both read through this.
    pub(crate) fn sort_field(&self) -> Option<&str> {
        self.sort_field_id().filter(|field_id| !field_id.is_empty())
    }
}

/// One-way querystring transport form:
/// `&statements=<JSON>&sortFieldId=<id>&sortDir=<dir>&limit=<n>`, with
/// the nested-sort pair spliced in only when both halves are set and
/// the whole sort block omitted when the sort field is unset. Values
/// are not percent-encoded; callers encode for their transport.
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let statements = serde_json::to_string(&self.statements).map_err(|_| fmt::Error)?;
        write!(f, "&statements={statements}")?;
        if let Some(sort_field_id) = self.sort_field() {
            write!(f, "&sortFieldId={sort_field_id}")?;
            if let (Some(sub_id), Some(sub_prop)) =
                (&self.sort_field_sub_id, &self.sort_field_sub_prop)
            {
                write!(f, "&sortFieldSubId={sub_id}&sortFieldSubProp={sub_prop}")?;
            }
            write!(f, "&sortDir={}", self.sort_dir.as_str())?;
        }
        write!(f, "&limit={}", self.limit)
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = FilterJson::deserialize(deserializer)?;
        Filter::from_json(json).map_err(D::Error::custom)
    }
}

impl Filter {
    /// The filter's wire form as a plain JSON value.
    pub fn to_json_value(&self) -> Value {
        let json = self.to_json();
        let mut map = serde_json::Map::new();
        map.insert(
            "statements".into(),
            Value::Array(
                json.statements
                    .iter()
                    .map(|statement| {
                        Value::Array(statement.iter().map(Query::to_json).collect())
                    })
                    .collect(),
            ),
        );
        if let Some(sort_field_id) = json.sort_field_id {
            map.insert("sortFieldId".into(), Value::String(sort_field_id));
        }
        if let (Some(sub_id), Some(sub_prop)) = (json.sort_field_sub_id, json.sort_field_sub_prop) {
            map.insert("sortFieldSubId".into(), Value::String(sub_id));
            map.insert("sortFieldSubProp".into(), Value::String(sub_prop));
        }
        map.insert("sortDir".into(), Value::String(json.sort_dir.as_str().into()));
        map.insert("limit".into(), Value::from(json.limit));
        Value::Object(map)
    }
}
