use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use sift_filter::{Condition, Filter, FilterJson};

use crate::buckets::BucketsAggregation;
use crate::error::AggregationError;

/// A node in an aggregation pipeline.
///
/// Each node carries an optional upstream `source`, so a pipeline is a
/// chain of nodes built left to right with [`pipe`](Aggregation::pipe).
/// The wire form nests the upstream under a `source` key and tags every
/// node with its `type`, dispatched on deserialization the same way
/// condition operators are.
///
/// ```
/// use sift_aggs::{Aggregation, BucketsAggregation};
/// use sift_filter::{Filter, gt};
///
/// let mut adults = Filter::new();
/// adults.field("age", gt(18));
///
/// let pipeline = Aggregation::from(adults).pipe(BucketsAggregation {
///     field_id: "name".into(),
///     sub_buckets: Some(Box::new(BucketsAggregation {
///         field_id: "age".into(),
///         interval: Some(10.0),
///         ..BucketsAggregation::default()
///     })),
///     ..BucketsAggregation::default()
/// });
/// assert_eq!(pipeline.source().unwrap().type_tag(), "filter");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    Filter(FilterAggregation),
    Buckets(BucketsAggregation),
}

/// A filter stage: restricts the records flowing into downstream
/// aggregations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterAggregation {
    pub filter: Filter,
    pub source: Option<Box<Aggregation>>,
}

impl FilterAggregation {
    pub fn new() -> FilterAggregation {
        FilterAggregation::default()
    }

    // Builder delegation so a stage can be refined in place.

    pub fn field(&mut self, field_id: impl Into<String>, condition: Condition) -> &mut Self {
        self.filter.field(field_id, condition);
        self
    }

    pub fn or(&mut self) -> &mut Self {
        self.filter.or();
        self
    }

    pub fn and(&mut self) -> &mut Self {
        self.filter.and();
        self
    }

    pub fn to_json(&self) -> Value {
        let Value::Object(mut map) = self.filter.to_json_value() else {
            unreachable!()
        };
        map.insert("type".into(), Value::String("filter".into()));
        if let Some(source) = &self.source {
            map.insert("source".into(), source.to_json());
        }
        Value::Object(map)
    }

    pub fn from_json(json: &Value) -> Result<FilterAggregation, AggregationError> {
        let filter_json: FilterJson = serde_json::from_value(json.clone())
            .map_err(|e| AggregationError::InvalidAggregation(e.to_string()))?;
        Ok(FilterAggregation {
            filter: Filter::from_json(filter_json)?,
            source: parse_source(json)?,
        })
    }
}

impl From<Filter> for FilterAggregation {
    fn from(filter: Filter) -> Self {
        FilterAggregation { filter, source: None }
    }
}

impl From<Filter> for Aggregation {
    fn from(filter: Filter) -> Self {
        Aggregation::Filter(filter.into())
    }
}

impl From<FilterAggregation> for Aggregation {
    fn from(aggregation: FilterAggregation) -> Self {
        Aggregation::Filter(aggregation)
    }
}

impl From<BucketsAggregation> for Aggregation {
    fn from(aggregation: BucketsAggregation) -> Self {
        Aggregation::Buckets(aggregation)
    }
}

impl Aggregation {
    /// Chain `next` downstream: `self` becomes `next`'s source and
    /// `next` is returned, so chains read left to right.
    pub fn pipe(self, next: impl Into<Aggregation>) -> Aggregation {
        let mut next = next.into();
        next.set_source(self);
        next
    }

    fn set_source(&mut self, source: Aggregation) {
        let slot = match self {
            Aggregation::Filter(filter) => &mut filter.source,
            Aggregation::Buckets(buckets) => &mut buckets.source,
        };
        *slot = Some(Box::new(source));
    }

    pub fn source(&self) -> Option<&Aggregation> {
        match self {
            Aggregation::Filter(filter) => filter.source.as_deref(),
            Aggregation::Buckets(buckets) => buckets.source.as_deref(),
        }
    }

    fn take_source(&mut self) -> Option<Aggregation> {
        let slot = match self {
            Aggregation::Filter(filter) => &mut filter.source,
            Aggregation::Buckets(buckets) => &mut buckets.source,
        };
        slot.take().map(|source| *source)
    }

    /// Wire tag for this node.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Aggregation::Filter(_) => "filter",
            Aggregation::Buckets(_) => "buckets",
        }
    }

    /// Unwind a piped chain into source-first evaluation order.
    pub fn into_stages(self) -> Vec<Aggregation> {
        let mut stages = Vec::new();
        let mut current = Some(self);
        while let Some(mut stage) = current {
            current = stage.take_source();
            stages.push(stage);
        }
        stages.reverse();
        stages
    }

    pub fn to_json(&self) -> Value {
        match self {
            Aggregation::Filter(filter) => filter.to_json(),
            Aggregation::Buckets(buckets) => buckets.to_json(),
        }
    }

    /// Parse a node by its `type` tag, recursing into `source`.
    /// Unrecognized tags are rejected.
    pub fn from_json(json: &Value) -> Result<Aggregation, AggregationError> {
        let obj = json
            .as_object()
            .ok_or_else(|| AggregationError::InvalidAggregation("expected an object".into()))?;
        let tag = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| AggregationError::InvalidAggregation("missing type tag".into()))?;
        match tag {
            "filter" => Ok(Aggregation::Filter(FilterAggregation::from_json(json)?)),
            "buckets" => Ok(Aggregation::Buckets(BucketsAggregation::from_json(json)?)),
            other => Err(AggregationError::UnknownType(other.to_string())),
        }
    }
}

pub(crate) fn parse_source(json: &Value) -> Result<Option<Box<Aggregation>>, AggregationError> {
    match json.get("source") {
        None | Some(Value::Null) => Ok(None),
        Some(source) => Ok(Some(Box::new(Aggregation::from_json(source)?))),
    }
}

impl Serialize for Aggregation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Aggregation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Aggregation::from_json(&value).map_err(D::Error::custom)
    }
}

pub(crate) fn invalid(msg: impl Into<String>) -> AggregationError {
    AggregationError::InvalidAggregation(msg.into())
}

pub(crate) fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|value| !value.is_null())
}
