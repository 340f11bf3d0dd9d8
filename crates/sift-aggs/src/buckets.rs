use serde_json::{Map, Value};

use crate::aggregation::{Aggregation, invalid, parse_source, present};
use crate::error::AggregationError;

/// Bucket width for date-histogram bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateInterval {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

impl DateInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateInterval::Year => "year",
            DateInterval::Month => "month",
            DateInterval::Day => "day",
            DateInterval::Hour => "hour",
            DateInterval::Minute => "minute",
            DateInterval::Second => "second",
            DateInterval::Millisecond => "millisecond",
        }
    }

    fn from_tag(tag: &str) -> Option<DateInterval> {
        match tag {
            "year" => Some(DateInterval::Year),
            "month" => Some(DateInterval::Month),
            "day" => Some(DateInterval::Day),
            "hour" => Some(DateInterval::Hour),
            "minute" => Some(DateInterval::Minute),
            "second" => Some(DateInterval::Second),
            "millisecond" => Some(DateInterval::Millisecond),
            _ => None,
        }
    }
}

/// A bucketing stage: groups the records flowing in by `field_id`.
///
/// Plain buckets group by distinct value; `values` restricts which
/// buckets are returned and `size` caps their number. `interval` turns
/// the stage into a histogram over numeric values, `date_interval` into
/// a date histogram. `sub_field_ids` + `sub_field_prop` bucket on a
/// property of named elements inside an array-valued field, and
/// `sub_buckets` nests a further grouping inside every bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketsAggregation {
    pub field_id: String,
    pub size: Option<usize>,
    pub values: Option<Vec<String>>,
    pub interval: Option<f64>,
    pub date_interval: Option<DateInterval>,
    pub sub_field_ids: Option<Vec<String>>,
    pub sub_field_prop: Option<String>,
    pub sub_buckets: Option<Box<BucketsAggregation>>,
    pub source: Option<Box<Aggregation>>,
}

impl BucketsAggregation {
    pub fn new(field_id: impl Into<String>) -> BucketsAggregation {
        BucketsAggregation {
            field_id: field_id.into(),
            ..BucketsAggregation::default()
        }
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".into(), Value::String("buckets".into()));
        self.write_options(&mut map);
        if let Some(source) = &self.source {
            map.insert("source".into(), source.to_json());
        }
        Value::Object(map)
    }

    // Sub-buckets are plain option documents on the wire: no type tag,
    // no source.
    fn options_json(&self) -> Value {
        let mut map = Map::new();
        self.write_options(&mut map);
        Value::Object(map)
    }

    fn write_options(&self, map: &mut Map<String, Value>) {
        map.insert("fieldId".into(), Value::String(self.field_id.clone()));
        if let Some(size) = self.size {
            map.insert("size".into(), Value::from(size));
        }
        if let Some(values) = &self.values {
            map.insert(
                "values".into(),
                Value::Array(values.iter().map(|v| Value::String(v.clone())).collect()),
            );
        }
        if let Some(interval) = self.interval {
            map.insert("interval".into(), Value::from(interval));
        }
        if let Some(date_interval) = self.date_interval {
            map.insert(
                "dateInterval".into(),
                Value::String(date_interval.as_str().into()),
            );
        }
        if let Some(sub_field_ids) = &self.sub_field_ids {
            map.insert(
                "subFieldIds".into(),
                Value::Array(
                    sub_field_ids
                        .iter()
                        .map(|id| Value::String(id.clone()))
                        .collect(),
                ),
            );
        }
        if let Some(sub_field_prop) = &self.sub_field_prop {
            map.insert(
                "subFieldProp".into(),
                Value::String(sub_field_prop.clone()),
            );
        }
        if let Some(sub_buckets) = &self.sub_buckets {
            map.insert("subBuckets".into(), sub_buckets.options_json());
        }
    }

    pub fn from_json(json: &Value) -> Result<BucketsAggregation, AggregationError> {
        let obj = json
            .as_object()
            .ok_or_else(|| invalid("buckets aggregation must be an object"))?;

        let field_id = match present(obj, "fieldId") {
            Some(Value::String(field_id)) => field_id.clone(),
            _ => return Err(invalid("buckets aggregation requires a string fieldId")),
        };
        let mut buckets = BucketsAggregation::new(field_id);

        if let Some(value) = present(obj, "size") {
            let size = value
                .as_u64()
                .ok_or_else(|| invalid("size must be a non-negative number"))?;
            buckets.size = Some(size as usize);
        }
        if let Some(value) = present(obj, "values") {
            buckets.values = Some(string_list(value, "values")?);
        }
        if let Some(value) = present(obj, "interval") {
            let interval = value
                .as_f64()
                .ok_or_else(|| invalid("interval must be a number"))?;
            buckets.interval = Some(interval);
        }
        if let Some(value) = present(obj, "dateInterval") {
            let tag = value
                .as_str()
                .ok_or_else(|| invalid("dateInterval must be a string"))?;
            buckets.date_interval = Some(
                DateInterval::from_tag(tag)
                    .ok_or_else(|| invalid(format!("unknown date interval: {tag}")))?,
            );
        }
        if let Some(value) = present(obj, "subFieldIds") {
            buckets.sub_field_ids = Some(string_list(value, "subFieldIds")?);
        }
        if let Some(value) = present(obj, "subFieldProp") {
            let prop = value
                .as_str()
                .ok_or_else(|| invalid("subFieldProp must be a string"))?;
            buckets.sub_field_prop = Some(prop.to_string());
        }
        if let Some(value) = present(obj, "subBuckets") {
            buckets.sub_buckets = Some(Box::new(BucketsAggregation::from_json(value)?));
        }
        buckets.source = parse_source(json)?;

        Ok(buckets)
    }
}

fn string_list(value: &Value, key: &str) -> Result<Vec<String>, AggregationError> {
    let items = value
        .as_array()
        .ok_or_else(|| invalid(format!("{key} must be an array of strings")))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(String::from)
                .ok_or_else(|| invalid(format!("{key} must be an array of strings")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unset_options_stay_off_the_wire() {
        let buckets = BucketsAggregation::new("status");
        assert_eq!(
            buckets.to_json(),
            json!({ "type": "buckets", "fieldId": "status" })
        );
    }

    #[test]
    fn every_option_round_trips() {
        let buckets = BucketsAggregation {
            field_id: "customFields".into(),
            size: Some(25),
            values: Some(vec!["custom1".into(), "custom2".into()]),
            interval: Some(10.0),
            date_interval: Some(DateInterval::Month),
            sub_field_ids: Some(vec!["custom1".into()]),
            sub_field_prop: Some("value".into()),
            sub_buckets: Some(Box::new(BucketsAggregation::new("age"))),
            source: None,
        };
        let parsed = BucketsAggregation::from_json(&buckets.to_json()).unwrap();
        assert_eq!(parsed, buckets);
    }

    #[test]
    fn sub_buckets_serialize_as_plain_options() {
        let buckets = BucketsAggregation {
            field_id: "name".into(),
            sub_buckets: Some(Box::new(BucketsAggregation {
                field_id: "age".into(),
                interval: Some(10.0),
                ..BucketsAggregation::default()
            })),
            ..BucketsAggregation::default()
        };
        assert_eq!(
            buckets.to_json(),
            json!({
                "type": "buckets",
                "fieldId": "name",
                "subBuckets": { "fieldId": "age", "interval": 10.0 }
            })
        );
    }

    #[test]
    fn a_missing_field_id_is_rejected() {
        let err = BucketsAggregation::from_json(&json!({ "size": 5 })).unwrap_err();
        assert!(matches!(err, AggregationError::InvalidAggregation(_)));
    }

    #[test]
    fn an_unknown_date_interval_is_rejected() {
        let err = BucketsAggregation::from_json(&json!({
            "fieldId": "createdAt",
            "dateInterval": "fortnight"
        }))
        .unwrap_err();
        assert_eq!(
            err,
            AggregationError::InvalidAggregation("unknown date interval: fortnight".into())
        );
    }

    #[test]
    fn date_interval_tags_cover_every_unit() {
        for unit in [
            DateInterval::Year,
            DateInterval::Month,
            DateInterval::Day,
            DateInterval::Hour,
            DateInterval::Minute,
            DateInterval::Second,
            DateInterval::Millisecond,
        ] {
            assert_eq!(DateInterval::from_tag(unit.as_str()), Some(unit));
        }
    }
}
