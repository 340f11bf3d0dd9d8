use serde_json::Value;

use crate::condition::{Condition, eq, find};
use crate::query::Query;

use super::{Filter, SortDirection};

impl Filter {
    /// Build the filter for the page strictly after `last_item` under
    /// the current sort order.
    ///
    /// Keyset (seek) pagination: instead of a numeric offset, one extra
    /// statement is AND-ed on that filters past the last seen sort key,
    /// which stays correct when rows are inserted or deleted between
    /// pages. The statement is an OR of two queries: one moving strictly
    /// past the last sort value, and a tie-break that matches rows with
    /// the same sort value but an `id` strictly past `last_item`'s.
    ///
    /// The receiver is never mutated; every path returns a fresh
    /// filter. A plain clone comes back when there is nothing to
    /// constrain on:
    /// - no `last_item` or no sort field set
    /// - a nested sort whose resolved field value is not an array
    /// - a sort value that resolves to a non-scalar (unsortable; the
    ///   fallback is deliberately silent)
    pub fn create_paginated_filter(&self, last_item: Option<&Value>) -> Filter {
        let Some(last_item) = last_item else {
            return self.clone();
        };
        let Some(sort_field_id) = self.sort_field().map(String::from) else {
            return self.clone();
        };

        let sort_value = resolve_path(last_item, &sort_field_id).clone();
        let last_id = last_item.get("id").cloned().unwrap_or(Value::Null);
        let op = |value: Value| match self.sort_direction() {
            SortDirection::Asc => Condition::Gt(value),
            SortDirection::Desc => Condition::Lt(value),
        };

        let nested_sort = match (self.sort_field_sub_id(), self.sort_field_sub_prop()) {
            (Some(sub_id), Some(sub_prop)) if !sub_id.is_empty() && !sub_prop.is_empty() => {
                Some((sub_id.to_string(), sub_prop.to_string()))
            }
            _ => None,
        };

        if let Some((sub_id, sub_prop)) = nested_sort {
            // Sorting on a property of one element inside an array-valued
            // field; the element is picked by its `id`.
            let Value::Array(elements) = sort_value else {
                return self.clone();
            };
            let sub_value = elements
                .iter()
                .find(|element| element.get("id").and_then(Value::as_str) == Some(sub_id.as_str()))
                .and_then(|element| element.get(&sub_prop))
                .filter(|value| !is_falsy(value))
                .cloned()
                .unwrap_or(Value::Null);

            let mut past = Query::with("id", eq(sub_id.as_str()));
            past.field(&sub_prop, op(sub_value.clone()));

            let mut same = Query::with("id", eq(sub_id.as_str()));
            same.field(&sub_prop, eq(sub_value));

            let mut tie_break = Query::with(&sort_field_id, find(same));
            tie_break.field("id", op(last_id));

            let mut page = self.clone();
            page.statements
                .push(vec![Query::with(&sort_field_id, find(past)), tie_break]);
            page
        } else {
            match sort_value {
                // Unsortable value: fall back to the unconstrained page
                Value::Object(_) | Value::Array(_) => self.clone(),
                scalar => {
                    let mut tie_break = Query::with("id", op(last_id));
                    tie_break.field(&sort_field_id, eq(scalar.clone()));

                    let mut page = self.clone();
                    page.statements
                        .push(vec![Query::with(&sort_field_id, op(scalar)), tie_break]);
                    page
                }
            }
        }
    }
}

/// Walk a dotted path into a datum, keeping the value reached so far
/// and stopping the moment the next component is missing or falsy.
///
/// A walk that stops early therefore yields the last object reached,
/// not null; `create_paginated_filter` treats any leftover non-scalar
/// as unsortable.
fn resolve_path<'a>(datum: &'a Value, path: &str) -> &'a Value {
    let mut current = datum;
    for component in path.split('.') {
        match current.get(component) {
            Some(next) if !is_falsy(next) => current = next,
            _ => break,
        }
    }
    current
}

/// JSON truthiness as the path walk and sub-value extraction see it.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_filter() -> Filter {
        let mut filter = Filter::new();
        filter
            .field("name", eq("something"))
            .set_sort_field_id("createdAt")
            .set_sort_direction(SortDirection::Desc)
            .set_limit(10);
        filter
    }

    fn statements_json(filter: &Filter) -> Value {
        serde_json::to_value(filter).unwrap()["statements"].clone()
    }

    #[test]
    fn no_last_item_returns_an_identical_page() {
        let filter = base_filter();
        let page = filter.create_paginated_filter(None);
        assert_eq!(page, filter);
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            serde_json::to_value(&filter).unwrap()
        );
    }

    #[test]
    fn the_original_filter_is_never_mutated() {
        let filter = base_filter();
        let saved = filter.clone();
        let _ = filter.create_paginated_filter(Some(&json!({ "id": "!-@", "createdAt": 100 })));
        assert_eq!(filter, saved);
    }

    #[test]
    fn desc_sort_filters_below_with_an_id_tie_break() {
        let filter = base_filter();
        let page = filter.create_paginated_filter(Some(&json!({ "id": "!-@", "createdAt": 100 })));
        assert_eq!(
            statements_json(&page)[1],
            json!([
                { "createdAt": { "op": "LT", "value": 100 } },
                {
                    "id": { "op": "LT", "value": "!-@" },
                    "createdAt": { "op": "EQ", "value": 100 }
                }
            ])
        );
    }

    #[test]
    fn asc_sort_flips_the_operator() {
        let mut filter = base_filter();
        filter.set_sort_direction(SortDirection::Asc);
        let page = filter.create_paginated_filter(Some(&json!({ "id": "!-@", "createdAt": 100 })));
        assert_eq!(
            statements_json(&page)[1],
            json!([
                { "createdAt": { "op": "GT", "value": 100 } },
                {
                    "id": { "op": "GT", "value": "!-@" },
                    "createdAt": { "op": "EQ", "value": 100 }
                }
            ])
        );
    }

    #[test]
    fn nested_sort_extracts_the_sub_element_value() {
        let mut filter = base_filter();
        filter.set_nested_sort_field("customFields", "custom1", "value");
        let page = filter.create_paginated_filter(Some(&json!({
            "id": "!-@",
            "createdAt": 100,
            "customFields": [{ "id": "custom1", "value": "something" }]
        })));
        assert_eq!(
            statements_json(&page)[1],
            json!([
                {
                    "customFields": {
                        "op": "FIND",
                        "value": {
                            "id": { "op": "EQ", "value": "custom1" },
                            "value": { "op": "LT", "value": "something" }
                        }
                    }
                },
                {
                    "customFields": {
                        "op": "FIND",
                        "value": {
                            "id": { "op": "EQ", "value": "custom1" },
                            "value": { "op": "EQ", "value": "something" }
                        }
                    },
                    "id": { "op": "LT", "value": "!-@" }
                }
            ])
        );
    }

    #[test]
    fn nested_sort_treats_a_missing_sub_element_as_null() {
        let mut filter = base_filter();
        filter.set_nested_sort_field("customFields", "custom1", "value");
        let page = filter.create_paginated_filter(Some(&json!({
            "id": "!-@",
            "createdAt": 100,
            "customFields": []
        })));
        assert_eq!(
            statements_json(&page)[1],
            json!([
                {
                    "customFields": {
                        "op": "FIND",
                        "value": {
                            "id": { "op": "EQ", "value": "custom1" },
                            "value": { "op": "LT", "value": null }
                        }
                    }
                },
                {
                    "customFields": {
                        "op": "FIND",
                        "value": {
                            "id": { "op": "EQ", "value": "custom1" },
                            "value": { "op": "EQ", "value": null }
                        }
                    },
                    "id": { "op": "LT", "value": "!-@" }
                }
            ])
        );
    }

    #[test]
    fn nested_sort_without_the_array_field_leaves_the_page_unchanged() {
        let mut filter = base_filter();
        filter.set_nested_sort_field("customFields", "custom1", "value");
        let page = filter.create_paginated_filter(Some(&json!({ "id": "!-@", "createdAt": 100 })));
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            serde_json::to_value(&filter).unwrap()
        );
    }

    #[test]
    fn an_object_sort_value_is_unsortable() {
        let mut filter = base_filter();
        filter.set_sort_field_id("owner");
        let page = filter.create_paginated_filter(Some(&json!({
            "id": "!-@",
            "owner": { "name": "bob" }
        })));
        assert_eq!(statements_json(&page).as_array().unwrap().len(), 1);
    }

    #[test]
    fn a_dotted_sort_path_walks_into_the_datum() {
        let mut filter = base_filter();
        filter.set_sort_field_id("owner.name");
        let page = filter.create_paginated_filter(Some(&json!({
            "id": "!-@",
            "owner": { "name": "bob" }
        })));
        assert_eq!(
            statements_json(&page)[1],
            json!([
                { "owner/name": { "op": "LT", "value": "bob" } },
                {
                    "id": { "op": "LT", "value": "!-@" },
                    "owner/name": { "op": "EQ", "value": "bob" }
                }
            ])
        );
    }

    #[test]
    fn a_falsy_step_stops_the_walk_and_skips_the_constraint() {
        // createdAt of 0 reads as falsy; the walk keeps the whole datum,
        // which is unsortable, so the page comes back unconstrained
        let filter = base_filter();
        let page = filter.create_paginated_filter(Some(&json!({ "id": "!-@", "createdAt": 0 })));
        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            serde_json::to_value(&filter).unwrap()
        );
    }

    #[test]
    fn a_missing_id_falls_back_to_null_in_the_tie_break() {
        let filter = base_filter();
        let page = filter.create_paginated_filter(Some(&json!({ "createdAt": 100 })));
        assert_eq!(
            statements_json(&page)[1][1]["id"],
            json!({ "op": "LT", "value": null })
        );
    }

    #[test]
    fn resolve_path_stops_at_a_missing_component() {
        let datum = json!({ "a": { "b": 1 } });
        assert_eq!(resolve_path(&datum, "a.b"), &json!(1));
        // missing leaf: the walk keeps the parent object
        assert_eq!(resolve_path(&datum, "a.c"), &json!({ "b": 1 }));
        // walking through a scalar keeps the scalar
        assert_eq!(resolve_path(&datum, "a.b.c"), &json!(1));
    }

    #[test]
    fn falsy_values() {
        assert!(is_falsy(&json!(null)));
        assert!(is_falsy(&json!(false)));
        assert!(is_falsy(&json!(0)));
        assert!(is_falsy(&json!("")));
        assert!(!is_falsy(&json!([])));
        assert!(!is_falsy(&json!({})));
        assert!(!is_falsy(&json!("x")));
        assert!(!is_falsy(&json!(1)));
    }
}
