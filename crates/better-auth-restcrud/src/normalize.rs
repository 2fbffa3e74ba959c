// Response normalization: absorbs the remote API's wrapper variability.
//
// The generated backend has been observed to answer with a bare array,
// `{data: [...]}`, `{data: [...], meta: {total, ...}}`, a bare object, or
// alternate wrapper keys. Rather than trust a fixed contract, every response
// is inspected at runtime and coerced to what the calling operation needs:
// an item list, a single item or null, or a count.
//
// The lenient functions never fail: an unrecognized shape logs a warning and
// degrades to the safe empty default, so a wrapper-format surprise can't
// become a spurious user-facing error. The strict variants exist to surface
// normalization bugs early in tests.

use serde_json::Value;

use crate::error::{AdapterError, AdapterResult};

/// Wrapper keys checked on objects, in priority order after `data`.
const WRAPPER_KEYS: &[&str] = &["items", "results", "records"];

/// Coerce a response into a list of items. Unrecognized shapes degrade to
/// an empty list. Idempotent over its own output.
pub fn to_items(body: &Value) -> Vec<Value> {
    match items_of(body) {
        Some(items) => items,
        None => {
            tracing::warn!(shape = %shape_name(body), "unrecognized response shape, degrading to empty list");
            Vec::new()
        }
    }
}

/// Strict variant of [`to_items`]: unrecognized shapes are an error.
pub fn to_items_strict(body: &Value) -> AdapterResult<Vec<Value>> {
    items_of(body).ok_or_else(|| normalization_error(body))
}

/// Coerce a response into a single item, or `None` for an empty result.
pub fn to_single(body: &Value) -> Option<Value> {
    to_items(body).into_iter().next()
}

/// Strict variant of [`to_single`].
pub fn to_single_strict(body: &Value) -> AdapterResult<Option<Value>> {
    Ok(to_items_strict(body)?.into_iter().next())
}

/// Coerce a response into a count.
///
/// A numeric `meta.total` is the preferred source; the item list length is
/// only a fallback. Bare numbers and numeric strings count as-is.
pub fn to_count(body: &Value) -> i64 {
    match count_of(body) {
        Some(count) => count,
        None => {
            tracing::warn!(shape = %shape_name(body), "unrecognized response shape, degrading to count 0");
            0
        }
    }
}

/// Strict variant of [`to_count`].
pub fn to_count_strict(body: &Value) -> AdapterResult<i64> {
    count_of(body).ok_or_else(|| normalization_error(body))
}

fn items_of(body: &Value) -> Option<Vec<Value>> {
    match body {
        Value::Null => Some(Vec::new()),
        Value::Array(items) => Some(items.clone()),
        Value::Object(obj) => {
            // A recognized wrapper key that holds something other than an
            // array or object is an empty page, not a bare record.
            if let Some(data) = obj.get("data") {
                return match data {
                    Value::Array(items) => Some(items.clone()),
                    // `{data: {...}}` wraps a single record
                    Value::Object(_) => Some(vec![data.clone()]),
                    _ => Some(Vec::new()),
                };
            }
            for key in WRAPPER_KEYS {
                if let Some(value) = obj.get(*key) {
                    return match value {
                        Value::Array(items) => Some(items.clone()),
                        _ => Some(Vec::new()),
                    };
                }
            }
            // A plain object with no array wrapper is one item.
            Some(vec![body.clone()])
        }
        _ => None,
    }
}

fn count_of(body: &Value) -> Option<i64> {
    match body {
        Value::Null => Some(0),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Object(obj) => {
            if let Some(total) = obj.get("meta").and_then(|m| m.get("total")) {
                if let Some(total) = total.as_i64() {
                    return Some(total);
                }
            }
            items_of(body).map(|items| items.len() as i64)
        }
        Value::Array(items) => Some(items.len() as i64),
        _ => None,
    }
}

fn normalization_error(body: &Value) -> AdapterError {
    AdapterError::Unknown(format!(
        "cannot normalize response of shape '{}'",
        shape_name(body)
    ))
}

fn shape_name(body: &Value) -> &'static str {
    match body {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_list_shapes_yield_same_items() {
        let expected = vec![json!({"id": 1}), json!({"id": 2})];

        let bare = json!([{"id": 1}, {"id": 2}]);
        let data = json!({"data": [{"id": 1}, {"id": 2}]});
        let data_meta = json!({"data": [{"id": 1}, {"id": 2}], "meta": {"total": 2, "page": 1}});
        let items = json!({"items": [{"id": 1}, {"id": 2}]});

        for shape in [&bare, &data, &data_meta, &items] {
            assert_eq!(to_items(shape), expected);
        }
    }

    #[test]
    fn test_single_item_shapes() {
        assert_eq!(
            to_single(&json!({"id": "u1"})),
            Some(json!({"id": "u1"}))
        );
        assert_eq!(
            to_single(&json!({"data": {"id": "u1"}})),
            Some(json!({"id": "u1"}))
        );
        assert_eq!(
            to_single(&json!([{"id": "u1"}, {"id": "u2"}])),
            Some(json!({"id": "u1"}))
        );
    }

    #[test]
    fn test_empty_defaults_per_mode() {
        assert_eq!(to_single(&json!([])), None);
        assert_eq!(to_items(&json!([])), Vec::<Value>::new());
        assert_eq!(to_count(&json!([])), 0);

        assert_eq!(to_single(&Value::Null), None);
        assert_eq!(to_items(&Value::Null), Vec::<Value>::new());
        assert_eq!(to_count(&Value::Null), 0);
    }

    #[test]
    fn test_meta_total_preferred_over_data_length() {
        let body = json!({"data": [{"id": 1}, {"id": 2}], "meta": {"total": 50}});
        assert_eq!(to_count(&body), 50);

        // Without meta.total, fall back to the data length
        let body = json!({"data": [{"id": 1}, {"id": 2}]});
        assert_eq!(to_count(&body), 2);
    }

    #[test]
    fn test_numeric_counts() {
        assert_eq!(to_count(&json!(7)), 7);
        assert_eq!(to_count(&json!("42")), 42);
        assert_eq!(to_count(&json!({"id": "one-record"})), 1);
    }

    #[test]
    fn test_wrapper_key_priority() {
        // `items` beats `results` and `records`
        let body = json!({
            "items": [{"id": 1}],
            "results": [{"id": 2}, {"id": 3}],
            "records": []
        });
        assert_eq!(to_items(&body), vec![json!({"id": 1})]);

        let body = json!({"results": [{"id": 2}]});
        assert_eq!(to_items(&body), vec![json!({"id": 2})]);

        let body = json!({"records": [{"id": 3}]});
        assert_eq!(to_items(&body), vec![json!({"id": 3})]);
    }

    #[test]
    fn test_lenient_mode_never_fails_on_garbage() {
        for garbage in [json!(true), json!("not-a-count"), json!(3.7)] {
            assert_eq!(to_items(&garbage), Vec::<Value>::new());
            assert_eq!(to_single(&garbage), None);
        }
        assert_eq!(to_count(&json!(true)), 0);
        assert_eq!(to_count(&json!("not-a-count")), 0);
    }

    #[test]
    fn test_strict_mode_surfaces_bad_shapes() {
        assert!(to_items_strict(&json!(true)).is_err());
        assert!(to_single_strict(&json!("nope")).is_err());
        assert!(to_count_strict(&json!(false)).is_err());

        // Valid shapes still pass
        assert_eq!(
            to_items_strict(&json!([{"id": 1}])).unwrap(),
            vec![json!({"id": 1})]
        );
        assert_eq!(to_count_strict(&json!({"meta": {"total": 9}})).unwrap(), 9);
    }

    #[test]
    fn test_null_wrapper_value_is_an_empty_page() {
        assert_eq!(to_items(&json!({"data": null})), Vec::<Value>::new());
        assert_eq!(to_single(&json!({"data": null})), None);
        assert_eq!(to_count(&json!({"data": null})), 0);

        assert_eq!(to_items(&json!({"items": null})), Vec::<Value>::new());
        assert_eq!(to_single(&json!({"results": null})), None);
    }

    #[test]
    fn test_to_items_is_idempotent() {
        let once = to_items(&json!({"data": [{"id": 1}]}));
        let twice = to_items(&Value::Array(once.clone()));
        assert_eq!(once, twice);
    }
}
