//! Sparse-fieldset projection over serialized values.
//!
//! Repositories return full records; the projection from the descriptor is
//! applied to their JSON form just before the response is written. Required
//! fields are already merged into the attribute list by the builder.

use serde_json::{Map, Value};

/// Keep only the named attributes of a JSON object. Non-objects and a `None`
/// projection pass through untouched.
pub fn project_value(value: Value, attributes: Option<&[String]>) -> Value {
    match (value, attributes) {
        (Value::Object(obj), Some(attributes)) => Value::Object(filter_object(obj, attributes)),
        (value, _) => value,
    }
}

/// Apply [`project_value`] to every element of a list.
pub fn project_list(values: Vec<Value>, attributes: Option<&[String]>) -> Vec<Value> {
    values
        .into_iter()
        .map(|v| project_value(v, attributes))
        .collect()
}

fn filter_object(obj: Map<String, Value>, attributes: &[String]) -> Map<String, Value> {
    obj.into_iter()
        .filter(|(key, _)| attributes.iter().any(|a| a == key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn projects_named_attributes() {
        let value = json!({"id": 1, "name": "widget", "secret": "x"});
        let attributes = vec!["id".to_string(), "name".to_string()];
        let projected = project_value(value, Some(&attributes));
        assert_eq!(projected, json!({"id": 1, "name": "widget"}));
    }

    #[test]
    fn none_projection_is_identity() {
        let value = json!({"id": 1, "name": "widget"});
        assert_eq!(project_value(value.clone(), None), value);
    }

    #[test]
    fn projects_lists() {
        let values = vec![json!({"id": 1, "a": 2}), json!({"id": 2, "a": 3})];
        let attributes = vec!["id".to_string()];
        let projected = project_list(values, Some(&attributes));
        assert_eq!(projected, vec![json!({"id": 1}), json!({"id": 2})]);
    }
}
