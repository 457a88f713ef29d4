//! In-memory descriptor application for JSON records.
//!
//! The Postgres repositories translate a [`QueryDescriptor`] into SQL; the
//! in-memory repositories use this module instead, so both backends agree on
//! filter, sort, and pagination semantics.

use serde_json::Value;
use std::cmp::Ordering;

use crate::builder::{QueryDescriptor, SortDirection};

/// Apply filter, sort, and pagination to JSON records.
///
/// Returns the page of records plus the total count before pagination
/// (the number used for link generation).
pub fn apply_descriptor(records: Vec<Value>, descriptor: &QueryDescriptor) -> (Vec<Value>, u64) {
    let mut records: Vec<Value> = records
        .into_iter()
        .filter(|record| matches_filters(record, &descriptor.filter))
        .collect();

    for (field, direction) in descriptor.order.iter().rev() {
        records.sort_by(|a, b| {
            let ordering = compare_fields(a.get(field.as_str()), b.get(field.as_str()));
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }

    let total = records.len() as u64;
    let page = records
        .into_iter()
        .skip(descriptor.offset as usize)
        .take(descriptor.limit as usize)
        .collect();

    (page, total)
}

/// Equality filters compare against the string rendering of the field, which
/// matches how values arrive in the query string.
fn matches_filters(record: &Value, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(field, expected)| {
        record
            .get(field.as_str())
            .map(|actual| value_as_string(actual) == *expected)
            .unwrap_or(false)
    })
}

fn value_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => value_as_string(x).cmp(&value_as_string(y)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records() -> Vec<Value> {
        vec![
            json!({"id": "a", "name": "coffee", "price_cents": 300, "status": "active"}),
            json!({"id": "b", "name": "apple", "price_cents": 100, "status": "active"}),
            json!({"id": "c", "name": "bread", "price_cents": 200, "status": "archived"}),
        ]
    }

    fn descriptor() -> QueryDescriptor {
        QueryDescriptor::default()
    }

    #[test]
    fn filters_by_string_equality() {
        let mut d = descriptor();
        d.filter = vec![("status".to_string(), "active".to_string())];
        let (page, total) = apply_descriptor(records(), &d);
        assert_eq!(total, 2);
        assert!(page.iter().all(|r| r["status"] == "active"));
    }

    #[test]
    fn sorts_numbers_numerically() {
        let mut d = descriptor();
        d.order = vec![("price_cents".to_string(), SortDirection::Desc)];
        let (page, _) = apply_descriptor(records(), &d);
        assert_eq!(page[0]["name"], "coffee");
        assert_eq!(page[2]["name"], "apple");
    }

    #[test]
    fn paginates_after_filtering() {
        let mut d = descriptor();
        d.order = vec![("name".to_string(), SortDirection::Asc)];
        d.limit = 2;
        d.offset = 2;
        let (page, total) = apply_descriptor(records(), &d);
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0]["name"], "coffee");
    }
}
