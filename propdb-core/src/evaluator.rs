//! Condition evaluation and ordering for in-memory records.
//!
//! Records are evaluated in their JSON object form. There is no indexing: every query scans
//! the whole collection.

use serde_json::{Map, Value};
use std::{cmp::Ordering, collections::HashMap};

use crate::query::{Condition, Operator, SortDirection, SortKey};

/// Comparable view of a JSON value.
///
/// Numbers are normalised to `f64` so integers and floats compare with each other.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Value> for Comparable<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Comparable::Null,
            Value::Bool(value) => Comparable::Bool(*value),
            Value::Number(value) => value
                .as_f64()
                .map(Comparable::Number)
                .unwrap_or(Comparable::Null),
            Value::String(value) => Comparable::String(value),
            Value::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Value::Object(map) => Comparable::Map(
                map
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Returns the lowercase string form of a scalar value.
///
/// Null, arrays and objects have no string form.
pub(crate) fn string_form(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.to_lowercase()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

pub(crate) struct RecordEvaluator<'a> {
    record: &'a Map<String, Value>,
}

impl<'a> RecordEvaluator<'a> {
    pub fn new(record: &'a Map<String, Value>) -> Self {
        Self { record }
    }

    /// Returns `true` if every condition holds.
    pub fn matches_all(&self, conditions: &[Condition]) -> bool {
        conditions.iter().all(|condition| self.matches(condition))
    }

    /// Evaluates a single condition. A missing field behaves like `null`.
    pub fn matches(&self, condition: &Condition) -> bool {
        let field_value = self.record.get(&condition.field).unwrap_or(&Value::Null);
        let value = &condition.value;

        match condition.operator {
            Operator::Eq => Comparable::from(field_value) == Comparable::from(value),
            Operator::Ne => Comparable::from(field_value) != Comparable::from(value),
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
                match Comparable::from(field_value).partial_cmp(&Comparable::from(value)) {
                    Some(ordering) => match condition.operator {
                        Operator::Gt => ordering == Ordering::Greater,
                        Operator::Gte => ordering != Ordering::Less,
                        Operator::Lt => ordering == Ordering::Less,
                        Operator::Lte => ordering != Ordering::Greater,
                        _ => unreachable!(),
                    },
                    None => false,
                }
            },
            Operator::Contains | Operator::StartsWith | Operator::EndsWith => {
                match (string_form(field_value), string_form(value)) {
                    (Some(left), Some(right)) => match condition.operator {
                        Operator::Contains => left.contains(&right),
                        Operator::StartsWith => left.starts_with(&right),
                        Operator::EndsWith => left.ends_with(&right),
                        _ => unreachable!(),
                    },
                    _ => false,
                }
            },
        }
    }

    /// Case-insensitive substring search over the given fields, or every field when `fields`
    /// is `None`. `needle` must already be lowercase.
    pub fn matches_term(&self, needle: &str, fields: Option<&[&str]>) -> bool {
        let haystack = |value: &Value| string_form(value).is_some_and(|s| s.contains(needle));

        match fields {
            Some(fields) => fields
                .iter()
                .filter_map(|field| self.record.get(*field))
                .any(haystack),
            None => self.record.values().any(haystack),
        }
    }
}

/// Orders two records by the given sort keys.
///
/// Each key orders its values totally: null and missing fields sort last in either direction,
/// the remaining values by kind (booleans, numbers, strings, arrays, objects) and then by value.
/// Only equal values tie, leaving the decision to the next key.
pub(crate) fn compare_by(a: &Map<String, Value>, b: &Map<String, Value>, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let left = a.get(&key.field).filter(|value| !value.is_null());
        let right = b.get(&key.field).filter(|value| !value.is_null());

        let ordering = match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(left), Some(right)) => match key.direction {
                SortDirection::Asc => total_cmp(left, right),
                SortDirection::Desc => total_cmp(right, left),
            },
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn total_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.total_cmp(&b)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => a
            .iter()
            .zip(b)
            .map(|(a, b)| total_cmp(a, b))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        (Value::Object(a), Value::Object(b)) => {
            let mut a = a.iter().collect::<Vec<_>>();
            let mut b = b.iter().collect::<Vec<_>>();
            a.sort_by(|x, y| x.0.cmp(y.0));
            b.sort_by(|x, y| x.0.cmp(y.0));

            a.iter()
                .zip(&b)
                .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| total_cmp(va, vb)))
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or_else(|| a.len().cmp(&b.len()))
        }
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}
