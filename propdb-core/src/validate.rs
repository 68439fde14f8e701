//! Per-field validation of records.
//!
//! A [`Validators`] set is an ordered list of `(field, predicate)` pairs. Each predicate is
//! handed the field's JSON value (or `null` when the field is missing) and returns whether
//! the value is acceptable. An empty set accepts every record.
//!
//! # Example
//!
//! ```ignore
//! use propdb::validate::Validators;
//!
//! let validators = Validators::new()
//!     .rule("name", |v| v.as_str().is_some_and(|s| !s.is_empty()))
//!     .rule("age", |v| v.as_u64().is_some_and(|age| age < 150));
//! ```

use serde_json::{Map, Value};
use std::fmt;

/// A predicate over a single field value.
pub type Predicate = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// Ordered set of field validators, at most one per field.
#[derive(Default)]
pub struct Validators {
    rules: Vec<(String, Predicate)>,
}

impl Validators {
    /// Creates an empty validator set that accepts everything.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Adds a predicate for `field`, returning the updated set.
    ///
    /// Declaring the same field twice replaces the earlier predicate but keeps its position.
    pub fn rule<F>(mut self, field: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.insert(field, predicate);
        self
    }

    /// Adds a predicate for `field` in place.
    pub fn insert<F>(&mut self, field: impl Into<String>, predicate: F)
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let field = field.into();
        let predicate: Predicate = Box::new(predicate);

        match self.rules.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = predicate,
            None => self.rules.push((field, predicate)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Iterates over the validated field names in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(field, _)| field.as_str())
    }

    /// Runs every predicate against `object` and returns the names of the failing fields.
    ///
    /// An empty result means the record is valid.
    pub fn check(&self, object: &Map<String, Value>) -> Vec<String> {
        self.rules
            .iter()
            .filter(|(field, predicate)| !predicate(object.get(field).unwrap_or(&Value::Null)))
            .map(|(field, _)| field.clone())
            .collect()
    }
}

impl fmt::Debug for Validators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validators")
            .field("fields", &self.fields().collect::<Vec<_>>())
            .finish()
    }
}
