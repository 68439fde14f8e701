//! Query construction for collections.
//!
//! A [`Query`] is a conjunction of field conditions, an optional multi-key sort and an
//! optional result limit.
//!
//! # Query Building
//!
//! ```ignore
//! use propdb::query::{Query, Filter, SortDirection};
//!
//! let query = Query::builder()
//!     .condition(Filter::gt("age", 18))
//!     .condition(Filter::starts_with("name", "j"))
//!     .sort("age", SortDirection::Desc)
//!     .sort("name", SortDirection::Asc)
//!     .limit(10)
//!     .build();
//! ```
//!
//! Queries also deserialize from JSON:
//!
//! ```ignore
//! let query: Query = serde_json::from_str(r#"{
//!     "conditions": [{ "field": "age", "operator": ">", "value": 18 }],
//!     "sort": [{ "field": "age", "direction": "desc" }],
//!     "limit": 2
//! }"#)?;
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, str::FromStr};

use crate::error::{StoreError, StoreResult};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9).
    Asc,
    /// Descending order (Z to A, 9 to 0).
    Desc,
}

/// One key of a sort specification.
///
/// Keys are applied in order; rows that compare equal on one key fall through to the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Field comparison operators.
///
/// The string operators (`Contains`, `StartsWith`, `EndsWith`) are case-insensitive and
/// work on the string forms of values. Ordering operators use the natural order of the
/// values and never match values of different kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operator {
    /// Equal to (`==`, also `=` and `===`).
    Eq,
    /// Not equal to (`!=`, also `!==` and `<>`).
    Ne,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal to (`>=`).
    Gte,
    /// Less than (`<`).
    Lt,
    /// Less than or equal to (`<=`).
    Lte,
    /// Substring match (`contains`).
    Contains,
    /// Prefix match (`startsWith`).
    StartsWith,
    /// Suffix match (`endsWith`).
    EndsWith,
}

impl Operator {
    /// Returns the canonical symbol of this operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Contains => "contains",
            Operator::StartsWith => "startsWith",
            Operator::EndsWith => "endsWith",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        Ok(match s {
            "==" | "=" | "===" => Operator::Eq,
            "!=" | "!==" | "<>" => Operator::Ne,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            "contains" => Operator::Contains,
            "startsWith" | "starts_with" => Operator::StartsWith,
            "endsWith" | "ends_with" => Operator::EndsWith,
            other => return Err(StoreError::InvalidQuery(format!("unknown operator {other:?}"))),
        })
    }
}

impl TryFrom<String> for Operator {
    type Error = StoreError;

    fn try_from(value: String) -> StoreResult<Self> {
        value.parse()
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.symbol().to_string()
    }
}

/// A single field comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// The field name to compare.
    pub field: String,
    /// The comparison operator.
    pub operator: Operator,
    /// The value to compare against.
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self { field: field.into(), operator, value: value.into() }
    }
}

/// A structured query over a collection.
///
/// `limit` is signed because queries may be deserialized from untrusted JSON; a negative
/// value is rejected by [`Query::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Conditions that must all hold for a record to match.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Sort keys, applied in order.
    #[serde(default)]
    pub sort: Vec<SortKey>,
    /// Maximum number of records to return, applied after sorting.
    #[serde(default)]
    pub limit: Option<i64>,
}

impl Query {
    /// Creates a new query that matches everything.
    pub fn new() -> Self {
        Query { conditions: Vec::new(), sort: Vec::new(), limit: None }
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Checks the query for structural errors.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidQuery`] if the limit is negative or a condition or sort
    /// key names an empty field.
    pub fn validate(&self) -> StoreResult<()> {
        if let Some(limit) = self.limit {
            if limit < 0 {
                return Err(StoreError::InvalidQuery(format!("limit must be non-negative, got {limit}")));
            }
        }

        if let Some(index) = self.conditions.iter().position(|c| c.field.is_empty()) {
            return Err(StoreError::InvalidQuery(format!("condition {index} has an empty field name")));
        }

        if let Some(index) = self.sort.iter().position(|key| key.field.is_empty()) {
            return Err(StoreError::InvalidQuery(format!("sort key {index} has an empty field name")));
        }

        Ok(())
    }

    /// The limit as a result count, or `None` when unlimited.
    ///
    /// Only meaningful after [`Query::validate`] succeeded.
    pub(crate) fn max_results(&self) -> Option<usize> {
        self.limit.map(|limit| usize::try_from(limit).unwrap_or(0))
    }
}

/// Helper struct for constructing conditions.
///
/// # Example
///
/// ```ignore
/// use propdb::query::Filter;
///
/// let adults = Filter::gte("age", 18);
/// let johns = Filter::starts_with("name", "john");
/// ```
pub struct Filter;

impl Filter {
    /// Matches records where the field equals the value.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Condition {
        Condition::new(field, Operator::Eq, value)
    }

    /// Matches records where the field does not equal the value.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Condition {
        Condition::new(field, Operator::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Condition {
        Condition::new(field, Operator::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Condition {
        Condition::new(field, Operator::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Condition {
        Condition::new(field, Operator::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Condition {
        Condition::new(field, Operator::Lte, value)
    }

    /// Matches records whose field string form contains the value, ignoring case.
    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Condition {
        Condition::new(field, Operator::Contains, value)
    }

    /// Matches records whose field string form starts with the value, ignoring case.
    pub fn starts_with(field: impl Into<String>, value: impl Into<Value>) -> Condition {
        Condition::new(field, Operator::StartsWith, value)
    }

    /// Matches records whose field string form ends with the value, ignoring case.
    pub fn ends_with(field: impl Into<String>, value: impl Into<Value>) -> Condition {
        Condition::new(field, Operator::EndsWith, value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Adds a condition to the conjunction.
    pub fn condition(mut self, condition: Condition) -> Self {
        self.query.conditions.push(condition);
        self
    }

    /// Adds a condition built from its parts.
    pub fn filter(self, field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        self.condition(Condition::new(field, operator, value))
    }

    /// Appends a sort key. Keys are applied in the order they are added.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort.push(SortKey { field: field.into(), direction });
        self
    }

    /// Sets the maximum number of records to return.
    pub fn limit(mut self, limit: i64) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}
