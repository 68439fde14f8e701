//! Core traits and types for record representation and identity.
//!
//! Records are plain serde types. Their JSON object form is what validators see, what
//! queries evaluate against, and what gets persisted to the property slot.

use rand::RngCore;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::{borrow::Borrow, fmt, ops::Deref, str::FromStr};

use crate::error::{StoreError, StoreResult};

/// Number of hex characters in a [`RecordId`].
pub const RECORD_ID_LEN: usize = 16;

/// Core trait that all records stored in a collection must implement.
///
/// It is implemented automatically for every cloneable serde type, so a record type only
/// needs `#[derive(Clone, Serialize, Deserialize)]`. The type must serialize to a JSON
/// object (a struct or a map); anything else is rejected when it is written.
///
/// # Example
///
/// ```ignore
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct User {
///     pub name: String,
///     pub age: u32,
/// }
/// ```
pub trait Record: Serialize + DeserializeOwned + Clone + 'static {}

impl<T> Record for T where T: Serialize + DeserializeOwned + Clone + 'static {}

/// Extension trait converting records to and from their JSON object form.
pub trait RecordExt: Record {
    /// Converts this record into a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if serialization fails or the record does not
    /// serialize to an object.
    fn to_object(&self) -> StoreResult<Map<String, Value>>;

    /// Creates a record from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if the object does not match the record shape.
    fn from_object(object: Map<String, Value>) -> StoreResult<Self>;
}

impl<R: Record> RecordExt for R {
    fn to_object(&self) -> StoreResult<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(object) => Ok(object),
            other => Err(StoreError::Serialization(format!(
                "record must serialize to a JSON object, got {}",
                value_type(&other)
            ))),
        }
    }

    fn from_object(object: Map<String, Value>) -> StoreResult<Self> {
        Ok(serde_json::from_value(Value::Object(object))?)
    }
}

/// A 16 character lowercase hexadecimal record identifier.
///
/// Identifiers are generated by the collection on insert and never change afterwards.
/// A `RecordId` dereferences to `&str`, so it can be passed wherever an id string is taken.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    /// Draws a fresh random identifier.
    pub fn random() -> Self {
        let mut bytes = [0u8; RECORD_ID_LEN / 2];
        rand::thread_rng().fill_bytes(&mut bytes);

        RecordId(hex::encode(bytes))
    }

    /// Parses an identifier, checking its length and alphabet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidQuery`] if `value` is not 16 lowercase hex characters.
    pub fn parse(value: &str) -> StoreResult<Self> {
        if is_record_id(value) {
            Ok(RecordId(value.to_string()))
        } else {
            Err(StoreError::InvalidQuery(format!("malformed record id {value:?}")))
        }
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Returns `true` if `value` has the shape of a record identifier.
///
/// Only the lowercase form is accepted, so an id string has exactly one spelling.
pub fn is_record_id(value: &str) -> bool {
    value.len() == RECORD_ID_LEN && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Deref for RecordId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RecordId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for RecordId {
    type Err = StoreError;

    fn from_str(s: &str) -> StoreResult<Self> {
        RecordId::parse(s)
    }
}

impl TryFrom<String> for RecordId {
    type Error = StoreError;

    fn try_from(value: String) -> StoreResult<Self> {
        RecordId::parse(&value)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

/// A record together with the identifier it is stored under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry<R> {
    pub id: RecordId,
    pub record: R,
}

impl<R> Entry<R> {
    pub fn new(id: RecordId, record: R) -> Self {
        Self { id, record }
    }

    /// Splits the entry into its id and record.
    pub fn into_parts(self) -> (RecordId, R) {
        (self.id, self.record)
    }
}

pub(crate) fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
