//! Error types and result types for record store operations.
//!
//! Every fallible operation in this crate returns [`StoreResult<T>`]. The error enum carries
//! one variant per failure category; [`StoreError::kind`] gives the bare tag when callers
//! only want to branch on the category.

use serde_json::Error as SerdeJsonError;
use std::fmt;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a record store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// One or more field validators rejected a record.
    ///
    /// `index` is the position of the offending record in a batch call, `fields` lists
    /// every failing field in validator declaration order.
    #[error("Validation failed for fields [{}]{}", .fields.join(", "), batch_context(.index))]
    ValidationFailed {
        index: Option<usize>,
        fields: Vec<String>,
    },
    /// The collection name is empty or longer than the allowed maximum.
    #[error("Invalid collection name: {0:?}")]
    InvalidCollectionName(String),
    /// The property store failed to read a key.
    #[error("Storage read error on {key}: {reason}")]
    StorageRead { key: String, reason: String },
    /// The property store failed to write a key.
    #[error("Storage write error on {key}: {reason}")]
    StorageWrite { key: String, reason: String },
    /// A record could not be converted to or from its JSON form.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The requested record was not found in the collection.
    /// The first argument is the record id, the second is the collection name.
    #[error("Document {0} not found in collection {1}")]
    DocumentNotFound(String, String),
    /// No free identifier could be generated for the collection.
    #[error("Duplicate key in collection {0}: identifier space exhausted")]
    DuplicateKey(String),
    /// A partial update was malformed or produced a record of the wrong shape.
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),
    /// A query was malformed (bad operator, empty field, negative limit, ...).
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// The persisted state could not be loaded when the collection was opened.
    ///
    /// `entry` is set when one entry of the payload was rejected rather than the payload
    /// as a whole.
    #[error("Initialization error: {reason}")]
    Initialization {
        reason: String,
        entry: Option<RejectedEntry>,
    },
    /// An import payload was rejected.
    #[error("Import error: {reason}")]
    Import {
        reason: String,
        entry: Option<RejectedEntry>,
    },
    /// The collection could not be exported.
    #[error("Export error: {0}")]
    Export(String),
    /// An unknown error occurred.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// The entry of a persisted or imported payload that made loading fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    /// Position of the entry in the payload.
    pub index: usize,
    /// The entry's id as written in the payload.
    pub id: String,
    /// Fields whose validators rejected the entry, empty for other failures.
    pub fields: Vec<String>,
}

/// The bare category of a [`StoreError`], without its detail payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ValidationFailed,
    InvalidCollectionName,
    StorageRead,
    StorageWrite,
    Serialization,
    DocumentNotFound,
    DuplicateKey,
    InvalidUpdate,
    InvalidQuery,
    Initialization,
    Import,
    Export,
    Unknown,
}

impl ErrorKind {
    /// Returns the stable tag name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationFailed => "VALIDATION_FAILED",
            ErrorKind::InvalidCollectionName => "INVALID_COLLECTION_NAME",
            ErrorKind::StorageRead => "STORAGE_READ_ERROR",
            ErrorKind::StorageWrite => "STORAGE_WRITE_ERROR",
            ErrorKind::Serialization => "SERIALIZATION_ERROR",
            ErrorKind::DocumentNotFound => "DOCUMENT_NOT_FOUND",
            ErrorKind::DuplicateKey => "DUPLICATE_KEY",
            ErrorKind::InvalidUpdate => "INVALID_UPDATE",
            ErrorKind::InvalidQuery => "INVALID_QUERY",
            ErrorKind::Initialization => "INITIALIZATION_ERROR",
            ErrorKind::Import => "IMPORT_ERROR",
            ErrorKind::Export => "EXPORT_ERROR",
            ErrorKind::Unknown => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StoreError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            StoreError::InvalidCollectionName(_) => ErrorKind::InvalidCollectionName,
            StoreError::StorageRead { .. } => ErrorKind::StorageRead,
            StoreError::StorageWrite { .. } => ErrorKind::StorageWrite,
            StoreError::Serialization(_) => ErrorKind::Serialization,
            StoreError::DocumentNotFound(..) => ErrorKind::DocumentNotFound,
            StoreError::DuplicateKey(_) => ErrorKind::DuplicateKey,
            StoreError::InvalidUpdate(_) => ErrorKind::InvalidUpdate,
            StoreError::InvalidQuery(_) => ErrorKind::InvalidQuery,
            StoreError::Initialization { .. } => ErrorKind::Initialization,
            StoreError::Import { .. } => ErrorKind::Import,
            StoreError::Export(_) => ErrorKind::Export,
            StoreError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Creates an initialization error that is not tied to one entry.
    pub fn initialization(reason: impl fmt::Display) -> Self {
        StoreError::Initialization { reason: reason.to_string(), entry: None }
    }

    /// Creates an import error that is not tied to one entry.
    pub fn import(reason: impl fmt::Display) -> Self {
        StoreError::Import { reason: reason.to_string(), entry: None }
    }

    /// Returns the rejected entry of a load failure, if the failure names one.
    pub fn rejected_entry(&self) -> Option<&RejectedEntry> {
        match self {
            StoreError::Initialization { entry, .. } | StoreError::Import { entry, .. } => entry.as_ref(),
            _ => None,
        }
    }

    /// Creates a storage read error for the given key.
    pub fn storage_read(key: impl Into<String>, reason: impl fmt::Display) -> Self {
        StoreError::StorageRead { key: key.into(), reason: reason.to_string() }
    }

    /// Creates a storage write error for the given key.
    pub fn storage_write(key: impl Into<String>, reason: impl fmt::Display) -> Self {
        StoreError::StorageWrite { key: key.into(), reason: reason.to_string() }
    }
}

/// A specialized `Result` type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<SerdeJsonError> for StoreError {
    fn from(err: SerdeJsonError) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

fn batch_context(index: &Option<usize>) -> String {
    match index {
        Some(index) => format!(" at index {index}"),
        None => String::new(),
    }
}
