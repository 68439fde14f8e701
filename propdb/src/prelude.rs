//! Convenient re-exports of commonly used types from propdb.
//!
//! ```ignore
//! use propdb::prelude::*;
//! ```
//!
//! This provides access to:
//! - Record traits and identifiers
//! - Property store traits
//! - Collections, builders and the multi-collection store
//! - Query construction
//! - Error types

pub use propdb_core::{
    collection::{Collection, CollectionBuilder},
    store::RecordStore,
    record::{Entry, Record, RecordExt, RecordId},
    storage::{PropertyStore, PropertyStoreBuilder},
    validate::Validators,
    query::{Condition, Filter, Operator, Query, QueryBuilder, SortDirection, SortKey},
    error::{ErrorKind, RejectedEntry, StoreError, StoreResult},
};
