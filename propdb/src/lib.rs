//! Main propdb crate providing a record store over a host property slot.
//!
//! This crate is the primary entry point for users of propdb. It re-exports the core types
//! and the available property store backends.
//!
//! # Features
//!
//! - **Typed records** - Define records with Serde and store them under generated ids
//! - **Validation** - Per-field predicates, checked on every write and on load
//! - **Search and queries** - Predicate search, substring search, multi-condition queries
//!   with multi-key sort and limit
//! - **All-or-nothing batches** - Batch writes and imports either fully apply or leave the
//!   collection untouched
//!
//! # Quick Start
//!
//! ```ignore
//! use propdb::{prelude::*, memory::InMemoryProperties};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub name: String,
//!     pub age: u32,
//! }
//!
//! fn main() -> StoreResult<()> {
//!     let props = InMemoryProperties::new();
//!     let mut users = CollectionBuilder::new("users")
//!         .validator("age", |v| v.as_u64().is_some_and(|age| age < 150))
//!         .open::<User, _>(props)?;
//!
//!     users.create_many(vec![
//!         User { name: "John".into(), age: 20 },
//!         User { name: "Amy".into(), age: 17 },
//!     ])?;
//!
//!     let adults = users.query(
//!         &Query::builder()
//!             .condition(Filter::gte("age", 18))
//!             .sort("name", SortDirection::Asc)
//!             .build(),
//!     )?;
//!
//!     println!("Adults: {:?}", adults);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Several Collections
//!
//! A [`RecordStore`](store::RecordStore) shares one property store between collections,
//! each persisted under its own key:
//!
//! ```ignore
//! use propdb::{prelude::*, memory::InMemoryProperties};
//!
//! let store = RecordStore::new(InMemoryProperties::new()).with_prefix("app.");
//! let mut users = store.collection::<User>("users")?;
//! let mut notes = store.collection_with::<Note>(
//!     "notes",
//!     Validators::new().rule("title", |v| v.as_str().is_some_and(|s| !s.is_empty())),
//! )?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory properties for development and testing
//! - [`file`] - JSON file properties (requires `file` feature)

pub mod prelude;

pub use propdb_core::{collection, error, query, record, storage, store, validate};

// Re-export JSON types for convenience
pub use serde_json;

/// In-memory property store implementations.
pub mod memory {
    pub use propdb_memory::{InMemoryProperties, InMemoryPropertiesBuilder};
}

/// File-backed property store implementations.
///
/// This module is only available when the `file` feature is enabled.
#[cfg(feature = "file")]
pub mod file {
    pub use propdb_file::{FileProperties, FilePropertiesBuilder};
}
