//! A small record store layered on a host-provided key/value property slot.
//!
//! This crate is the core of the propdb project and provides:
//!
//! - **Record traits** ([`record`]) - Record identity and JSON object conversion
//! - **Property store abstraction** ([`storage`]) - The host get/set string interface
//! - **Validation** ([`validate`]) - Ordered per-field predicates
//! - **Query API** ([`query`]) - Conditions, multi-key sorting and limits
//! - **Collections** ([`collection`]) - The in-memory record map mirrored to one slot
//! - **Record store** ([`store`]) - Several collections over one property store
//! - **Error handling** ([`error`]) - Tagged error type and result alias
//!
//! # Example
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
//! let mut users = Collection::<User, _>::open("users", InMemoryProperties::new())?;
//! let id = users.create(User { name: "John".into(), age: 20 })?;
//! assert_eq!(users.find_by_id(&id)?.record.name, "John");
//! ```

#[allow(unused_extern_crates)]
extern crate self as propdb_core;

pub mod collection;
pub mod error;
mod evaluator;
pub mod query;
pub mod record;
pub mod storage;
pub mod store;
pub mod validate;
