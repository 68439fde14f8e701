//! In-memory property store for propdb.
//!
//! This crate provides a thread-safe, in-memory implementation of the `PropertyStore` trait.
//! It stands in for the host property service during development and testing.
//!
//! # Features
//!
//! - **Shared state** - Clones share the same underlying map
//! - **Seeding** - The builder can preload properties, e.g. a previously exported collection
//! - **Fault injection** - Writes can be made to fail to exercise rollback paths
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
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let props = InMemoryProperties::builder().build()?;
//!     let mut users = Collection::<User, _>::open("users", props.clone())?;
//!
//!     users.create(User { name: "Alice".to_string() })?;
//!     assert!(props.get_property("users")?.is_some());
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as propdb_memory;

pub mod store;

pub use store::{InMemoryProperties, InMemoryPropertiesBuilder};
