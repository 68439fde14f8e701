//! JSON file property store for propdb.
//!
//! This crate provides a file-backed implementation of the `PropertyStore` trait, for running
//! collections outside the host environment. All properties live in one JSON object file
//! that is rewritten atomically on every change.
//!
//! To use this store, include the `file` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! propdb = { version = "x.y.z", features = ["file"] }
//! ```
//!
//! # Features
//!
//! - **Persistent storage** - Properties survive process restarts
//! - **Atomic rewrites** - Each write goes to a temporary file that replaces the original
//! - **Readable format** - Optional pretty-printed output

#[allow(unused_extern_crates)]
extern crate self as propdb_file;

pub mod store;

pub use store::{FileProperties, FilePropertiesBuilder};
