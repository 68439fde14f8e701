//! Record store interface over a shared property store.
//!
//! A [`RecordStore`] owns one host property store and hands out collections that persist to
//! it, one key per collection. An optional key prefix namespaces all of them.
//!
//! # Example
//!
//! ```ignore
//! use propdb::{store::RecordStore, memory::InMemoryProperties};
//!
//! let store = RecordStore::new(InMemoryProperties::new()).with_prefix("app.");
//! let mut users = store.collection::<User>("users")?;
//! let mut orders = store.collection::<Order>("orders")?;
//!
//! assert_eq!(store.collection_names()?, vec!["orders", "users"]);
//! ```

use serde_json::Value;
use tracing::debug;

use crate::{
    collection::{Collection, CollectionBuilder},
    error::StoreResult,
    record::Record,
    storage::PropertyStore,
    validate::Validators,
};

/// A set of collections sharing one property store.
///
/// # Type Parameters
///
/// * `S` - The property store implementation type
#[derive(Debug)]
pub struct RecordStore<S: PropertyStore> {
    properties: S,
    key_prefix: String,
}

impl<S: PropertyStore> RecordStore<S> {
    /// Creates a new record store over the given property store.
    pub fn new(properties: S) -> Self {
        Self { properties, key_prefix: String::new() }
    }

    /// Namespaces every collection key under `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Returns the underlying property store.
    pub fn properties(&self) -> &S {
        &self.properties
    }

    /// Consumes the record store and returns the property store.
    pub fn into_inner(self) -> S {
        self.properties
    }

    /// Returns a builder for a collection in this store, with the store's key prefix applied.
    pub fn builder(&self, name: impl Into<String>) -> CollectionBuilder {
        CollectionBuilder::new(name).key_prefix(self.key_prefix.clone())
    }

    /// Opens the collection `name` without validators.
    ///
    /// # Errors
    ///
    /// See [`CollectionBuilder::open`].
    pub fn collection<R: Record>(&self, name: &str) -> StoreResult<Collection<R, &S>> {
        self.builder(name).open(&self.properties)
    }

    /// Opens the collection `name` with the given validators.
    ///
    /// # Errors
    ///
    /// See [`CollectionBuilder::open`].
    pub fn collection_with<R: Record>(
        &self,
        name: &str,
        validators: Validators,
    ) -> StoreResult<Collection<R, &S>> {
        self.builder(name)
            .validators(validators)
            .open(&self.properties)
    }

    /// Lists the names of all collections persisted under this store's prefix, sorted.
    ///
    /// A key counts as a collection only if its value is a list of id/record pairs, so other
    /// properties sharing the store are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the property store cannot list or read its keys.
    pub fn collection_names(&self) -> StoreResult<Vec<String>> {
        let mut names = Vec::new();

        for key in self.properties.keys()? {
            let Some(name) = key.strip_prefix(self.key_prefix.as_str()) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }

            let is_collection = self
                .properties
                .get_property(&key)?
                .is_some_and(|blob| serde_json::from_str::<Vec<(String, Value)>>(&blob).is_ok());
            if is_collection {
                names.push(name.to_string());
            }
        }

        names.sort();

        Ok(names)
    }

    /// Deletes the persisted state of the collection `name`.
    ///
    /// Collections already opened on that name keep their in-memory records and write them
    /// back on their next mutation.
    ///
    /// # Errors
    ///
    /// Returns an error if the property store cannot delete the key.
    pub fn drop_collection(&self, name: &str) -> StoreResult<()> {
        let key = format!("{}{}", self.key_prefix, name);
        self.properties.delete_property(&key)?;

        debug!(target: "propdb::store", collection = name, "dropped collection");

        Ok(())
    }
}
