//! Property store abstraction for the record store.
//!
//! The host persistence primitive is a flat key/value map of strings. A collection uses
//! exactly one key of it and rewrites the whole value on every mutation.
//!
//! # Traits
//!
//! - [`PropertyStore`]: the host slot interface
//! - [`PropertyStoreBuilder`]: factory trait for creating property store instances
//!
//! # Examples
//!
//! ```ignore
//! use propdb::storage::PropertyStore;
//!
//! let props = MyHostProperties::new();
//! props.set_property("users", "[]")?;
//! assert_eq!(props.get_property("users")?.as_deref(), Some("[]"));
//! # Ok::<(), propdb::error::StoreError>(())
//! ```

use std::{fmt::Debug, sync::Arc};

use crate::error::StoreResult;

/// Abstract interface over a host-provided string property store.
///
/// All calls are blocking. Methods take `&self` so a single host store can back several
/// collections at once; implementations that need mutation use interior mutability.
///
/// # Error Handling
///
/// Implementations report read failures as
/// [`StoreError::StorageRead`](crate::error::StoreError::StorageRead) and write failures
/// as [`StoreError::StorageWrite`](crate::error::StoreError::StorageWrite).
pub trait PropertyStore: Debug {
    /// Returns the value stored under `key`, or `None` if the key is absent.
    fn get_property(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_property(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes `key`. Removing an absent key is not an error.
    fn delete_property(&self, key: &str) -> StoreResult<()>;

    /// Lists every key currently present.
    fn keys(&self) -> StoreResult<Vec<String>>;
}

impl<S: PropertyStore + ?Sized> PropertyStore for &S {
    fn get_property(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get_property(key)
    }

    fn set_property(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set_property(key, value)
    }

    fn delete_property(&self, key: &str) -> StoreResult<()> {
        (**self).delete_property(key)
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        (**self).keys()
    }
}

impl<S: PropertyStore + ?Sized> PropertyStore for Box<S> {
    fn get_property(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get_property(key)
    }

    fn set_property(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set_property(key, value)
    }

    fn delete_property(&self, key: &str) -> StoreResult<()> {
        (**self).delete_property(key)
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        (**self).keys()
    }
}

impl<S: PropertyStore + ?Sized> PropertyStore for Arc<S> {
    fn get_property(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get_property(key)
    }

    fn set_property(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set_property(key, value)
    }

    fn delete_property(&self, key: &str) -> StoreResult<()> {
        (**self).delete_property(key)
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        (**self).keys()
    }
}

/// Factory trait for constructing property store instances.
///
/// Builders let a store validate its configuration (and load any existing state) before
/// it is handed to a collection.
pub trait PropertyStoreBuilder {
    /// The property store type this builder constructs.
    type Store: PropertyStore;

    /// Builds and returns a new property store instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or existing state cannot be loaded.
    fn build(self) -> StoreResult<Self::Store>;
}
