//! In-memory property storage.
//!
//! Properties are kept in a `HashMap` behind a shared read-write lock.

use parking_lot::RwLock;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tracing::trace;

use propdb_core::{
    error::{StoreError, StoreResult},
    storage::{PropertyStore, PropertyStoreBuilder},
};

type PropertyMap = HashMap<String, String>;

/// Thread-safe in-memory property store.
///
/// `InMemoryProperties` is cloneable and uses an `Arc`-wrapped internal state, so several
/// collections (or a test and the collection under test) can observe the same properties.
///
/// # Example
///
/// ```ignore
/// use propdb_memory::InMemoryProperties;
/// use propdb::storage::PropertyStore;
///
/// let props = InMemoryProperties::new();
/// props.set_property("users", "[]")?;
/// assert_eq!(props.get_property("users")?.as_deref(), Some("[]"));
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryProperties {
    /// key -> serialized value
    properties: Arc<RwLock<PropertyMap>>,
    /// When set, every write fails with a storage write error.
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryProperties {
    /// Creates a new empty property store.
    pub fn new() -> Self {
        Self {
            properties: Arc::new(RwLock::new(PropertyMap::new())),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a builder for constructing an `InMemoryProperties` with preloaded values.
    pub fn builder() -> InMemoryPropertiesBuilder {
        InMemoryPropertiesBuilder::default()
    }

    /// Makes every subsequent write (and delete) fail until switched off again.
    ///
    /// Reads are unaffected.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of properties currently stored.
    pub fn len(&self) -> usize {
        self.properties.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.read().is_empty()
    }

    fn check_writable(&self, key: &str) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::storage_write(key, "writes are disabled"));
        }

        Ok(())
    }
}

impl PropertyStore for InMemoryProperties {
    fn get_property(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.properties.read().get(key).cloned())
    }

    fn set_property(&self, key: &str, value: &str) -> StoreResult<()> {
        self.check_writable(key)?;
        self.properties
            .write()
            .insert(key.to_string(), value.to_string());

        trace!(target: "propdb::memory", key, bytes = value.len(), "set property");

        Ok(())
    }

    fn delete_property(&self, key: &str) -> StoreResult<()> {
        self.check_writable(key)?;
        self.properties.write().remove(key);

        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.properties.read().keys().cloned().collect())
    }
}

/// Builder for constructing [`InMemoryProperties`] instances.
///
/// # Example
///
/// ```ignore
/// use propdb_memory::InMemoryProperties;
/// use propdb::storage::PropertyStoreBuilder;
///
/// let props = InMemoryProperties::builder()
///     .property("users", exported)
///     .build()?;
/// ```
#[derive(Default, Debug)]
pub struct InMemoryPropertiesBuilder {
    initial: PropertyMap,
}

impl InMemoryPropertiesBuilder {
    /// Preloads `key` with `value`.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.initial.insert(key.into(), value.into());
        self
    }
}

impl PropertyStoreBuilder for InMemoryPropertiesBuilder {
    type Store = InMemoryProperties;

    /// Builds and returns a new [`InMemoryProperties`] instance.
    ///
    /// This always succeeds.
    fn build(self) -> StoreResult<Self::Store> {
        Ok(InMemoryProperties {
            properties: Arc::new(RwLock::new(self.initial)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        })
    }
}
