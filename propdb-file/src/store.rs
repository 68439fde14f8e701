use parking_lot::RwLock;
use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::NamedTempFile;
use tracing::{debug, trace};

use propdb_core::{
    error::{StoreError, StoreResult},
    storage::{PropertyStore, PropertyStoreBuilder},
};

type PropertyMap = BTreeMap<String, String>;

/// Property store persisted to a single JSON file.
///
/// The file holds one JSON object mapping keys to string values. The whole map is kept in
/// memory; a write first produces the new file contents and only updates the in-memory map
/// once the file has been replaced.
#[derive(Clone, Debug)]
pub struct FileProperties {
    path: PathBuf,
    pretty: bool,
    properties: Arc<RwLock<PropertyMap>>,
}

impl FileProperties {
    pub fn builder(path: impl Into<PathBuf>) -> FilePropertiesBuilder {
        FilePropertiesBuilder::new(path)
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_file(&self, properties: &PropertyMap, key: &str) -> StoreResult<()> {
        let contents = if self.pretty {
            serde_json::to_vec_pretty(properties)?
        } else {
            serde_json::to_vec(properties)?
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir).map_err(|e| StoreError::storage_write(key, e))?;
        file.write_all(&contents)
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| StoreError::storage_write(key, e))?;
        file.persist(&self.path)
            .map_err(|e| StoreError::storage_write(key, e.error))?;

        trace!(
            target: "propdb::file",
            path = %self.path.display(),
            bytes = contents.len(),
            "rewrote property file"
        );

        Ok(())
    }

    fn update<F>(&self, key: &str, change: F) -> StoreResult<()>
    where
        F: FnOnce(&mut PropertyMap),
    {
        let mut guard = self.properties.write();
        let mut next = guard.clone();
        change(&mut next);

        self.write_file(&next, key)?;
        *guard = next;

        Ok(())
    }
}

impl PropertyStore for FileProperties {
    fn get_property(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.properties.read().get(key).cloned())
    }

    fn set_property(&self, key: &str, value: &str) -> StoreResult<()> {
        self.update(key, |properties| {
            properties.insert(key.to_string(), value.to_string());
        })
    }

    fn delete_property(&self, key: &str) -> StoreResult<()> {
        if !self.properties.read().contains_key(key) {
            return Ok(());
        }

        self.update(key, |properties| {
            properties.remove(key);
        })
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.properties.read().keys().cloned().collect())
    }
}

/// Builder for [`FileProperties`].
///
/// # Example
///
/// ```ignore
/// use propdb_file::FileProperties;
/// use propdb::storage::PropertyStoreBuilder;
///
/// let props = FileProperties::builder("data/props.json")
///     .pretty(true)
///     .build()?;
/// ```
#[derive(Debug)]
pub struct FilePropertiesBuilder {
    path: PathBuf,
    create_if_missing: bool,
    pretty: bool,
}

impl FilePropertiesBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create_if_missing: true,
            pretty: false,
        }
    }

    /// Whether a missing file is treated as an empty store (the default) or an error.
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// Whether to pretty-print the file.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl PropertyStoreBuilder for FilePropertiesBuilder {
    type Store = FileProperties;

    fn build(self) -> StoreResult<Self::Store> {
        let properties = match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => PropertyMap::new(),
            Ok(contents) => serde_json::from_str::<PropertyMap>(&contents).map_err(|e| {
                StoreError::initialization(format!("{}: {e}", self.path.display()))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound && self.create_if_missing => PropertyMap::new(),
            Err(e) => {
                return Err(StoreError::initialization(format!("{}: {e}", self.path.display())));
            }
        };

        debug!(
            target: "propdb::file",
            path = %self.path.display(),
            properties = properties.len(),
            "loaded property file"
        );

        Ok(FileProperties {
            path: self.path,
            pretty: self.pretty,
            properties: Arc::new(RwLock::new(properties)),
        })
    }
}
