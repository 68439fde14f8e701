//! Collection store: the in-memory record map mirrored to one property slot.
//!
//! A [`Collection`] is opened from a property store, loads the slot once, answers reads from
//! memory and rewrites the whole slot after every successful mutation. Mutations are
//! all-or-nothing: if applying a change or persisting it fails, the in-memory map is
//! restored to the state it had before the call.
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
//! let props = InMemoryProperties::new();
//! let mut users = CollectionBuilder::new("users")
//!     .validator("age", |v| v.as_u64().is_some_and(|age| age < 150))
//!     .open::<User, _>(props)?;
//!
//! let id = users.create(User { name: "Alice".into(), age: 30 })?;
//! users.update(&id, serde_json::json!({ "age": 31 }))?;
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use std::{collections::HashMap, fmt};
use tracing::{debug, info, trace, warn};

use crate::{
    error::{RejectedEntry, StoreError, StoreResult},
    evaluator::{RecordEvaluator, compare_by},
    query::Query,
    record::{Entry, Record, RecordExt, RecordId, value_type},
    storage::PropertyStore,
    validate::Validators,
};

/// Longest allowed collection name, in characters.
pub const MAX_COLLECTION_NAME_LEN: usize = 16;

/// How many identifiers are drawn before giving up with [`StoreError::DuplicateKey`].
pub const MAX_ID_ATTEMPTS: usize = 100;

/// Source of fresh record identifiers.
pub type IdGenerator = Box<dyn FnMut() -> RecordId + Send>;

/// A stored record with its cached object form.
#[derive(Debug, Clone)]
struct Slot<R> {
    id: RecordId,
    record: R,
    object: Map<String, Value>,
}

/// Insertion-ordered map from id to record.
#[derive(Debug, Clone)]
struct RecordMap<R> {
    slots: Vec<Slot<R>>,
    index: HashMap<RecordId, usize>,
}

impl<R: Clone> RecordMap<R> {
    fn new() -> Self {
        Self { slots: Vec::new(), index: HashMap::new() }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    fn get(&self, id: &str) -> Option<&Slot<R>> {
        self.index.get(id).map(|&position| &self.slots[position])
    }

    /// Inserts a new slot. The caller guarantees the id is not present.
    fn insert(&mut self, slot: Slot<R>) {
        self.index.insert(slot.id.clone(), self.slots.len());
        self.slots.push(slot);
    }

    /// Replaces the record under an existing id, keeping its position.
    fn replace(&mut self, id: &str, record: R, object: Map<String, Value>) -> bool {
        match self.index.get(id) {
            Some(&position) => {
                let slot = &mut self.slots[position];
                slot.record = record;
                slot.object = object;
                true
            }
            None => false,
        }
    }

    fn remove(&mut self, id: &str) -> Option<Slot<R>> {
        let position = self.index.remove(id)?;
        let slot = self.slots.remove(position);

        for moved in &self.slots[position..] {
            if let Some(entry) = self.index.get_mut(moved.id.as_str()) {
                *entry -= 1;
            }
        }

        Some(slot)
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
    }

    fn iter(&self) -> impl Iterator<Item = &Slot<R>> {
        self.slots.iter()
    }
}

impl<R: Clone> Slot<R> {
    fn to_entry(&self) -> Entry<R> {
        Entry::new(self.id.clone(), self.record.clone())
    }
}

/// Configuration for opening a [`Collection`].
///
/// # Example
///
/// ```ignore
/// let users = CollectionBuilder::new("users")
///     .key_prefix("app.")
///     .validator("name", |v| v.is_string())
///     .open::<User, _>(props)?;
/// ```
pub struct CollectionBuilder {
    name: String,
    key_prefix: String,
    validators: Validators,
    id_generator: Option<IdGenerator>,
}

impl CollectionBuilder {
    /// Creates a builder for the collection `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_prefix: String::new(),
            validators: Validators::new(),
            id_generator: None,
        }
    }

    /// Sets a prefix prepended to the collection name to form the property key.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Adds a validator for a single field.
    pub fn validator<F>(mut self, field: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.validators.insert(field, predicate);
        self
    }

    /// Replaces the whole validator set.
    pub fn validators(mut self, validators: Validators) -> Self {
        self.validators = validators;
        self
    }

    /// Overrides the identifier source. Defaults to [`RecordId::random`].
    pub fn id_generator<F>(mut self, generator: F) -> Self
    where
        F: FnMut() -> RecordId + Send + 'static,
    {
        self.id_generator = Some(Box::new(generator));
        self
    }

    /// Opens the collection, loading any state persisted under its key.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidCollectionName`] if the name is empty or longer than 16 characters
    /// - [`StoreError::StorageRead`] if the property store cannot be read
    /// - [`StoreError::Initialization`] if the persisted state is malformed or any entry fails
    ///   validation; nothing is loaded in that case
    pub fn open<R: Record, S: PropertyStore>(self, store: S) -> StoreResult<Collection<R, S>> {
        let length = self.name.chars().count();
        if length == 0 || length > MAX_COLLECTION_NAME_LEN {
            return Err(StoreError::InvalidCollectionName(self.name));
        }

        let key = format!("{}{}", self.key_prefix, self.name);
        let records = match store.get_property(&key)? {
            Some(blob) => decode(&blob, &self.validators, |reason, entry| StoreError::Initialization { reason, entry })?,
            None => RecordMap::new(),
        };

        info!(
            target: "propdb::collection",
            collection = %self.name,
            records = records.len(),
            "opened collection"
        );

        Ok(Collection {
            name: self.name,
            key,
            store,
            validators: self.validators,
            id_generator: self.id_generator.unwrap_or_else(|| Box::new(RecordId::random) as IdGenerator),
            records,
        })
    }
}

impl fmt::Debug for CollectionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionBuilder")
            .field("name", &self.name)
            .field("key_prefix", &self.key_prefix)
            .field("validators", &self.validators)
            .finish_non_exhaustive()
    }
}

/// A named collection of records of type `R`, persisted to one key of `S`.
///
/// # Type Parameters
///
/// * `R` - The record type
/// * `S` - The property store the collection persists to
pub struct Collection<R: Record, S: PropertyStore> {
    name: String,
    key: String,
    store: S,
    validators: Validators,
    id_generator: IdGenerator,
    records: RecordMap<R>,
}

impl<R: Record, S: PropertyStore> Collection<R, S> {
    /// Opens the collection `name` without validators.
    ///
    /// # Errors
    ///
    /// See [`CollectionBuilder::open`].
    pub fn open(name: impl Into<String>, store: S) -> StoreResult<Self> {
        CollectionBuilder::new(name).open(store)
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the property key this collection persists to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the underlying property store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.len() == 0
    }

    /// Returns `true` if a record with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains(id)
    }

    /// Returns all ids in iteration order.
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|slot| slot.id.clone()).collect()
    }

    /// Inserts a new record and returns its generated id.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ValidationFailed`] listing every failing field
    /// - [`StoreError::Serialization`] if the record is not a JSON object
    /// - [`StoreError::DuplicateKey`] if no free id could be drawn
    /// - [`StoreError::StorageWrite`] if persisting fails
    pub fn create(&mut self, record: R) -> StoreResult<RecordId> {
        let object = record.to_object()?;
        self.check(&object, None)?;

        let id = self.transact("create", |this| {
            let id = this.next_id()?;
            this.records.insert(Slot { id: id.clone(), record, object });
            Ok(id)
        })?;

        debug!(target: "propdb::collection", collection = %self.name, %id, "created record");

        Ok(id)
    }

    /// Inserts several records at once.
    ///
    /// Every record is validated before any is inserted; a single failure rejects the whole
    /// batch. The collection is persisted once.
    ///
    /// # Errors
    ///
    /// See [`Collection::create`]. Validation errors carry the index of the first failing
    /// record.
    pub fn create_many(&mut self, records: impl IntoIterator<Item = R>) -> StoreResult<Vec<RecordId>> {
        let staged = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let object = record.to_object()?;
                self.check(&object, Some(index))?;
                Ok((record, object))
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let ids = self.transact("create_many", |this| {
            staged
                .into_iter()
                .map(|(record, object)| {
                    let id = this.next_id()?;
                    this.records.insert(Slot { id: id.clone(), record, object });
                    Ok(id)
                })
                .collect::<StoreResult<Vec<_>>>()
        })?;

        debug!(target: "propdb::collection", collection = %self.name, count = ids.len(), "created records");

        Ok(ids)
    }

    /// Merges the fields of `changes` over the record `id`.
    ///
    /// `changes` must serialize to a JSON object; each of its keys overwrites the record's
    /// key. The merged record is validated before it replaces the stored one.
    ///
    /// # Errors
    ///
    /// - [`StoreError::DocumentNotFound`] if `id` is absent
    /// - [`StoreError::InvalidUpdate`] if `changes` is not an object or the merge no longer
    ///   matches the record type
    /// - [`StoreError::ValidationFailed`] if the merged record fails validation
    /// - [`StoreError::StorageWrite`] if persisting fails
    pub fn update(&mut self, id: &str, changes: impl Serialize) -> StoreResult<()> {
        let (record, object) = self.merge(id, changes, None)?;

        self.transact("update", |this| {
            this.records.replace(id, record, object);
            Ok(())
        })?;

        debug!(target: "propdb::collection", collection = %self.name, %id, "updated record");

        Ok(())
    }

    /// Applies several partial updates as one unit.
    ///
    /// Every merge is computed against the records as they were before the call. If any id
    /// is missing or any merge fails, nothing is applied.
    ///
    /// # Errors
    ///
    /// See [`Collection::update`]. Errors carry the index of the first failing update.
    pub fn update_many<I, P>(&mut self, updates: impl IntoIterator<Item = (I, P)>) -> StoreResult<()>
    where
        I: AsRef<str>,
        P: Serialize,
    {
        let staged = updates
            .into_iter()
            .enumerate()
            .map(|(index, (id, changes))| {
                let id = id.as_ref().to_string();
                let (record, object) = self.merge(&id, changes, Some(index))?;
                Ok((id, record, object))
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let count = staged.len();
        self.transact("update_many", |this| {
            for (id, record, object) in staged {
                this.records.replace(&id, record, object);
            }
            Ok(())
        })?;

        debug!(target: "propdb::collection", collection = %self.name, count, "updated records");

        Ok(())
    }

    /// Removes the record `id`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::DocumentNotFound`] if `id` is absent
    /// - [`StoreError::StorageWrite`] if persisting fails
    pub fn delete(&mut self, id: &str) -> StoreResult<()> {
        self.ensure_present(id)?;

        self.transact("delete", |this| {
            this.records.remove(id);
            Ok(())
        })?;

        debug!(target: "propdb::collection", collection = %self.name, %id, "deleted record");

        Ok(())
    }

    /// Removes several records as one unit.
    ///
    /// Every id is checked before anything is removed; repeated ids are removed once.
    ///
    /// # Errors
    ///
    /// See [`Collection::delete`].
    pub fn delete_many<I: AsRef<str>>(&mut self, ids: impl IntoIterator<Item = I>) -> StoreResult<()> {
        let ids = ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect::<Vec<_>>();

        for id in &ids {
            self.ensure_present(id)?;
        }

        let count = ids.len();
        self.transact("delete_many", |this| {
            for id in &ids {
                this.records.remove(id);
            }
            Ok(())
        })?;

        debug!(target: "propdb::collection", collection = %self.name, count, "deleted records");

        Ok(())
    }

    /// Returns the record stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DocumentNotFound`] if `id` is absent.
    pub fn find_by_id(&self, id: &str) -> StoreResult<Entry<R>> {
        self.records
            .get(id)
            .map(Slot::to_entry)
            .ok_or_else(|| self.not_found(id))
    }

    /// Returns the first record matching `predicate`, in iteration order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DocumentNotFound`] if nothing matches.
    pub fn find_one<F>(&self, predicate: F) -> StoreResult<Entry<R>>
    where
        F: Fn(&R) -> bool,
    {
        self.records
            .iter()
            .find(|slot| predicate(&slot.record))
            .map(Slot::to_entry)
            .ok_or_else(|| self.not_found("<predicate>"))
    }

    /// Returns every record matching `predicate`, in iteration order.
    pub fn find_many<F>(&self, predicate: F) -> Vec<Entry<R>>
    where
        F: Fn(&R) -> bool,
    {
        self.records
            .iter()
            .filter(|slot| predicate(&slot.record))
            .map(Slot::to_entry)
            .collect()
    }

    /// Returns every record, in iteration order.
    pub fn find_all(&self) -> Vec<Entry<R>> {
        self.records.iter().map(Slot::to_entry).collect()
    }

    /// Counts the records matching `predicate`.
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&R) -> bool,
    {
        self.records
            .iter()
            .filter(|slot| predicate(&slot.record))
            .count()
    }

    /// Case-insensitive substring search.
    ///
    /// `term` is matched against the string form of each named field, or of every field
    /// when `fields` is `None`. Fields without a string form (null, arrays, objects) never
    /// match.
    pub fn find_like(&self, term: &str, fields: Option<&[&str]>) -> Vec<Entry<R>> {
        let needle = term.to_lowercase();

        self.records
            .iter()
            .filter(|slot| RecordEvaluator::new(&slot.object).matches_term(&needle, fields))
            .map(Slot::to_entry)
            .collect()
    }

    /// Runs a structured query: filter by every condition, then sort, then limit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidQuery`] if the query is malformed.
    pub fn query(&self, query: &Query) -> StoreResult<Vec<Entry<R>>> {
        query.validate()?;

        let mut matched = self
            .records
            .iter()
            .filter(|slot| RecordEvaluator::new(&slot.object).matches_all(&query.conditions))
            .collect::<Vec<_>>();

        if !query.sort.is_empty() {
            matched.sort_by(|a, b| compare_by(&a.object, &b.object, &query.sort));
        }

        if let Some(limit) = query.max_results() {
            matched.truncate(limit);
        }

        trace!(
            target: "propdb::collection",
            collection = %self.name,
            matched = matched.len(),
            "ran query"
        );

        Ok(matched.into_iter().map(Slot::to_entry).collect())
    }

    /// Serializes the whole collection as a JSON list of `[id, record]` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Export`] if serialization fails.
    pub fn export(&self) -> StoreResult<String> {
        encode(&self.records).map_err(|err| StoreError::Export(err.to_string()))
    }

    /// Replaces the whole collection with the contents of an export.
    ///
    /// Every entry is parsed and validated first; if any is rejected the collection is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Import`] if the payload is malformed or any entry fails validation
    /// - [`StoreError::StorageWrite`] if persisting fails
    pub fn import(&mut self, data: &str) -> StoreResult<()> {
        let records = decode(data, &self.validators, |reason, entry| StoreError::Import { reason, entry })?;
        let count = records.len();

        self.transact("import", |this| {
            this.records = records;
            Ok(())
        })?;

        debug!(target: "propdb::collection", collection = %self.name, count, "imported records");

        Ok(())
    }

    /// Removes every record and persists the empty collection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageWrite`] if persisting fails.
    pub fn clear(&mut self) -> StoreResult<()> {
        self.transact("clear", |this| {
            this.records.clear();
            Ok(())
        })?;

        debug!(target: "propdb::collection", collection = %self.name, "cleared collection");

        Ok(())
    }

    /// Runs `apply` against the live map and persists the result.
    ///
    /// On any error the map is restored from a snapshot taken before `apply` ran.
    fn transact<T>(&mut self, operation: &'static str, apply: impl FnOnce(&mut Self) -> StoreResult<T>) -> StoreResult<T> {
        let snapshot = self.records.clone();
        let outcome = apply(self).and_then(|value| {
            self.persist()?;
            Ok(value)
        });

        if let Err(err) = &outcome {
            warn!(
                target: "propdb::collection",
                collection = %self.name,
                operation,
                error = %err,
                "rolled back collection"
            );
            self.records = snapshot;
        }

        outcome
    }

    fn persist(&self) -> StoreResult<()> {
        let blob = encode(&self.records)?;
        self.store.set_property(&self.key, &blob)
    }

    fn next_id(&mut self) -> StoreResult<RecordId> {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = (self.id_generator)();

            if !self.records.contains(&id) {
                return Ok(id);
            }

            trace!(target: "propdb::collection", collection = %self.name, %id, attempt, "id collision");
        }

        Err(StoreError::DuplicateKey(self.name.clone()))
    }

    fn check(&self, object: &Map<String, Value>, index: Option<usize>) -> StoreResult<()> {
        let fields = self.validators.check(object);

        if fields.is_empty() {
            Ok(())
        } else {
            Err(StoreError::ValidationFailed { index, fields })
        }
    }

    fn merge(&self, id: &str, changes: impl Serialize, index: Option<usize>) -> StoreResult<(R, Map<String, Value>)> {
        let slot = self.records.get(id).ok_or_else(|| self.not_found(id))?;
        let context = match index {
            Some(index) => format!(" at index {index}"),
            None => String::new(),
        };

        let changes = match serde_json::to_value(changes) {
            Ok(Value::Object(changes)) => changes,
            Ok(other) => {
                return Err(StoreError::InvalidUpdate(format!(
                    "changes for {id}{context} must be an object, got {}",
                    value_type(&other)
                )));
            }
            Err(err) => return Err(StoreError::InvalidUpdate(format!("changes for {id}{context}: {err}"))),
        };

        let mut merged = slot.object.clone();
        merged.extend(changes);
        self.check(&merged, index)?;

        let record = R::from_object(merged)
            .map_err(|err| StoreError::InvalidUpdate(format!("merged record {id}{context}: {err}")))?;
        let object = record.to_object()?;

        Ok((record, object))
    }

    fn ensure_present(&self, id: &str) -> StoreResult<()> {
        if self.records.contains(id) {
            Ok(())
        } else {
            Err(self.not_found(id))
        }
    }

    fn not_found(&self, id: &str) -> StoreError {
        StoreError::DocumentNotFound(id.to_string(), self.name.clone())
    }
}

impl<R: Record + fmt::Debug, S: PropertyStore> fmt::Debug for Collection<R, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("store", &self.store)
            .field("validators", &self.validators)
            .field("records", &self.records.len())
            .finish_non_exhaustive()
    }
}

fn encode<R: Record>(records: &RecordMap<R>) -> StoreResult<String> {
    let pairs = records
        .iter()
        .map(|slot| (slot.id.as_str(), &slot.object))
        .collect::<Vec<_>>();

    Ok(serde_json::to_string(&pairs)?)
}

/// Builds the load-path error for a rejected payload or entry.
type LoadError = fn(String, Option<RejectedEntry>) -> StoreError;

/// Parses a persisted blob into a record map, validating every entry.
///
/// Any failure is reported through `wrap`, so the caller decides which error tag applies.
fn decode<R: Record>(blob: &str, validators: &Validators, wrap: LoadError) -> StoreResult<RecordMap<R>> {
    let pairs: Vec<(String, Value)> = serde_json::from_str(blob)
        .map_err(|err| wrap(format!("malformed payload: {err}"), None))?;

    let mut records = RecordMap::new();

    for (index, (raw_id, value)) in pairs.into_iter().enumerate() {
        let reject = |reason: String, fields: Vec<String>| {
            wrap(reason, Some(RejectedEntry { index, id: raw_id.clone(), fields }))
        };

        let id = RecordId::parse(&raw_id)
            .map_err(|_| reject(format!("entry {index} has malformed id {raw_id:?}"), Vec::new()))?;
        if records.contains(&id) {
            return Err(reject(format!("entry {index} repeats id {id}"), Vec::new()));
        }

        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(reject(
                    format!("entry {index} ({id}) is a {}, not an object", value_type(&other)),
                    Vec::new(),
                ));
            }
        };

        let failures = validators.check(&object);
        if !failures.is_empty() {
            return Err(reject(
                format!("entry {index} ({id}) failed validation for fields [{}]", failures.join(", ")),
                failures,
            ));
        }

        let record = R::from_object(object.clone())
            .map_err(|err| reject(format!("entry {index} ({id}): {err}"), Vec::new()))?;
        let object = record
            .to_object()
            .map_err(|err| reject(format!("entry {index} ({id}): {err}"), Vec::new()))?;

        records.insert(Slot { id, record, object });
    }

    Ok(records)
}
