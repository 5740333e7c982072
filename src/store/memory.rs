use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{Document, DocumentStore, Filter, StoreError, ID_FIELD};

#[derive(Default, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    collections: BTreeMap<String, Vec<Document>>,
    #[serde(default)]
    unique: BTreeMap<String, BTreeSet<String>>,
}

impl State {
    fn has_unique(&self, collection: &str, field: &str) -> bool {
        self.unique.get(collection).is_some_and(|fields| fields.contains(field))
    }

    fn unique_fields(&self, collection: &str) -> impl Iterator<Item = &str> {
        std::iter::once(ID_FIELD).chain(
            self.unique
                .get(collection)
                .into_iter()
                .flat_map(|fields| fields.iter().map(String::as_str)),
        )
    }

    /// Fails when `candidate` would share a unique value with a document other than `skip`.
    fn check_unique(&self, collection: &str, candidate: &Document, skip: Option<usize>) -> Result<(), StoreError> {
        let Some(documents) = self.collections.get(collection) else {
            return Ok(());
        };

        for field in self.unique_fields(collection) {
            let Some(value) = candidate.get(field).filter(|value| !value.is_null()) else {
                continue;
            };

            let taken = documents
                .iter()
                .enumerate()
                .any(|(index, document)| Some(index) != skip && document.get(field) == Some(value));

            if taken {
                return Err(StoreError::Duplicate {
                    field: field.to_owned(),
                    value: display_value(value),
                });
            }
        }

        Ok(())
    }
}

fn display_value(value: &Value) -> String {
    value.as_str().map_or_else(|| value.to_string(), ToOwned::to_owned)
}

/// Collections held in process. Every operation runs under one lock, so a unique check and
/// the write that follows it cannot interleave with another caller.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: State) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn replace_state(&self, state: State) {
        *self.lock() = state;
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string_pretty(&*self.lock())?)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn has_unique_index(&self, collection: &str, field: &str) -> bool {
        self.lock().has_unique(collection, field)
    }

    /// Returns whether a new index was created.
    pub fn add_unique_index(&self, collection: &str, field: &str) -> Result<bool, StoreError> {
        let mut state = self.lock();
        if state.has_unique(collection, field) {
            return Ok(false);
        }

        let mut seen = BTreeSet::new();
        for value in state
            .collections
            .get(collection)
            .into_iter()
            .flatten()
            .filter_map(|document| document.get(field))
            .filter(|value| !value.is_null())
        {
            if !seen.insert(value.to_string()) {
                return Err(StoreError::Duplicate {
                    field: field.to_owned(),
                    value: display_value(value),
                });
            }
        }

        state.unique.entry(collection.to_owned()).or_default().insert(field.to_owned());
        debug!("Created unique index {collection}.{field}");

        Ok(true)
    }

    fn update(&self, collection: &str, filter: &Filter, patch: &Document, limit: Option<usize>) -> Result<usize, StoreError> {
        let mut state = self.lock();
        let matching: Vec<usize> = state
            .collections
            .get(collection)
            .into_iter()
            .flatten()
            .enumerate()
            .filter(|(_, document)| filter.matches(document))
            .map(|(index, _)| index)
            .take(limit.unwrap_or(usize::MAX))
            .collect();

        let mut updated = Vec::with_capacity(matching.len());
        for &index in &matching {
            let mut document = state.collections[collection][index].clone();
            for (key, value) in patch {
                document.insert(key.clone(), value.clone());
            }
            state.check_unique(collection, &document, Some(index))?;
            updated.push((index, document));
        }

        if let Some(documents) = state.collections.get_mut(collection) {
            for (index, document) in updated {
                documents[index] = document;
            }
        }

        Ok(matching.len())
    }
}

impl DocumentStore for MemoryStore {
    fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError> {
        Ok(self
            .lock()
            .collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|document| filter.matches(document)))
            .cloned())
    }

    fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .lock()
            .collections
            .get(collection)
            .into_iter()
            .flatten()
            .filter(|document| filter.matches(document))
            .cloned()
            .collect())
    }

    fn insert(&self, collection: &str, record: Document) -> Result<Document, StoreError> {
        if !record.get(ID_FIELD).is_some_and(Value::is_string) {
            return Err(StoreError::InvalidRecord("record has no string _id"));
        }

        let mut state = self.lock();
        state.check_unique(collection, &record, None)?;
        state.collections.entry(collection.to_owned()).or_default().push(record.clone());

        Ok(record)
    }

    fn update_one(&self, collection: &str, filter: &Filter, patch: &Document) -> Result<usize, StoreError> {
        self.update(collection, filter, patch, Some(1))
    }

    fn update_many(&self, collection: &str, filter: &Filter, patch: &Document) -> Result<usize, StoreError> {
        self.update(collection, filter, patch, None)
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> Result<usize, StoreError> {
        let mut state = self.lock();
        let Some(documents) = state.collections.get_mut(collection) else {
            return Ok(0);
        };

        match documents.iter().position(|document| filter.matches(document)) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        self.add_unique_index(collection, field).map(|_| ())
    }
}
