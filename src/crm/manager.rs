use std::cell::Cell;

use log::{debug, info, warn};
use serde_json::Value;

use crate::crm::allocator::{CodeAllocator, ID_LENGTH};
use crate::crm::entity::{from_document, to_document, ParentRef, Record, Schema, CODE_FIELD};
use crate::crm::{Error, REGISTRY};
use crate::store::{Document, DocumentStore, Filter, StoreError};

/// Inserts that may hit a code taken by a concurrent writer before giving up.
const MAX_INSERT_ATTEMPTS: u32 = 3;

/// CRUD for every registered entity type over one document store.
pub struct EntityManager<'a> {
    store: &'a dyn DocumentStore,
    allocator: CodeAllocator<'a>,
    indexed: Cell<bool>,
}

impl<'a> EntityManager<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self::with_allocator(store, CodeAllocator::new(store))
    }

    pub const fn with_allocator(store: &'a dyn DocumentStore, allocator: CodeAllocator<'a>) -> Self {
        Self {
            store,
            allocator,
            indexed: Cell::new(false),
        }
    }

    /// Unique `code` indexes are created on the first write of a coded type, never earlier.
    fn ensure_indexes(&self) -> Result<(), Error> {
        if self.indexed.get() {
            return Ok(());
        }

        for entity in REGISTRY.iter().filter(|entity| entity.coded) {
            self.store.ensure_unique_index(entity.collection, CODE_FIELD)?;
        }
        self.indexed.set(true);

        Ok(())
    }

    pub fn get_by_id_or_fail<S: Schema>(&self, id: &str) -> Result<Record<S>, Error> {
        self.find_one_by(&Filter::id(id), || format!("id {id}"))
    }

    pub fn get_by_code<S: Schema>(&self, code: &str) -> Result<Record<S>, Error> {
        self.find_one_by(&Filter::new().eq(CODE_FIELD, code), || format!("code {code}"))
    }

    /// First record matching `filter`, `NotFound` naming the query otherwise.
    pub fn find_one_or_fail<S: Schema>(&self, filter: &Filter) -> Result<Record<S>, Error> {
        self.find_one_by(filter, || format!("query {}", filter.to_query()))
    }

    fn find_one_by<S: Schema>(&self, filter: &Filter, by: impl FnOnce() -> String) -> Result<Record<S>, Error> {
        match self.store.find_one(S::COLLECTION, filter)? {
            Some(document) => from_document(document),
            None => Err(Error::NotFound { kind: S::KIND, by: by() }),
        }
    }

    pub fn find<S: Schema>(&self, filter: &Filter) -> Result<Vec<Record<S>>, Error> {
        self.store
            .find(S::COLLECTION, filter)?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub fn create<S: Schema>(&self, mut fields: S, owner_id: &str) -> Result<Record<S>, Error> {
        fields.apply_defaults();
        fields.validate()?;
        self.check_parents::<S>(&to_document(&fields)?, true)?;

        if !S::CODED {
            return self.insert(Record::new(self.allocator.token(ID_LENGTH)?, owner_id, fields));
        }

        self.ensure_indexes()?;
        let mut candidate = fields.code().map(ToOwned::to_owned);
        for _ in 0..MAX_INSERT_ATTEMPTS {
            fields.set_code(self.allocator.generate_code::<S>(candidate.as_deref())?);

            match self.insert(Record::new(self.allocator.token(ID_LENGTH)?, owner_id, fields.clone())) {
                Err(Error::Store(StoreError::Duplicate { field, value })) if field == CODE_FIELD => {
                    warn!("{} code {value} was taken concurrently, allocating another one", S::KIND);
                    candidate = None;
                }
                result => return result,
            }
        }

        Err(Error::CodeGenerationExhausted {
            kind: S::KIND,
            attempts: MAX_INSERT_ATTEMPTS,
        })
    }

    fn insert<S: Schema>(&self, record: Record<S>) -> Result<Record<S>, Error> {
        self.store.insert(S::COLLECTION, to_document(&record)?)?;
        info!("Created {} {}", S::KIND, record.id);
        Ok(record)
    }

    /// Merges the fields set in `patch`; everything else keeps its stored value.
    pub fn update<S: Schema>(&self, id: &str, patch: &S::Patch) -> Result<Record<S>, Error> {
        let existing = self.get_by_id_or_fail::<S>(id)?;
        S::validate_patch(patch)?;

        let document = to_document(patch)?;
        if document.is_empty() {
            debug!("Nothing to change on {} {id}", S::KIND);
            return Ok(existing);
        }

        self.check_parents::<S>(&document, false)?;
        if S::CODED {
            self.ensure_indexes()?;
        }

        match self.store.update_one(S::COLLECTION, &Filter::id(id), &document) {
            Err(StoreError::Duplicate { field, value }) => {
                return Err(Error::ValidationFailed(format!(
                    "{} {field} {value} is already in use",
                    S::KIND
                )))
            }
            result => result?,
        };

        self.get_by_id_or_fail(id)
    }

    /// Deletes one record. Children keep pointing at it; dangling references are logged.
    pub fn remove<S: Schema>(&self, id: &str) -> Result<Record<S>, Error> {
        let record = self.get_by_id_or_fail::<S>(id)?;

        for entity in REGISTRY {
            for parent in entity.parents.iter().filter(|parent| parent.collection == S::COLLECTION) {
                let dependents = self
                    .store
                    .find(entity.collection, &Filter::new().eq(parent.field, id))?
                    .len();
                if dependents > 0 {
                    warn!(
                        "{dependents} {} record(s) still reference {} {id} through {}",
                        entity.kind,
                        S::KIND,
                        parent.field
                    );
                }
            }
        }

        self.store.delete_one(S::COLLECTION, &Filter::id(id))?;
        info!("Removed {} {id}", S::KIND);

        Ok(record)
    }

    /// Points `parent_field` of every listed child at `parent_id` and returns the children.
    ///
    /// The update and the read-back are separate calls. A child removed in between is
    /// missing from the result rather than failing the whole operation.
    pub fn reassign_children<S: Schema>(
        &self,
        parent_field: &str,
        parent_id: &str,
        child_ids: &[String],
    ) -> Result<Vec<Record<S>>, Error> {
        let parent = S::PARENTS
            .iter()
            .find(|parent| parent.field == parent_field)
            .ok_or_else(|| Error::ValidationFailed(format!("{} has no parent field {parent_field}", S::KIND)))?;

        if self.store.find_one(parent.collection, &Filter::id(parent_id))?.is_none() {
            return Err(Error::not_found(parent.kind, parent_id));
        }

        if child_ids.is_empty() {
            return Ok(vec![]);
        }

        let filter = Filter::ids(child_ids);
        let patch = Document::from_iter([(parent.field.to_owned(), Value::from(parent_id))]);
        let modified = self.store.update_many(S::COLLECTION, &filter, &patch)?;
        info!(
            "Moved {modified} of {} {} record(s) to {} {parent_id}",
            child_ids.len(),
            S::KIND,
            parent.kind
        );

        self.find(&filter)
    }

    /// Every non-empty parent reference in `document` has to resolve. On create a missing
    /// required reference fails; on update only the references being changed are checked.
    fn check_parents<S: Schema>(&self, document: &Document, creating: bool) -> Result<(), Error> {
        for parent in S::PARENTS {
            match document.get(parent.field) {
                Some(Value::String(id)) if !id.is_empty() => self.check_parent(parent, id)?,
                Some(Value::String(_) | Value::Null) => missing_parent::<S>(parent)?,
                None if creating => missing_parent::<S>(parent)?,
                None => {}
                Some(_) => {
                    return Err(Error::ValidationFailed(format!(
                        "{} {} must be an id",
                        S::KIND,
                        parent.field
                    )))
                }
            }
        }

        Ok(())
    }

    fn check_parent(&self, parent: &ParentRef, id: &str) -> Result<(), Error> {
        if self.store.find_one(parent.collection, &Filter::id(id))?.is_none() {
            return Err(Error::not_found(parent.kind, id));
        }

        Ok(())
    }
}

fn missing_parent<S: Schema>(parent: &ParentRef) -> Result<(), Error> {
    if parent.required {
        return Err(Error::ValidationFailed(format!(
            "{} {} is required",
            S::KIND,
            parent.field
        )));
    }

    Ok(())
}
