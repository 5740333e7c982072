use std::collections::BTreeSet;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::config::Config;
use crate::store::file::FileStore;
use crate::store::remote::RemoteStore;
use crate::store::Backend::{File, Remote};

pub mod file;
pub mod memory;
pub mod remote;

/// A schema-less record as held by a collection.
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";

/// Access to named collections of JSON documents.
///
/// Filters are conjunctions of equality and membership conditions; patches are `$set`
/// style maps where only the given keys change.
pub trait DocumentStore {
    fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError>;
    fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError>;
    fn insert(&self, collection: &str, record: Document) -> Result<Document, StoreError>;
    fn update_one(&self, collection: &str, filter: &Filter, patch: &Document) -> Result<usize, StoreError>;
    fn update_many(&self, collection: &str, filter: &Filter, patch: &Document) -> Result<usize, StoreError>;
    fn delete_one(&self, collection: &str, filter: &Filter) -> Result<usize, StoreError>;
    /// Reject inserts and updates that would give two documents the same non-null `field`.
    fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Eq(String, Value),
    In(String, Vec<Value>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(id: &str) -> Self {
        Self::new().eq(ID_FIELD, id)
    }

    pub fn ids(ids: &[String]) -> Self {
        Self::new().any_of(ID_FIELD, ids)
    }

    #[must_use]
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(field.to_owned(), value.into()));
        self
    }

    #[must_use]
    pub fn any_of<V>(mut self, field: &str, values: &[V]) -> Self
    where
        V: Clone + Into<Value>,
    {
        self.conditions.push(Condition::In(
            field.to_owned(),
            values.iter().cloned().map(Into::into).collect(),
        ));
        self
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::Eq(field, value) => document.get(field).unwrap_or(&Value::Null) == value,
            Condition::In(field, values) => document.get(field).is_some_and(|value| values.contains(value)),
        })
    }

    /// Mongo style query object, `{"field": value, "other": {"$in": [...]}}`. A field named by
    /// more than one condition is rendered as `{"$and": [...]}` so every condition still applies.
    pub fn to_query(&self) -> Value {
        let mut fields = BTreeSet::new();
        if self.conditions.iter().all(|condition| fields.insert(condition.field())) {
            return Value::Object(self.conditions.iter().map(Condition::to_pair).collect());
        }

        let conditions = self
            .conditions
            .iter()
            .map(|condition| Value::Object(Map::from_iter([condition.to_pair()])))
            .collect();
        Value::Object(Map::from_iter([("$and".to_owned(), Value::Array(conditions))]))
    }
}

impl Condition {
    fn field(&self) -> &str {
        match self {
            Self::Eq(field, _) | Self::In(field, _) => field,
        }
    }

    fn to_pair(&self) -> (String, Value) {
        match self {
            Self::Eq(field, value) => (field.clone(), value.clone()),
            Self::In(field, values) => (
                field.clone(),
                Value::from(Map::from_iter([("$in".to_owned(), Value::Array(values.clone()))])),
            ),
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Request(String),
    Server { code: i64, message: String },
    InvalidRecord(&'static str),
    Duplicate { field: String, value: String },
    Locked(PathBuf),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Json(err) => write!(f, "json: {err}"),
            Self::Request(message) => write!(f, "request failed: {message}"),
            Self::Server { code, message } => write!(f, "server error {code}: {message}"),
            Self::InvalidRecord(message) => write!(f, "invalid record: {message}"),
            Self::Duplicate { field, value } => write!(f, "duplicate key {field}: {value}"),
            Self::Locked(path) => write!(
                f,
                "data file is locked by another process, remove {} if none is running",
                path.display()
            ),
        }
    }
}

impl Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Backend {
    File,
    Remote,
}

impl Backend {
    pub fn open(&self, config: &Config) -> Result<Box<dyn DocumentStore>, Box<dyn Error>> {
        match self {
            File => Ok(Box::new(FileStore::open(config.data_path()?)?)),
            Remote => Ok(Box::new(RemoteStore::from_config(config)?)),
        }
    }
}

impl FromStr for Backend {
    type Err = ();

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "file" | "" => Ok(File),
            "remote" => Ok(Remote),
            _ => Err(()),
        }
    }
}
