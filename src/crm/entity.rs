use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crm::Error;
use crate::store::{Document, StoreError};

pub const CODE_FIELD: &str = "code";

/// A child field pointing at the `_id` of a record in another collection.
#[derive(Debug, PartialEq, Eq)]
pub struct ParentRef {
    pub field: &'static str,
    pub name: &'static str,
    pub kind: &'static str,
    pub collection: &'static str,
    pub required: bool,
}

/// Registry entry for one entity type: its collection, parents and defaults.
pub trait Schema: Serialize + DeserializeOwned + Clone {
    const KIND: &'static str;
    /// Lowercase name used on the command line.
    const NAME: &'static str;
    const COLLECTION: &'static str;
    const PARENTS: &'static [ParentRef] = &[];
    /// Whether records carry a generated `code` unique within the collection.
    const CODED: bool = false;

    type Patch: Serialize + Default;

    /// Required non-parent fields.
    fn validate(&self) -> Result<(), Error>;

    fn validate_patch(_patch: &Self::Patch) -> Result<(), Error> {
        Ok(())
    }

    fn apply_defaults(&mut self) {}

    fn code(&self) -> Option<&str> {
        None
    }

    fn set_code(&mut self, _code: String) {}

    fn label(&self) -> String;
}

#[derive(Debug, Clone, Copy)]
pub struct EntityType {
    pub kind: &'static str,
    pub collection: &'static str,
    pub coded: bool,
    pub parents: &'static [ParentRef],
}

impl EntityType {
    pub const fn of<S: Schema>() -> Self {
        Self {
            kind: S::KIND,
            collection: S::COLLECTION,
            coded: S::CODED,
            parents: S::PARENTS,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Record<S> {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: S,
}

impl<S: Schema> Record<S> {
    pub fn new(id: String, user_id: &str, fields: S) -> Self {
        Self {
            id,
            user_id: user_id.to_owned(),
            created_at: Utc::now(),
            fields,
        }
    }

    /// Parent field names with the id each one holds, skipping unset references.
    pub fn parent_ids(&self) -> Vec<(&'static str, String)> {
        let Ok(document) = to_document(&self.fields) else {
            return vec![];
        };

        S::PARENTS
            .iter()
            .filter_map(|parent| {
                document
                    .get(parent.field)
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .map(|id| (parent.name, id.to_owned()))
            })
            .collect()
    }
}

impl<S: Schema> Display for Record<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}. {}", self.id, self.fields.label())
    }
}

pub fn to_document<T: Serialize>(value: &T) -> Result<Document, Error> {
    match serde_json::to_value(value).map_err(StoreError::from)? {
        Value::Object(document) => Ok(document),
        _ => Err(Error::ValidationFailed("record is not an object".to_owned())),
    }
}

pub fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, Error> {
    Ok(serde_json::from_value(Value::Object(document)).map_err(StoreError::from)?)
}

pub fn require(kind: &str, field: &str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::ValidationFailed(format!("{kind} {field} is required")));
    }

    Ok(())
}

/// A patch may leave a required field out, but may not blank it.
pub fn require_if_set(kind: &str, field: &str, value: Option<&str>) -> Result<(), Error> {
    value.map_or(Ok(()), |value| require(kind, field, value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::crm::deals::{Deal, Pipeline};
    use crate::crm::entity::{from_document, require, require_if_set, to_document, Record};

    #[test]
    fn test_record_layout() {
        let record = Record::new(
            "p1".to_owned(),
            "u1",
            Pipeline {
                name: "Leads".to_owned(),
                board_id: "b1".to_owned(),
            },
        );

        let document = to_document(&record).expect("Document");
        assert_eq!(json!("p1"), document["_id"]);
        assert_eq!(json!("u1"), document["userId"]);
        assert_eq!(json!("Leads"), document["name"]);
        assert_eq!(json!("b1"), document["boardId"]);
        assert!(document["createdAt"].is_string());

        let decoded: Record<Pipeline> = from_document(document).expect("Record");
        assert_eq!(record, decoded);
        assert_eq!("p1. Leads", decoded.to_string());
    }

    #[test]
    fn test_parent_ids_skip_unset() {
        let record = Record::new(
            "d1".to_owned(),
            "u1",
            Deal {
                stage_id: "s1".to_owned(),
                board_id: Some(String::new()),
                ..Default::default()
            },
        );

        assert_eq!(vec![("stage", "s1".to_owned())], record.parent_ids());
    }

    #[test]
    fn test_require() {
        assert!(require("Board", "name", "Sales").is_ok());
        assert!(require("Board", "name", "  ").is_err());
        assert!(require_if_set("Board", "name", None).is_ok());
        assert_eq!(
            "Validation failed: Board name is required",
            require_if_set("Board", "name", Some("")).expect_err("Blank").to_string()
        );
    }
}
