use std::fmt;

use crate::crm::brand::Brand;
use crate::crm::conversation::Conversation;
use crate::crm::deals::{Board, Deal, Pipeline, Stage};
use crate::crm::entity::EntityType;
use crate::crm::integration::Integration;
use crate::store::StoreError;

pub mod allocator;
pub mod brand;
pub mod conversation;
pub mod deals;
pub mod entity;
pub mod integration;
pub mod manager;
pub mod mutations;

/// Every entity type the manager knows about. Adding a hierarchy level means adding its
/// `Schema` impl and listing it here.
pub const REGISTRY: &[EntityType] = &[
    EntityType::of::<Board>(),
    EntityType::of::<Pipeline>(),
    EntityType::of::<Stage>(),
    EntityType::of::<Deal>(),
    EntityType::of::<Brand>(),
    EntityType::of::<Integration>(),
    EntityType::of::<Conversation>(),
];

#[derive(Debug)]
pub enum Error {
    LoginRequired,
    NotFound { kind: &'static str, by: String },
    CodeGenerationExhausted { kind: &'static str, attempts: u32 },
    ValidationFailed(String),
    Store(StoreError),
}

impl Error {
    pub fn not_found(kind: &'static str, id: &str) -> Self {
        Self::NotFound {
            kind,
            by: format!("id {id}"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoginRequired => write!(f, "Login required"),
            Self::NotFound { kind, by } => write!(f, "{kind} not found with {by}"),
            Self::CodeGenerationExhausted { kind, attempts } => {
                write!(f, "Could not generate a unique {kind} code in {attempts} attempts")
            }
            Self::ValidationFailed(message) => write!(f, "Validation failed: {message}"),
            Self::Store(error) => write!(f, "Store error: {error}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<StoreError> for Error {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::crm::{Error, REGISTRY};
    use crate::store::StoreError;

    #[test]
    fn test_registry_parents_resolve() {
        let collections: HashSet<&str> = REGISTRY.iter().map(|entity| entity.collection).collect();
        assert_eq!(REGISTRY.len(), collections.len());

        for entity in REGISTRY {
            for parent in entity.parents {
                assert!(
                    collections.contains(parent.collection),
                    "{} refers to unknown collection {}",
                    entity.kind,
                    parent.collection
                );
            }
        }

        let coded: Vec<&str> = REGISTRY.iter().filter(|entity| entity.coded).map(|entity| entity.kind).collect();
        assert_eq!(vec!["Brand"], coded);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!("Login required", Error::LoginRequired.to_string());
        assert_eq!("Brand not found with id b1", Error::not_found("Brand", "b1").to_string());
        assert_eq!(
            "Could not generate a unique Brand code in 3 attempts",
            Error::CodeGenerationExhausted {
                kind: "Brand",
                attempts: 3
            }
            .to_string()
        );
        assert_eq!(
            "Store error: request failed: timeout",
            Error::from(StoreError::Request("timeout".to_owned())).to_string()
        );
    }
}
