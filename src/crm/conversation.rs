use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::crm::entity::{require, require_if_set, ParentRef, Schema};
use crate::crm::integration::Integration;
use crate::crm::Error;

pub const INTEGRATION_ID: &str = "integrationId";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    #[default]
    Open,
    Closed,
}

impl ConversationStatus {
    /// Resolving an open conversation closes it, reopening a closed one opens it.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Open => Self::Closed,
            Self::Closed => Self::Open,
        }
    }
}

impl FromStr for ConversationStatus {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("Unknown conversation status {input}")),
        }
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub content: String,
    pub integration_id: String,
    #[serde(default)]
    pub status: ConversationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ConversationStatus>,
}

impl Schema for Conversation {
    const KIND: &'static str = "Conversation";
    const NAME: &'static str = "conversation";
    const COLLECTION: &'static str = "conversations";
    const PARENTS: &'static [ParentRef] = &[ParentRef {
        field: INTEGRATION_ID,
        name: "integration",
        kind: Integration::KIND,
        collection: Integration::COLLECTION,
        required: true,
    }];

    type Patch = ConversationPatch;

    fn validate(&self) -> Result<(), Error> {
        require(Self::KIND, "content", &self.content)
    }

    fn validate_patch(patch: &ConversationPatch) -> Result<(), Error> {
        require_if_set(Self::KIND, "content", patch.content.as_deref())
    }

    fn label(&self) -> String {
        format!("[{}] {}", self.status, self.content)
    }
}
