use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::crm::brand::Brand;
use crate::crm::entity::{require, require_if_set, ParentRef, Schema};
use crate::crm::Error;

pub const BRAND_ID: &str = "brandId";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationKind {
    #[default]
    Messenger,
    Form,
    Facebook,
    Twitter,
}

impl FromStr for IntegrationKind {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "messenger" => Ok(Self::Messenger),
            "form" => Ok(Self::Form),
            "facebook" => Ok(Self::Facebook),
            "twitter" => Ok(Self::Twitter),
            _ => Err(format!("Unknown integration kind {input}")),
        }
    }
}

impl fmt::Display for IntegrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Messenger => "messenger",
            Self::Form => "form",
            Self::Facebook => "facebook",
            Self::Twitter => "twitter",
        };
        write!(f, "{kind}")
    }
}

/// A channel (messenger widget, lead form, social account) that feeds conversations
/// into a brand.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub name: String,
    pub kind: IntegrationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<String>,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<String>,
}

impl Schema for Integration {
    const KIND: &'static str = "Integration";
    const NAME: &'static str = "integration";
    const COLLECTION: &'static str = "integrations";
    const PARENTS: &'static [ParentRef] = &[ParentRef {
        field: BRAND_ID,
        name: "brand",
        kind: Brand::KIND,
        collection: Brand::COLLECTION,
        required: false,
    }];

    type Patch = IntegrationPatch;

    fn validate(&self) -> Result<(), Error> {
        require(Self::KIND, "name", &self.name)
    }

    fn validate_patch(patch: &IntegrationPatch) -> Result<(), Error> {
        require_if_set(Self::KIND, "name", patch.name.as_deref())
    }

    fn label(&self) -> String {
        format!("{} ({})", self.name, self.kind)
    }
}
