use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::crm::entity::{require, require_if_set, Schema};
use crate::crm::Error;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmailKind {
    #[default]
    Simple,
    Custom,
}

impl FromStr for EmailKind {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "simple" => Ok(Self::Simple),
            "custom" => Ok(Self::Custom),
            _ => Err(format!("Unknown email config type {input}")),
        }
    }
}

impl fmt::Display for EmailKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// How conversation emails sent on behalf of a brand are rendered.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct EmailConfig {
    #[serde(rename = "type")]
    pub kind: EmailKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl EmailConfig {
    fn validate(&self) -> Result<(), Error> {
        if self.kind == EmailKind::Custom && self.template.as_deref().map_or(true, str::is_empty) {
            return Err(Error::ValidationFailed(
                "Custom email config needs a template".to_owned(),
            ));
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Candidate on input, the allocated code once stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_config: Option<EmailConfig>,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct BrandPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_config: Option<EmailConfig>,
}

impl Schema for Brand {
    const KIND: &'static str = "Brand";
    const NAME: &'static str = "brand";
    const COLLECTION: &'static str = "brands";
    const CODED: bool = true;

    type Patch = BrandPatch;

    fn validate(&self) -> Result<(), Error> {
        require(Self::KIND, "name", &self.name)?;
        self.email_config.as_ref().map_or(Ok(()), EmailConfig::validate)
    }

    fn validate_patch(patch: &BrandPatch) -> Result<(), Error> {
        require_if_set(Self::KIND, "name", patch.name.as_deref())?;
        require_if_set(Self::KIND, "code", patch.code.as_deref())?;
        patch.email_config.as_ref().map_or(Ok(()), EmailConfig::validate)
    }

    fn apply_defaults(&mut self) {
        if self.email_config.is_none() {
            self.email_config = Some(EmailConfig::default());
        }
    }

    fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    fn set_code(&mut self, code: String) {
        self.code = Some(code);
    }

    fn label(&self) -> String {
        match &self.code {
            Some(code) => format!("{} [{code}]", self.name),
            None => self.name.clone(),
        }
    }
}
