//! Deal boards, their pipelines, pipeline stages and the deals sitting in a stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crm::entity::{require, require_if_set, ParentRef, Schema};
use crate::crm::Error;

pub const BOARD_ID: &str = "boardId";
pub const PIPELINE_ID: &str = "pipelineId";
pub const STAGE_ID: &str = "stageId";

const BOARD_PARENT: ParentRef = ParentRef {
    field: BOARD_ID,
    name: "board",
    kind: Board::KIND,
    collection: Board::COLLECTION,
    required: false,
};

const PIPELINE_PARENT: ParentRef = ParentRef {
    field: PIPELINE_ID,
    name: "pipeline",
    kind: Pipeline::KIND,
    collection: Pipeline::COLLECTION,
    required: false,
};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub name: String,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct BoardPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Schema for Board {
    const KIND: &'static str = "Board";
    const NAME: &'static str = "board";
    const COLLECTION: &'static str = "deal_boards";

    type Patch = BoardPatch;

    fn validate(&self) -> Result<(), Error> {
        require(Self::KIND, "name", &self.name)
    }

    fn validate_patch(patch: &BoardPatch) -> Result<(), Error> {
        require_if_set(Self::KIND, "name", patch.name.as_deref())
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub name: String,
    pub board_id: String,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PipelinePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_id: Option<String>,
}

impl Schema for Pipeline {
    const KIND: &'static str = "Pipeline";
    const NAME: &'static str = "pipeline";
    const COLLECTION: &'static str = "deal_pipelines";
    const PARENTS: &'static [ParentRef] = &[ParentRef {
        required: true,
        ..BOARD_PARENT
    }];

    type Patch = PipelinePatch;

    fn validate(&self) -> Result<(), Error> {
        require(Self::KIND, "name", &self.name)
    }

    fn validate_patch(patch: &PipelinePatch) -> Result<(), Error> {
        require_if_set(Self::KIND, "name", patch.name.as_deref())
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub name: String,
    pub pipeline_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<String>,
    /// Chance of winning a deal in this stage, in percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<u8>,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct StagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<u8>,
}

fn check_probability(probability: Option<u8>) -> Result<(), Error> {
    match probability {
        Some(value) if value > 100 => Err(Error::ValidationFailed(format!(
            "Stage probability {value} is not a percentage"
        ))),
        _ => Ok(()),
    }
}

impl Schema for Stage {
    const KIND: &'static str = "Stage";
    const NAME: &'static str = "stage";
    const COLLECTION: &'static str = "deal_stages";
    const PARENTS: &'static [ParentRef] = &[
        BOARD_PARENT,
        ParentRef {
            required: true,
            ..PIPELINE_PARENT
        },
    ];

    type Patch = StagePatch;

    fn validate(&self) -> Result<(), Error> {
        require(Self::KIND, "name", &self.name)?;
        check_probability(self.probability)
    }

    fn validate_patch(patch: &StagePatch) -> Result<(), Error> {
        require_if_set(Self::KIND, "name", patch.name.as_deref())?;
        check_probability(patch.probability)
    }

    fn label(&self) -> String {
        match self.probability {
            Some(probability) => format!("{} ({probability}%)", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub stage_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<String>,
    #[serde(default)]
    pub product_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub assigned_user_ids: Vec<String>,
}

#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct DealPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_user_ids: Option<Vec<String>>,
}

fn check_amount(amount: Option<f64>) -> Result<(), Error> {
    match amount {
        Some(value) if !value.is_finite() || value < 0.0 => {
            Err(Error::ValidationFailed(format!("Deal amount {value} is invalid")))
        }
        _ => Ok(()),
    }
}

impl Schema for Deal {
    const KIND: &'static str = "Deal";
    const NAME: &'static str = "deal";
    const COLLECTION: &'static str = "deals";
    const PARENTS: &'static [ParentRef] = &[
        BOARD_PARENT,
        PIPELINE_PARENT,
        ParentRef {
            field: STAGE_ID,
            name: "stage",
            kind: Stage::KIND,
            collection: Stage::COLLECTION,
            required: true,
        },
    ];

    type Patch = DealPatch;

    fn validate(&self) -> Result<(), Error> {
        check_amount(self.amount)
    }

    fn validate_patch(patch: &DealPatch) -> Result<(), Error> {
        check_amount(patch.amount)
    }

    fn label(&self) -> String {
        let note = self.note.as_deref().unwrap_or("(no note)");
        match self.amount {
            Some(amount) => format!("{note} [{amount:.2}]"),
            None => note.to_owned(),
        }
    }
}
