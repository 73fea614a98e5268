use sea_orm::DbErr;
use serde::{Deserialize, Serialize};

pub mod board_repo;
pub mod card_repo;
pub mod column_repo;
pub mod entities;
pub mod label_repo;
pub mod ordering;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] DbErr),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    ScopeMismatch(&'static str),
    #[error("reorder list does not match the scope's current members")]
    InvalidReorderSet,
    #[error("cannot delete the last column while it still holds cards")]
    LastColumnNotEmpty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    None,
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::None => "none",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl TryFrom<&str> for Priority {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "none" => Ok(Priority::None),
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(()),
        }
    }
}

/// Name/color pair copied onto a card when a label is assigned. Deliberately
/// not a reference: later edits or deletion of the Label row leave it intact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelSnapshot {
    pub name: String,
    pub color: String,
}
