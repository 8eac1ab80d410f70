//! Funding organisations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Funder {
    pub id: Uuid,
    /// Unique, validated by `validation::entity_name`.
    pub name: String,
    pub funder_type: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFunder {
    pub name: String,
    pub funder_type: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

impl NewFunder {
    pub fn new(name: impl Into<String>, funder_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            funder_type: funder_type.into(),
            contact_email: None,
            contact_phone: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunderPatch {
    pub name: Option<String>,
    pub funder_type: Option<String>,
    pub contact_email: Option<Option<String>>,
    pub contact_phone: Option<Option<String>>,
}
