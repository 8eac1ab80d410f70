//! External stakeholders, optionally attached to an organisation unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stakeholder {
    pub id: Uuid,
    pub name: String,
    pub stakeholder_type: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub organisation_unit_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStakeholder {
    pub name: String,
    pub stakeholder_type: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub organisation_unit_id: Option<Uuid>,
}

impl NewStakeholder {
    pub fn new(name: impl Into<String>, stakeholder_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stakeholder_type: stakeholder_type.into(),
            contact_email: None,
            contact_phone: None,
            organisation_unit_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StakeholderPatch {
    pub name: Option<String>,
    pub stakeholder_type: Option<String>,
    pub contact_email: Option<Option<String>>,
    pub contact_phone: Option<Option<String>>,
    pub organisation_unit_id: Option<Option<Uuid>>,
}
