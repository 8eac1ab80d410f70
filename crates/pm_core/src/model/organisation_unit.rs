//! Organisation unit model.
//!
//! # Invariants
//! - `code`, when present, is unique across all units.
//! - `parent_id` never closes a cycle (enforced by the service layer).

use crate::hierarchy::HierarchyNode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Node of the organisational hierarchy (university, college, school...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganisationUnit {
    pub id: Uuid,
    pub name: String,
    pub code: Option<String>,
    /// `None` for top-level units.
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HierarchyNode for OrganisationUnit {
    type Id = Uuid;

    fn node_id(&self) -> Uuid {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }
}

/// Create input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganisationUnit {
    pub name: String,
    pub code: Option<String>,
    pub parent_id: Option<Uuid>,
}

impl NewOrganisationUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn under(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Partial update. Outer `None` leaves a field untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganisationUnitPatch {
    pub name: Option<String>,
    pub code: Option<Option<String>>,
    pub parent_id: Option<Option<Uuid>>,
}
