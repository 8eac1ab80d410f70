//! Positions and their occupancy periods.
//!
//! # Invariants
//! - `Position::title` is globally unique.
//! - A `(user_id, position_id)` pair never holds two overlapping periods.
//! - `UserPosition` identity is `(user_id, position_id, start_date)`.

use crate::interval::{Interval, IntervalError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub organisation_unit_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPosition {
    pub title: String,
    pub description: Option<String>,
    pub organisation_unit_id: Uuid,
}

impl NewPosition {
    pub fn new(title: impl Into<String>, organisation_unit_id: Uuid) -> Self {
        Self {
            title: title.into(),
            description: None,
            organisation_unit_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub organisation_unit_id: Option<Uuid>,
}

/// One occupancy period of a position by a user. `end_date = None` is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPosition {
    pub user_id: Uuid,
    pub position_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

impl UserPosition {
    pub fn interval(&self) -> Result<Interval, IntervalError> {
        Interval::new(self.start_date, self.end_date)
    }

    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.start_date <= at && self.end_date.map_or(true, |end| end > at)
    }
}

/// Occupancy row joined with the position and unit it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    #[serde(flatten)]
    pub assignment: UserPosition,
    pub position_title: String,
    pub organisation_unit_id: Uuid,
    pub organisation_unit_name: String,
}

/// Selects which period of a pair an update applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyTarget {
    /// The period that has no end date.
    Open,
    /// The period starting exactly at this instant.
    StartingAt(DateTime<Utc>),
}

impl From<Option<DateTime<Utc>>> for OccupancyTarget {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Self::Open, Self::StartingAt)
    }
}

/// Changes applied by an occupancy update. `end_date: Some(None)` reopens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OccupancyChange {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
}
