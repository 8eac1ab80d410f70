//! Research projects and their review lifecycle.
//!
//! # Invariants
//! - `title` is unique within one organisation unit.
//! - `progress_percent` stays within `0..=100`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Review/funding state of a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Pending,
    UnderReview,
    Approved,
    Rejected,
    Funded,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 7] = [
        Self::Pending,
        Self::UnderReview,
        Self::Approved,
        Self::Rejected,
        Self::Funded,
        Self::Completed,
        Self::Archived,
    ];

    /// Stored and wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::UnderReview => "UNDER_REVIEW",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Funded => "FUNDED",
            Self::Completed => "COMPLETED",
            Self::Archived => "ARCHIVED",
        }
    }
}

impl Display for ProjectStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("unknown project status `{}`", value.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "abstract")]
    pub summary: Option<String>,
    pub status: ProjectStatus,
    pub year: i32,
    pub organisation_unit_id: Uuid,
    pub category_id: Option<Uuid>,
    pub progress_percent: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub title: String,
    #[serde(rename = "abstract")]
    pub summary: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    pub year: i32,
    pub organisation_unit_id: Uuid,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub progress_percent: i64,
}

impl NewProject {
    pub fn new(title: impl Into<String>, year: i32, organisation_unit_id: Uuid) -> Self {
        Self {
            title: title.into(),
            summary: None,
            status: ProjectStatus::default(),
            year,
            organisation_unit_id,
            category_id: None,
            progress_percent: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub summary: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
    pub year: Option<i32>,
    pub organisation_unit_id: Option<Uuid>,
    pub category_id: Option<Option<Uuid>>,
    pub progress_percent: Option<i64>,
}

/// Structured project list filters. Empty fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    pub organisation_unit_id: Option<Uuid>,
    /// Membership filter; empty means any status.
    pub statuses: Vec<ProjectStatus>,
    /// Inclusive lower bound.
    pub year_from: Option<i32>,
    /// Inclusive upper bound.
    pub year_to: Option<i32>,
}
