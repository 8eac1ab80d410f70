//! Scored reviews of a project by a user.
//!
//! # Invariants
//! - `score` stays within `0..=100`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluationStatus {
    #[default]
    Pending,
    Completed,
}

impl EvaluationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
        }
    }
}

impl Display for EvaluationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvaluationStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(format!("unknown evaluation status `{}`", value.trim())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub id: Uuid,
    pub project_id: Uuid,
    pub evaluator_id: Uuid,
    pub score: u8,
    pub comments: Option<String>,
    pub status: EvaluationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvaluation {
    pub project_id: Uuid,
    pub evaluator_id: Uuid,
    pub score: i64,
    pub comments: Option<String>,
    #[serde(default)]
    pub status: EvaluationStatus,
}

impl NewEvaluation {
    pub fn new(project_id: Uuid, evaluator_id: Uuid, score: i64) -> Self {
        Self {
            project_id,
            evaluator_id,
            score,
            comments: None,
            status: EvaluationStatus::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationPatch {
    pub project_id: Option<Uuid>,
    pub evaluator_id: Option<Uuid>,
    pub score: Option<i64>,
    pub comments: Option<Option<String>>,
    pub status: Option<EvaluationStatus>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationFilter {
    pub project_id: Option<Uuid>,
    pub evaluator_id: Option<Uuid>,
    pub status: Option<EvaluationStatus>,
}

/// Aggregate over the evaluations of one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSummary {
    /// `None` when the project has no evaluations.
    pub average_score: Option<f64>,
    pub total: u64,
    pub pending: u64,
}
