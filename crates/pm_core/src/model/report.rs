//! Progress reports submitted against a project.
//!
//! # Invariants
//! - Titles are 2 to 100 characters; reporting periods at most 50.
//! - `fund_usage` is non-negative with at most two decimal places.

use super::validation::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TITLE_MIN_CHARS: usize = 2;
pub const TITLE_MAX_CHARS: usize = 100;
pub const PERIOD_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub project_id: Uuid,
    pub submitted_by_id: Uuid,
    pub title: String,
    pub reporting_period: Option<String>,
    pub content: Option<String>,
    pub fund_usage: Option<Amount>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    pub project_id: Uuid,
    pub submitted_by_id: Uuid,
    pub title: String,
    pub reporting_period: Option<String>,
    pub content: Option<String>,
    pub fund_usage: Option<f64>,
}

impl NewReport {
    pub fn new(project_id: Uuid, submitted_by_id: Uuid, title: impl Into<String>) -> Self {
        Self {
            project_id,
            submitted_by_id,
            title: title.into(),
            reporting_period: None,
            content: None,
            fund_usage: None,
        }
    }

    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.reporting_period = Some(period.into());
        self
    }

    pub fn with_fund_usage(mut self, amount: f64) -> Self {
        self.fund_usage = Some(amount);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportPatch {
    pub title: Option<String>,
    pub reporting_period: Option<Option<String>>,
    pub content: Option<Option<String>>,
    pub fund_usage: Option<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub project_id: Option<Uuid>,
    pub submitted_by_id: Option<Uuid>,
    /// Exact reporting period, e.g. `Q1 2024`.
    pub reporting_period: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_reports: u64,
    pub total_fund_usage: Amount,
}
