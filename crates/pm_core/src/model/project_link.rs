//! Funding and stakeholder links attached to a project.
//!
//! # Invariants
//! - A funder funds a project at most once; a stakeholder joins it at most once.
//! - Funding amounts are non-negative with at most two decimal places.

use super::validation::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Part a stakeholder plays in one project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StakeholderRole {
    Owner,
    Partner,
    Sponsor,
    Regulator,
    #[default]
    Beneficiary,
}

impl StakeholderRole {
    pub const ALL: [StakeholderRole; 5] = [
        Self::Owner,
        Self::Partner,
        Self::Sponsor,
        Self::Regulator,
        Self::Beneficiary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Partner => "PARTNER",
            Self::Sponsor => "SPONSOR",
            Self::Regulator => "REGULATOR",
            Self::Beneficiary => "BENEFICIARY",
        }
    }
}

impl Display for StakeholderRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StakeholderRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| format!("unknown stakeholder role `{}`", value.trim()))
    }
}

/// One funder's commitment to one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFunder {
    pub project_id: Uuid,
    pub funder_id: Uuid,
    pub amount: Option<Amount>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStakeholder {
    pub project_id: Uuid,
    pub stakeholder_id: Uuid,
    pub role: StakeholderRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Funding list filters. Empty fields impose no constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FundingFilter {
    pub project_id: Option<Uuid>,
    pub funder_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::StakeholderRole;

    #[test]
    fn role_defaults_to_beneficiary_and_parses_any_case() {
        assert_eq!(StakeholderRole::default(), StakeholderRole::Beneficiary);
        assert_eq!(
            " partner ".parse::<StakeholderRole>().unwrap(),
            StakeholderRole::Partner
        );
        assert!("investor".parse::<StakeholderRole>().is_err());
    }
}
