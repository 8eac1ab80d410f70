//! Project funding and stakeholder link use-case service.
//!
//! # Invariants
//! - Both sides of a link exist before it is written, read or removed.
//! - A funder funds a project once; a stakeholder joins a project once.
//! - Funding amounts are non-negative with at most two decimal places.

use super::error::ServiceError;
use crate::model::project_link::{FundingFilter, ProjectFunder, ProjectStakeholder, StakeholderRole};
use crate::model::stakeholder::Stakeholder;
use crate::model::validation::optional_amount;
use crate::pagination::Paginated;
use crate::query::{build_predicate, ListParams};
use crate::repo::project_link_repo::{
    ProjectLinkRepository, FUNDING_QUERY, PROJECT_STAKEHOLDER_QUERY,
};
use crate::repo::registry::{EntityKind, RecordGuard};
use log::info;
use uuid::Uuid;

pub struct ProjectLinkService<R: ProjectLinkRepository, G: RecordGuard> {
    repo: R,
    guard: G,
}

impl<R: ProjectLinkRepository, G: RecordGuard> ProjectLinkService<R, G> {
    pub fn new(repo: R, guard: G) -> Self {
        Self { repo, guard }
    }

    /// Records that `funder_id` funds `project_id`.
    ///
    /// # Errors
    /// - `BadRequest` for a negative amount or one with more than two decimals.
    /// - `NotFound` when the project or funder is missing.
    /// - `Conflict` when the funder already funds the project.
    pub fn add_funder(
        &self,
        project_id: Uuid,
        funder_id: Uuid,
        amount: Option<f64>,
    ) -> Result<ProjectFunder, ServiceError> {
        let amount = optional_amount("amount", amount)?;
        self.ensure_funding_sides(project_id, funder_id)?;
        let link = self.repo.add_funder(project_id, funder_id, amount)?;
        info!(
            "event=project_funder_add module=service status=ok project_id={} funder_id={}",
            project_id, funder_id
        );
        Ok(link)
    }

    pub fn funding(&self, project_id: Uuid, funder_id: Uuid) -> Result<ProjectFunder, ServiceError> {
        self.ensure_funding_sides(project_id, funder_id)?;
        self.repo
            .funding(project_id, funder_id)?
            .ok_or_else(|| ServiceError::NotFound {
                entity: "project funder",
                key: format!("project {project_id} / funder {funder_id}"),
            })
    }

    /// Replaces the funded amount; `None` clears it.
    pub fn update_funding(
        &self,
        project_id: Uuid,
        funder_id: Uuid,
        amount: Option<f64>,
    ) -> Result<ProjectFunder, ServiceError> {
        let amount = optional_amount("amount", amount)?;
        self.ensure_funding_sides(project_id, funder_id)?;
        let link = self.repo.set_amount(project_id, funder_id, amount)?;
        info!(
            "event=project_funder_update module=service status=ok project_id={} funder_id={}",
            project_id, funder_id
        );
        Ok(link)
    }

    pub fn remove_funder(&self, project_id: Uuid, funder_id: Uuid) -> Result<(), ServiceError> {
        self.ensure_funding_sides(project_id, funder_id)?;
        self.repo.remove_funder(project_id, funder_id)?;
        info!(
            "event=project_funder_remove module=service status=ok project_id={} funder_id={}",
            project_id, funder_id
        );
        Ok(())
    }

    /// Lists funding links, newest first by default.
    pub fn list_funding(
        &self,
        params: &ListParams,
        filter: FundingFilter,
    ) -> Result<Paginated<ProjectFunder>, ServiceError> {
        let predicate = build_predicate(params, &FUNDING_QUERY)
            .and_eq("project_id", filter.project_id.map(|id| id.to_string()))
            .and_eq("funder_id", filter.funder_id.map(|id| id.to_string()));
        Ok(self.repo.list_funding(&predicate, params.page)?)
    }

    /// Adds a stakeholder to a project; the role defaults to beneficiary.
    ///
    /// # Errors
    /// - `NotFound` when the project or stakeholder is missing.
    /// - `Conflict` when the stakeholder is already on the project.
    pub fn add_stakeholder(
        &self,
        project_id: Uuid,
        stakeholder_id: Uuid,
        role: Option<StakeholderRole>,
    ) -> Result<ProjectStakeholder, ServiceError> {
        self.ensure_membership_sides(project_id, stakeholder_id)?;
        let link = self
            .repo
            .add_stakeholder(project_id, stakeholder_id, role.unwrap_or_default())?;
        info!(
            "event=project_stakeholder_add module=service status=ok project_id={} stakeholder_id={} role={}",
            project_id, stakeholder_id, link.role
        );
        Ok(link)
    }

    pub fn update_stakeholder_role(
        &self,
        project_id: Uuid,
        stakeholder_id: Uuid,
        role: StakeholderRole,
    ) -> Result<ProjectStakeholder, ServiceError> {
        self.ensure_membership_sides(project_id, stakeholder_id)?;
        let link = self.repo.set_role(project_id, stakeholder_id, role)?;
        info!(
            "event=project_stakeholder_update module=service status=ok project_id={} stakeholder_id={} role={}",
            project_id, stakeholder_id, role
        );
        Ok(link)
    }

    pub fn remove_stakeholder(
        &self,
        project_id: Uuid,
        stakeholder_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.ensure_membership_sides(project_id, stakeholder_id)?;
        self.repo.remove_stakeholder(project_id, stakeholder_id)?;
        info!(
            "event=project_stakeholder_remove module=service status=ok project_id={} stakeholder_id={}",
            project_id, stakeholder_id
        );
        Ok(())
    }

    /// Stakeholders of one project, ordered by name.
    pub fn project_stakeholders(&self, project_id: Uuid) -> Result<Vec<Stakeholder>, ServiceError> {
        self.guard.check_exists(EntityKind::Project, project_id)?;
        Ok(self.repo.stakeholders_of(project_id)?)
    }

    pub fn list_memberships(
        &self,
        params: &ListParams,
        project_id: Option<Uuid>,
        stakeholder_id: Option<Uuid>,
    ) -> Result<Paginated<ProjectStakeholder>, ServiceError> {
        let predicate = build_predicate(params, &PROJECT_STAKEHOLDER_QUERY)
            .and_eq("project_id", project_id.map(|id| id.to_string()))
            .and_eq("stakeholder_id", stakeholder_id.map(|id| id.to_string()));
        Ok(self.repo.list_memberships(&predicate, params.page)?)
    }

    fn ensure_funding_sides(&self, project_id: Uuid, funder_id: Uuid) -> Result<(), ServiceError> {
        self.guard.check_exists(EntityKind::Project, project_id)?;
        self.guard.check_exists(EntityKind::Funder, funder_id)?;
        Ok(())
    }

    fn ensure_membership_sides(
        &self,
        project_id: Uuid,
        stakeholder_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.guard.check_exists(EntityKind::Project, project_id)?;
        self.guard.check_exists(EntityKind::Stakeholder, stakeholder_id)?;
        Ok(())
    }
}
