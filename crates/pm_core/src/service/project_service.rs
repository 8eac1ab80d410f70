//! Project use-case service.
//!
//! # Invariants
//! - Titles are unique within one organisation unit.
//! - `progress_percent` is validated to `0..=100` before storage.

use super::error::ServiceError;
use crate::model::project::{NewProject, Project, ProjectFilter, ProjectPatch};
use crate::model::validation::{in_range, optional_text, require_text};
use crate::pagination::Paginated;
use crate::query::{build_predicate, ListParams};
use crate::repo::project_repo::{ProjectRepository, PROJECT_QUERY};
use crate::repo::registry::{EntityKind, RecordGuard, UniqueKey};
use log::info;
use uuid::Uuid;

const KIND: EntityKind = EntityKind::Project;

pub struct ProjectService<R: ProjectRepository, G: RecordGuard> {
    repo: R,
    guard: G,
}

impl<R: ProjectRepository, G: RecordGuard> ProjectService<R, G> {
    pub fn new(repo: R, guard: G) -> Self {
        Self { repo, guard }
    }

    /// Creates a project under an existing organisation unit.
    ///
    /// # Errors
    /// - `BadRequest` for a blank title or out-of-range progress.
    /// - `NotFound` when the unit or category is missing.
    /// - `Conflict` when the unit already has a project with that title.
    pub fn create(&self, input: NewProject) -> Result<Project, ServiceError> {
        let input = NewProject {
            title: require_text("title", &input.title)?,
            summary: optional_text(input.summary.as_deref()),
            progress_percent: in_range("progressPercent", input.progress_percent, 0, 100)?,
            ..input
        };
        self.guard
            .check_exists(EntityKind::OrganisationUnit, input.organisation_unit_id)?;
        self.guard
            .check_exists_opt(EntityKind::Category, input.category_id)?;
        self.ensure_title_free(&input.title, input.organisation_unit_id, None)?;

        let project = self.repo.create(&input)?;
        info!(
            "event=project_create module=service status=ok id={} organisation_unit_id={}",
            project.id, project.organisation_unit_id
        );
        Ok(project)
    }

    pub fn get(&self, id: Uuid) -> Result<Project, ServiceError> {
        self.repo.get(id)?.ok_or_else(|| ServiceError::NotFound {
            entity: KIND.label(),
            key: id.to_string(),
        })
    }

    pub fn update(&self, id: Uuid, patch: ProjectPatch) -> Result<Project, ServiceError> {
        let mut project = self.get(id)?;
        let mut title_scope_changed = false;
        if let Some(title) = patch.title {
            project.title = require_text("title", &title)?;
            title_scope_changed = true;
        }
        if let Some(unit_id) = patch.organisation_unit_id {
            self.guard.check_exists(EntityKind::OrganisationUnit, unit_id)?;
            title_scope_changed |= unit_id != project.organisation_unit_id;
            project.organisation_unit_id = unit_id;
        }
        if title_scope_changed {
            self.ensure_title_free(&project.title, project.organisation_unit_id, Some(id))?;
        }
        if let Some(summary) = patch.summary {
            project.summary = optional_text(summary.as_deref());
        }
        if let Some(status) = patch.status {
            project.status = status;
        }
        if let Some(year) = patch.year {
            project.year = year;
        }
        if let Some(category_id) = patch.category_id {
            self.guard.check_exists_opt(EntityKind::Category, category_id)?;
            project.category_id = category_id;
        }
        if let Some(progress) = patch.progress_percent {
            let progress = in_range("progressPercent", progress, 0, 100)?;
            project.progress_percent = u8::try_from(progress)
                .map_err(|_| ServiceError::bad_request("progressPercent out of range"))?;
        }

        let updated = self.repo.update(&project)?;
        info!(
            "event=project_update module=service status=ok id={} status_value={}",
            updated.id, updated.status
        );
        Ok(updated)
    }

    pub fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.repo.delete(id)?;
        info!("event=project_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Lists projects with search/sort plus structured filters.
    pub fn list(
        &self,
        params: &ListParams,
        filter: &ProjectFilter,
    ) -> Result<Paginated<Project>, ServiceError> {
        let statuses: Vec<String> = filter
            .statuses
            .iter()
            .map(|status| status.as_str().to_string())
            .collect();
        let predicate = build_predicate(params, &PROJECT_QUERY)
            .and_eq(
                "organisation_unit_id",
                filter.organisation_unit_id.map(|id| id.to_string()),
            )
            .and_in("status", statuses)
            .and_range(
                "year",
                filter.year_from.map(i64::from),
                filter.year_to.map(i64::from),
            );
        Ok(self.repo.list(&predicate, params.page)?)
    }

    fn ensure_title_free(
        &self,
        title: &str,
        organisation_unit_id: Uuid,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let key = UniqueKey::single("title and organisation unit", "title", title.to_string())
            .and("organisation_unit_id", organisation_unit_id.to_string());
        Ok(self.guard.check_duplicate(KIND, &key, exclude)?)
    }
}
