//! Project report use-case service.
//!
//! # Invariants
//! - The project and submitter exist before a report is written.
//! - Titles are 2 to 100 characters; reporting periods at most 50.

use super::error::ServiceError;
use crate::model::report::{
    NewReport, Report, ReportFilter, ReportPatch, ReportSummary, PERIOD_MAX_CHARS,
    TITLE_MAX_CHARS, TITLE_MIN_CHARS,
};
use crate::model::validation::{bounded_text, optional_amount, optional_bounded_text, optional_text};
use crate::pagination::Paginated;
use crate::query::{build_predicate, ListParams};
use crate::repo::registry::{EntityKind, RecordGuard};
use crate::repo::report_repo::{ReportRecord, ReportRepository, REPORT_QUERY};
use log::info;
use uuid::Uuid;

const KIND: EntityKind = EntityKind::Report;

pub struct ReportService<R: ReportRepository, G: RecordGuard> {
    repo: R,
    guard: G,
}

impl<R: ReportRepository, G: RecordGuard> ReportService<R, G> {
    pub fn new(repo: R, guard: G) -> Self {
        Self { repo, guard }
    }

    /// Submits a report against a project.
    ///
    /// # Errors
    /// - `BadRequest` for an invalid title, period or fund usage.
    /// - `NotFound` when the project or submitter is missing.
    pub fn create(&self, input: NewReport) -> Result<Report, ServiceError> {
        let record = ReportRecord {
            project_id: input.project_id,
            submitted_by_id: input.submitted_by_id,
            title: bounded_text("title", &input.title, TITLE_MIN_CHARS, TITLE_MAX_CHARS)?,
            reporting_period: optional_bounded_text(
                "reportingPeriod",
                input.reporting_period.as_deref(),
                PERIOD_MAX_CHARS,
            )?,
            content: optional_text(input.content.as_deref()),
            fund_usage: optional_amount("fundUsage", input.fund_usage)?,
        };
        self.guard.check_exists(EntityKind::Project, record.project_id)?;
        self.guard.check_exists(EntityKind::User, record.submitted_by_id)?;

        let report = self.repo.create(&record)?;
        info!(
            "event=report_create module=service status=ok id={} project_id={}",
            report.id, report.project_id
        );
        Ok(report)
    }

    pub fn get(&self, id: Uuid) -> Result<Report, ServiceError> {
        self.repo.get(id)?.ok_or_else(|| ServiceError::NotFound {
            entity: KIND.label(),
            key: id.to_string(),
        })
    }

    pub fn update(&self, id: Uuid, patch: ReportPatch) -> Result<Report, ServiceError> {
        let mut report = self.get(id)?;
        if let Some(title) = patch.title {
            report.title = bounded_text("title", &title, TITLE_MIN_CHARS, TITLE_MAX_CHARS)?;
        }
        if let Some(period) = patch.reporting_period {
            report.reporting_period =
                optional_bounded_text("reportingPeriod", period.as_deref(), PERIOD_MAX_CHARS)?;
        }
        if let Some(content) = patch.content {
            report.content = optional_text(content.as_deref());
        }
        if let Some(fund_usage) = patch.fund_usage {
            report.fund_usage = optional_amount("fundUsage", fund_usage)?;
        }

        let report = self.repo.update(&report)?;
        info!("event=report_update module=service status=ok id={id}");
        Ok(report)
    }

    pub fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.repo.delete(id)?;
        info!("event=report_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Lists reports, latest submission first by default.
    ///
    /// Search matches title, content and reporting period.
    pub fn list(
        &self,
        params: &ListParams,
        filter: &ReportFilter,
    ) -> Result<Paginated<Report>, ServiceError> {
        if let Some(project_id) = filter.project_id {
            self.guard.check_exists(EntityKind::Project, project_id)?;
        }
        if let Some(user_id) = filter.submitted_by_id {
            self.guard.check_exists(EntityKind::User, user_id)?;
        }
        let predicate = build_predicate(params, &REPORT_QUERY)
            .and_eq("project_id", filter.project_id.map(|id| id.to_string()))
            .and_eq(
                "submitted_by_id",
                filter.submitted_by_id.map(|id| id.to_string()),
            )
            .and_eq("reporting_period", filter.reporting_period.clone());
        Ok(self.repo.list(&predicate, params.page)?)
    }

    /// Most recent report of a project.
    ///
    /// # Errors
    /// - `NotFound` when the project is missing or has no reports.
    pub fn latest(&self, project_id: Uuid) -> Result<Report, ServiceError> {
        self.guard.check_exists(EntityKind::Project, project_id)?;
        self.repo
            .latest(project_id)?
            .ok_or_else(|| ServiceError::NotFound {
                entity: KIND.label(),
                key: format!("latest for project {project_id}"),
            })
    }

    /// Report count and summed fund usage for one project.
    pub fn summary(&self, project_id: Uuid) -> Result<ReportSummary, ServiceError> {
        self.guard.check_exists(EntityKind::Project, project_id)?;
        Ok(self.repo.summary(project_id)?)
    }
}
