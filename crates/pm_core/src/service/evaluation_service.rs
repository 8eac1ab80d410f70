//! Project evaluation use-case service.
//!
//! # Invariants
//! - The project and evaluator exist before an evaluation is written.
//! - `score` is validated to `0..=100` before storage.

use super::error::ServiceError;
use crate::model::evaluation::{
    Evaluation, EvaluationFilter, EvaluationPatch, EvaluationStatus, EvaluationSummary,
    NewEvaluation,
};
use crate::model::validation::{in_range, optional_text};
use crate::pagination::Paginated;
use crate::query::{build_predicate, ListParams};
use crate::repo::evaluation_repo::{EvaluationRepository, EVALUATION_QUERY};
use crate::repo::registry::{EntityKind, RecordGuard};
use log::info;
use uuid::Uuid;

const KIND: EntityKind = EntityKind::Evaluation;

pub struct EvaluationService<R: EvaluationRepository, G: RecordGuard> {
    repo: R,
    guard: G,
}

impl<R: EvaluationRepository, G: RecordGuard> EvaluationService<R, G> {
    pub fn new(repo: R, guard: G) -> Self {
        Self { repo, guard }
    }

    /// # Errors
    /// - `BadRequest` for a score outside `0..=100`.
    /// - `NotFound` when the project or evaluator is missing.
    pub fn create(&self, input: NewEvaluation) -> Result<Evaluation, ServiceError> {
        let input = NewEvaluation {
            score: in_range("score", input.score, 0, 100)?,
            comments: optional_text(input.comments.as_deref()),
            ..input
        };
        self.guard.check_exists(EntityKind::Project, input.project_id)?;
        self.guard.check_exists(EntityKind::User, input.evaluator_id)?;

        let evaluation = self.repo.create(&input)?;
        info!(
            "event=evaluation_create module=service status=ok id={} project_id={}",
            evaluation.id, evaluation.project_id
        );
        Ok(evaluation)
    }

    pub fn get(&self, id: Uuid) -> Result<Evaluation, ServiceError> {
        self.repo.get(id)?.ok_or_else(|| ServiceError::NotFound {
            entity: KIND.label(),
            key: id.to_string(),
        })
    }

    pub fn update(&self, id: Uuid, patch: EvaluationPatch) -> Result<Evaluation, ServiceError> {
        let mut evaluation = self.get(id)?;
        if let Some(project_id) = patch.project_id {
            self.guard.check_exists(EntityKind::Project, project_id)?;
            evaluation.project_id = project_id;
        }
        if let Some(evaluator_id) = patch.evaluator_id {
            self.guard.check_exists(EntityKind::User, evaluator_id)?;
            evaluation.evaluator_id = evaluator_id;
        }
        if let Some(score) = patch.score {
            let score = in_range("score", score, 0, 100)?;
            evaluation.score =
                u8::try_from(score).map_err(|_| ServiceError::bad_request("score out of range"))?;
        }
        if let Some(comments) = patch.comments {
            evaluation.comments = optional_text(comments.as_deref());
        }
        if let Some(status) = patch.status {
            evaluation.status = status;
        }

        let evaluation = self.repo.update(&evaluation)?;
        info!(
            "event=evaluation_update module=service status=ok id={} status_value={}",
            id, evaluation.status
        );
        Ok(evaluation)
    }

    pub fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.repo.delete(id)?;
        info!("event=evaluation_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Lists evaluations, newest first by default; search matches comments.
    pub fn list(
        &self,
        params: &ListParams,
        filter: EvaluationFilter,
    ) -> Result<Paginated<Evaluation>, ServiceError> {
        let predicate = build_predicate(params, &EVALUATION_QUERY)
            .and_eq("project_id", filter.project_id.map(|id| id.to_string()))
            .and_eq("evaluator_id", filter.evaluator_id.map(|id| id.to_string()))
            .and_eq("status", filter.status.map(|status| status.as_str().to_string()));
        Ok(self.repo.list(&predicate, params.page)?)
    }

    /// Evaluations still awaiting completion.
    pub fn pending(&self, params: &ListParams) -> Result<Paginated<Evaluation>, ServiceError> {
        self.list(
            params,
            EvaluationFilter {
                status: Some(EvaluationStatus::Pending),
                ..EvaluationFilter::default()
            },
        )
    }

    /// Average score, count and pending count for one project.
    pub fn summary(&self, project_id: Uuid) -> Result<EvaluationSummary, ServiceError> {
        self.guard.check_exists(EntityKind::Project, project_id)?;
        Ok(self.repo.summary(project_id)?)
    }
}
