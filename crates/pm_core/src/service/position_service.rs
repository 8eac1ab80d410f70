//! Position use-case service.

use super::error::ServiceError;
use crate::model::position::{NewPosition, Position, PositionPatch};
use crate::model::validation::{optional_text, require_text};
use crate::pagination::Paginated;
use crate::query::{build_predicate, ListParams};
use crate::repo::position_repo::{PositionRepository, POSITION_QUERY};
use crate::repo::registry::{EntityKind, RecordGuard, UniqueKey};
use log::info;
use uuid::Uuid;

const KIND: EntityKind = EntityKind::Position;

pub struct PositionService<R: PositionRepository, G: RecordGuard> {
    repo: R,
    guard: G,
}

impl<R: PositionRepository, G: RecordGuard> PositionService<R, G> {
    pub fn new(repo: R, guard: G) -> Self {
        Self { repo, guard }
    }

    pub fn create(&self, input: NewPosition) -> Result<Position, ServiceError> {
        let input = NewPosition {
            title: require_text("title", &input.title)?,
            description: optional_text(input.description.as_deref()),
            organisation_unit_id: input.organisation_unit_id,
        };
        self.guard
            .check_exists(EntityKind::OrganisationUnit, input.organisation_unit_id)?;
        self.ensure_title_free(&input.title, None)?;

        let position = self.repo.create(&input)?;
        info!(
            "event=position_create module=service status=ok id={} organisation_unit_id={}",
            position.id, position.organisation_unit_id
        );
        Ok(position)
    }

    pub fn get(&self, id: Uuid) -> Result<Position, ServiceError> {
        self.repo.get(id)?.ok_or_else(|| ServiceError::NotFound {
            entity: KIND.label(),
            key: id.to_string(),
        })
    }

    pub fn update(&self, id: Uuid, patch: PositionPatch) -> Result<Position, ServiceError> {
        let mut position = self.get(id)?;
        if let Some(title) = patch.title {
            position.title = require_text("title", &title)?;
            self.ensure_title_free(&position.title, Some(id))?;
        }
        if let Some(description) = patch.description {
            position.description = optional_text(description.as_deref());
        }
        if let Some(unit_id) = patch.organisation_unit_id {
            self.guard.check_exists(EntityKind::OrganisationUnit, unit_id)?;
            position.organisation_unit_id = unit_id;
        }
        let position = self.repo.update(&position)?;
        info!("event=position_update module=service status=ok id={id}");
        Ok(position)
    }

    pub fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.repo.delete(id)?;
        info!("event=position_delete module=service status=ok id={id}");
        Ok(())
    }

    pub fn list(
        &self,
        params: &ListParams,
        organisation_unit_id: Option<Uuid>,
    ) -> Result<Paginated<Position>, ServiceError> {
        let predicate = build_predicate(params, &POSITION_QUERY).and_eq(
            "organisation_unit_id",
            organisation_unit_id.map(|id| id.to_string()),
        );
        Ok(self.repo.list(&predicate, params.page)?)
    }

    fn ensure_title_free(&self, title: &str, exclude: Option<Uuid>) -> Result<(), ServiceError> {
        let key = UniqueKey::single("title", "title", title.to_string());
        Ok(self.guard.check_duplicate(KIND, &key, exclude)?)
    }
}
