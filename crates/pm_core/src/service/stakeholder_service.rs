//! Stakeholder use-case service.

use super::error::ServiceError;
use crate::model::stakeholder::{NewStakeholder, Stakeholder, StakeholderPatch};
use crate::model::validation::{entity_name, optional_email, optional_text, require_text};
use crate::pagination::Paginated;
use crate::query::{build_predicate, ListParams};
use crate::repo::registry::{EntityKind, RecordGuard, UniqueKey};
use crate::repo::stakeholder_repo::{StakeholderRepository, STAKEHOLDER_QUERY};
use log::info;
use uuid::Uuid;

const KIND: EntityKind = EntityKind::Stakeholder;

pub struct StakeholderService<R: StakeholderRepository, G: RecordGuard> {
    repo: R,
    guard: G,
}

impl<R: StakeholderRepository, G: RecordGuard> StakeholderService<R, G> {
    pub fn new(repo: R, guard: G) -> Self {
        Self { repo, guard }
    }

    /// Creates a stakeholder, optionally attached to an organisation unit.
    ///
    /// # Errors
    /// - `BadRequest` for an invalid name, type or email.
    /// - `NotFound` when the unit is missing.
    /// - `Conflict` when the name is taken.
    pub fn create(&self, input: NewStakeholder) -> Result<Stakeholder, ServiceError> {
        let input = NewStakeholder {
            name: entity_name("name", &input.name)?,
            stakeholder_type: require_text("stakeholderType", &input.stakeholder_type)?,
            contact_email: optional_email("contactEmail", input.contact_email.as_deref())?,
            contact_phone: optional_text(input.contact_phone.as_deref()),
            organisation_unit_id: input.organisation_unit_id,
        };
        self.guard
            .check_exists_opt(EntityKind::OrganisationUnit, input.organisation_unit_id)?;
        self.ensure_name_free(&input.name, None)?;

        let stakeholder = self.repo.create(&input)?;
        info!(
            "event=stakeholder_create module=service status=ok id={}",
            stakeholder.id
        );
        Ok(stakeholder)
    }

    pub fn get(&self, id: Uuid) -> Result<Stakeholder, ServiceError> {
        self.repo.get(id)?.ok_or_else(|| ServiceError::NotFound {
            entity: KIND.label(),
            key: id.to_string(),
        })
    }

    pub fn update(&self, id: Uuid, patch: StakeholderPatch) -> Result<Stakeholder, ServiceError> {
        let mut stakeholder = self.get(id)?;
        if let Some(name) = patch.name {
            stakeholder.name = entity_name("name", &name)?;
            self.ensure_name_free(&stakeholder.name, Some(id))?;
        }
        if let Some(stakeholder_type) = patch.stakeholder_type {
            stakeholder.stakeholder_type = require_text("stakeholderType", &stakeholder_type)?;
        }
        if let Some(contact_email) = patch.contact_email {
            stakeholder.contact_email =
                optional_email("contactEmail", contact_email.as_deref())?;
        }
        if let Some(contact_phone) = patch.contact_phone {
            stakeholder.contact_phone = optional_text(contact_phone.as_deref());
        }
        if let Some(unit_id) = patch.organisation_unit_id {
            self.guard
                .check_exists_opt(EntityKind::OrganisationUnit, unit_id)?;
            stakeholder.organisation_unit_id = unit_id;
        }
        let stakeholder = self.repo.update(&stakeholder)?;
        info!("event=stakeholder_update module=service status=ok id={id}");
        Ok(stakeholder)
    }

    pub fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.repo.delete(id)?;
        info!("event=stakeholder_delete module=service status=ok id={id}");
        Ok(())
    }

    pub fn list(
        &self,
        params: &ListParams,
        organisation_unit_id: Option<Uuid>,
    ) -> Result<Paginated<Stakeholder>, ServiceError> {
        let predicate = build_predicate(params, &STAKEHOLDER_QUERY).and_eq(
            "organisation_unit_id",
            organisation_unit_id.map(|id| id.to_string()),
        );
        Ok(self.repo.list(&predicate, params.page)?)
    }

    /// Stakeholders attached to one unit; the unit must exist.
    pub fn by_organisation_unit(
        &self,
        organisation_unit_id: Uuid,
        params: &ListParams,
    ) -> Result<Paginated<Stakeholder>, ServiceError> {
        self.guard
            .check_exists(EntityKind::OrganisationUnit, organisation_unit_id)?;
        self.list(params, Some(organisation_unit_id))
    }

    fn ensure_name_free(&self, name: &str, exclude: Option<Uuid>) -> Result<(), ServiceError> {
        let key = UniqueKey::single("name", "name", name.to_string());
        Ok(self.guard.check_duplicate(KIND, &key, exclude)?)
    }
}
