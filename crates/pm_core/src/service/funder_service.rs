//! Funder use-case service.
//!
//! # Invariants
//! - Names follow `validation::entity_name` and are unique.

use super::error::ServiceError;
use crate::model::funder::{Funder, FunderPatch, NewFunder};
use crate::model::validation::{entity_name, optional_email, optional_text, require_text};
use crate::pagination::Paginated;
use crate::query::{build_predicate, ListParams};
use crate::repo::funder_repo::{FunderRepository, FUNDER_QUERY};
use crate::repo::registry::{EntityKind, RecordGuard, UniqueKey};
use log::info;
use uuid::Uuid;

const KIND: EntityKind = EntityKind::Funder;

pub struct FunderService<R: FunderRepository, G: RecordGuard> {
    repo: R,
    guard: G,
}

impl<R: FunderRepository, G: RecordGuard> FunderService<R, G> {
    pub fn new(repo: R, guard: G) -> Self {
        Self { repo, guard }
    }

    /// Creates a funder.
    ///
    /// # Errors
    /// - `BadRequest` for an invalid name, type or email.
    /// - `Conflict` when the name is taken.
    pub fn create(&self, input: NewFunder) -> Result<Funder, ServiceError> {
        let input = NewFunder {
            name: entity_name("name", &input.name)?,
            funder_type: require_text("funderType", &input.funder_type)?,
            contact_email: optional_email("contactEmail", input.contact_email.as_deref())?,
            contact_phone: optional_text(input.contact_phone.as_deref()),
        };
        self.ensure_name_free(&input.name, None)?;

        let funder = self.repo.create(&input)?;
        info!("event=funder_create module=service status=ok id={}", funder.id);
        Ok(funder)
    }

    pub fn get(&self, id: Uuid) -> Result<Funder, ServiceError> {
        self.repo.get(id)?.ok_or_else(|| ServiceError::NotFound {
            entity: KIND.label(),
            key: id.to_string(),
        })
    }

    pub fn update(&self, id: Uuid, patch: FunderPatch) -> Result<Funder, ServiceError> {
        let mut funder = self.get(id)?;
        if let Some(name) = patch.name {
            funder.name = entity_name("name", &name)?;
            self.ensure_name_free(&funder.name, Some(id))?;
        }
        if let Some(funder_type) = patch.funder_type {
            funder.funder_type = require_text("funderType", &funder_type)?;
        }
        if let Some(contact_email) = patch.contact_email {
            funder.contact_email = optional_email("contactEmail", contact_email.as_deref())?;
        }
        if let Some(contact_phone) = patch.contact_phone {
            funder.contact_phone = optional_text(contact_phone.as_deref());
        }
        let funder = self.repo.update(&funder)?;
        info!("event=funder_update module=service status=ok id={id}");
        Ok(funder)
    }

    pub fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.repo.delete(id)?;
        info!("event=funder_delete module=service status=ok id={id}");
        Ok(())
    }

    pub fn list(&self, params: &ListParams) -> Result<Paginated<Funder>, ServiceError> {
        let predicate = build_predicate(params, &FUNDER_QUERY);
        Ok(self.repo.list(&predicate, params.page)?)
    }

    fn ensure_name_free(&self, name: &str, exclude: Option<Uuid>) -> Result<(), ServiceError> {
        let key = UniqueKey::single("name", "name", name.to_string());
        Ok(self.guard.check_duplicate(KIND, &key, exclude)?)
    }
}
