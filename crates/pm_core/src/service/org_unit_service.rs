//! Organisation unit use-case service.
//!
//! # Responsibility
//! - Create, move and delete units of the organisational hierarchy.
//! - Expose tree, ancestry and child views over the flat parent-pointer table.
//!
//! # Invariants
//! - Parent must exist before a unit is attached to it.
//! - `code` stays unique; re-parenting never closes a cycle.
//! - A unit with children, positions or projects cannot be deleted.

use super::error::ServiceError;
use super::{ancestry_of, ensure_acyclic_parent};
use crate::hierarchy::{build_tree, Forest};
use crate::model::organisation_unit::{
    NewOrganisationUnit, OrganisationUnit, OrganisationUnitPatch,
};
use crate::model::position::Position;
use crate::model::validation::{optional_text, require_text};
use crate::pagination::Paginated;
use crate::query::{build_predicate, ListParams};
use crate::repo::org_unit_repo::{OrganisationUnitRepository, ORGANISATION_UNIT_QUERY};
use crate::repo::registry::{EntityKind, RecordGuard, UniqueKey};
use log::info;
use uuid::Uuid;

const KIND: EntityKind = EntityKind::OrganisationUnit;

/// Organisation unit service facade.
pub struct OrganisationUnitService<R: OrganisationUnitRepository, G: RecordGuard> {
    repo: R,
    guard: G,
}

impl<R: OrganisationUnitRepository, G: RecordGuard> OrganisationUnitService<R, G> {
    pub fn new(repo: R, guard: G) -> Self {
        Self { repo, guard }
    }

    /// Creates a unit, optionally under an existing parent.
    pub fn create(&self, input: NewOrganisationUnit) -> Result<OrganisationUnit, ServiceError> {
        let input = NewOrganisationUnit {
            name: require_text("name", &input.name)?,
            code: optional_text(input.code.as_deref()),
            parent_id: input.parent_id,
        };
        self.guard.check_exists_opt(KIND, input.parent_id)?;
        self.ensure_code_free(input.code.as_deref(), None)?;

        let unit = self.repo.create(&input)?;
        info!(
            "event=org_unit_create module=service status=ok id={} has_parent={}",
            unit.id,
            unit.parent_id.is_some()
        );
        Ok(unit)
    }

    /// Creates a unit directly under `parent_id`.
    pub fn add_child(
        &self,
        parent_id: Uuid,
        input: NewOrganisationUnit,
    ) -> Result<OrganisationUnit, ServiceError> {
        self.create(NewOrganisationUnit {
            parent_id: Some(parent_id),
            ..input
        })
    }

    pub fn get(&self, id: Uuid) -> Result<OrganisationUnit, ServiceError> {
        self.repo.get(id)?.ok_or_else(|| not_found(id))
    }

    /// Applies a partial update, re-checking parent existence, code
    /// uniqueness and acyclicity.
    pub fn update(
        &self,
        id: Uuid,
        patch: OrganisationUnitPatch,
    ) -> Result<OrganisationUnit, ServiceError> {
        let mut unit = self.get(id)?;

        if let Some(name) = patch.name {
            unit.name = require_text("name", &name)?;
        }
        if let Some(code) = patch.code {
            unit.code = optional_text(code.as_deref());
            self.ensure_code_free(unit.code.as_deref(), Some(id))?;
        }
        if let Some(parent_id) = patch.parent_id {
            if let Some(new_parent) = parent_id {
                self.guard.check_exists(KIND, new_parent)?;
                ensure_acyclic_parent(KIND, id, new_parent, |node| {
                    self.repo.get(node).map_err(ServiceError::from)
                })?;
            }
            unit.parent_id = parent_id;
        }

        let updated = self.repo.update(&unit)?;
        info!("event=org_unit_update module=service status=ok id={id}");
        Ok(updated)
    }

    /// Deletes a leaf unit with nothing attached to it.
    pub fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.guard.check_exists(KIND, id)?;
        let dependents = self.repo.dependents(id)?;
        if dependents.children > 0 {
            return Err(ServiceError::bad_request(format!(
                "organisation unit {id} has {} child unit(s); delete or move them first",
                dependents.children
            )));
        }
        if !dependents.is_empty() {
            return Err(ServiceError::bad_request(format!(
                "organisation unit {id} still has {} position(s) and {} project(s)",
                dependents.positions, dependents.projects
            )));
        }
        self.repo.delete(id)?;
        info!("event=org_unit_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Paginated listing. `parent_id` restricts to direct children of one unit.
    pub fn list(
        &self,
        params: &ListParams,
        parent_id: Option<Uuid>,
    ) -> Result<Paginated<OrganisationUnit>, ServiceError> {
        let predicate = build_predicate(params, &ORGANISATION_UNIT_QUERY)
            .and_eq("parent_id", parent_id.map(|id| id.to_string()));
        Ok(self.repo.list(&predicate, params.page)?)
    }

    pub fn children(&self, id: Uuid) -> Result<Vec<OrganisationUnit>, ServiceError> {
        self.guard.check_exists(KIND, id)?;
        Ok(self.repo.children(id)?)
    }

    /// Direct parent, or `None` for a top-level unit.
    pub fn parent(&self, id: Uuid) -> Result<Option<OrganisationUnit>, ServiceError> {
        match self.get(id)?.parent_id {
            Some(parent_id) => Ok(self.repo.get(parent_id)?),
            None => Ok(None),
        }
    }

    /// Root-first chain from the top-level unit down to `id`.
    pub fn hierarchy(&self, id: Uuid) -> Result<Vec<OrganisationUnit>, ServiceError> {
        ancestry_of(KIND, id, |node| self.repo.get(node).map_err(ServiceError::from))
    }

    /// Whole organisation as a forest.
    pub fn tree(&self) -> Result<Forest<OrganisationUnit>, ServiceError> {
        Ok(build_tree(self.repo.list_all()?)?)
    }

    /// Positions defined directly on the unit.
    pub fn positions(&self, id: Uuid) -> Result<Vec<Position>, ServiceError> {
        self.guard.check_exists(KIND, id)?;
        Ok(self.repo.positions(id)?)
    }

    fn ensure_code_free(&self, code: Option<&str>, exclude: Option<Uuid>) -> Result<(), ServiceError> {
        if let Some(code) = code {
            self.guard
                .check_duplicate(KIND, &UniqueKey::single("code", "code", code.to_string()), exclude)?;
        }
        Ok(())
    }
}

fn not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound {
        entity: KIND.label(),
        key: id.to_string(),
    }
}
