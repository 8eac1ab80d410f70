//! Role, user-role and role-permission use-case service.
//!
//! # Invariants
//! - Role names are unique.
//! - A user holds a role at most once; re-assigning is a conflict.
//! - A role is granted a permission at most once.
//! - A role held by any user cannot be deleted.

use super::error::ServiceError;
use crate::model::user::{NewRole, Permission, Role, RolePatch, RolePermission, UserRole};
use crate::model::validation::require_text;
use crate::pagination::Paginated;
use crate::query::{build_predicate, ListParams};
use crate::repo::registry::{EntityKind, RecordGuard, UniqueKey};
use crate::repo::role_repo::{RoleRepository, ROLE_QUERY, USER_ROLE_QUERY};
use log::info;
use uuid::Uuid;

pub struct RoleService<R: RoleRepository, G: RecordGuard> {
    repo: R,
    guard: G,
}

impl<R: RoleRepository, G: RecordGuard> RoleService<R, G> {
    pub fn new(repo: R, guard: G) -> Self {
        Self { repo, guard }
    }

    pub fn create(&self, input: NewRole) -> Result<Role, ServiceError> {
        let input = NewRole {
            name: require_text("name", &input.name)?,
            organisation_unit_id: input.organisation_unit_id,
        };
        self.guard
            .check_exists_opt(EntityKind::OrganisationUnit, input.organisation_unit_id)?;
        self.ensure_name_free(&input.name, None)?;
        let role = self.repo.create(&input)?;
        info!("event=role_create module=service status=ok id={}", role.id);
        Ok(role)
    }

    pub fn get(&self, id: Uuid) -> Result<Role, ServiceError> {
        self.repo.get(id)?.ok_or_else(|| ServiceError::NotFound {
            entity: EntityKind::Role.label(),
            key: id.to_string(),
        })
    }

    pub fn update(&self, id: Uuid, patch: RolePatch) -> Result<Role, ServiceError> {
        let mut role = self.get(id)?;
        if let Some(unit_id) = patch.organisation_unit_id {
            self.guard
                .check_exists_opt(EntityKind::OrganisationUnit, unit_id)?;
            role.organisation_unit_id = unit_id;
        }
        if let Some(name) = patch.name {
            role.name = require_text("name", &name)?;
            self.ensure_name_free(&role.name, Some(id))?;
        }
        let role = self.repo.update(&role)?;
        info!("event=role_update module=service status=ok id={id}");
        Ok(role)
    }

    /// Deletes a role and its permission grants.
    ///
    /// # Errors
    /// - `NotFound` for an unknown id.
    /// - `Conflict` while any user holds the role.
    pub fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.guard.check_exists(EntityKind::Role, id)?;
        let holders = self.repo.holder_count(id)?;
        if holders > 0 {
            return Err(ServiceError::Conflict(format!(
                "role {id} is assigned to {holders} user(s)"
            )));
        }
        self.repo.delete(id)?;
        info!("event=role_delete module=service status=ok id={id}");
        Ok(())
    }

    pub fn list(&self, params: &ListParams) -> Result<Paginated<Role>, ServiceError> {
        let predicate = build_predicate(params, &ROLE_QUERY);
        Ok(self.repo.list(&predicate, params.page)?)
    }

    /// Links a user to a role.
    ///
    /// # Errors
    /// - `NotFound` when either side is missing.
    /// - `Conflict` when the pair is already linked.
    pub fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> Result<UserRole, ServiceError> {
        self.guard.check_exists(EntityKind::User, user_id)?;
        self.guard.check_exists(EntityKind::Role, role_id)?;
        let link = self.repo.link(user_id, role_id)?;
        info!(
            "event=user_role_assign module=service status=ok user_id={} role_id={}",
            user_id, role_id
        );
        Ok(link)
    }

    pub fn remove_role(&self, user_id: Uuid, role_id: Uuid) -> Result<(), ServiceError> {
        self.repo.unlink(user_id, role_id)?;
        info!(
            "event=user_role_remove module=service status=ok user_id={} role_id={}",
            user_id, role_id
        );
        Ok(())
    }

    /// Lists links, newest first by default.
    pub fn list_user_roles(
        &self,
        params: &ListParams,
        user_id: Option<Uuid>,
        role_id: Option<Uuid>,
    ) -> Result<Paginated<UserRole>, ServiceError> {
        let predicate = build_predicate(params, &USER_ROLE_QUERY)
            .and_eq("user_id", user_id.map(|id| id.to_string()))
            .and_eq("role_id", role_id.map(|id| id.to_string()));
        Ok(self.repo.list_links(&predicate, params.page)?)
    }

    /// Grants a permission to a role.
    ///
    /// # Errors
    /// - `NotFound` when either side is missing.
    /// - `Conflict` when the permission is already granted.
    pub fn grant_permission(
        &self,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<RolePermission, ServiceError> {
        self.guard.check_exists(EntityKind::Role, role_id)?;
        self.guard.check_exists(EntityKind::Permission, permission_id)?;
        let grant = self.repo.grant(role_id, permission_id)?;
        info!(
            "event=role_permission_grant module=service status=ok role_id={} permission_id={}",
            role_id, permission_id
        );
        Ok(grant)
    }

    pub fn revoke_permission(&self, role_id: Uuid, permission_id: Uuid) -> Result<(), ServiceError> {
        self.guard.check_exists(EntityKind::Role, role_id)?;
        self.guard.check_exists(EntityKind::Permission, permission_id)?;
        self.repo.revoke(role_id, permission_id)?;
        info!(
            "event=role_permission_revoke module=service status=ok role_id={} permission_id={}",
            role_id, permission_id
        );
        Ok(())
    }

    /// Permissions granted to a role, ordered by code.
    pub fn permissions(&self, role_id: Uuid) -> Result<Vec<Permission>, ServiceError> {
        self.guard.check_exists(EntityKind::Role, role_id)?;
        Ok(self.repo.permissions(role_id)?)
    }

    fn ensure_name_free(&self, name: &str, exclude: Option<Uuid>) -> Result<(), ServiceError> {
        let key = UniqueKey::single("name", "name", name.to_string());
        Ok(self.guard.check_duplicate(EntityKind::Role, &key, exclude)?)
    }
}
