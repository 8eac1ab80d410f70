//! Permission use-case service.
//!
//! # Invariants
//! - Codes are unique.
//! - A permission granted to any role cannot be deleted.

use super::error::ServiceError;
use crate::model::user::{NewPermission, Permission, PermissionPatch};
use crate::model::validation::{optional_text, require_text};
use crate::pagination::Paginated;
use crate::query::{build_predicate, ListParams};
use crate::repo::permission_repo::{PermissionRepository, PERMISSION_QUERY};
use crate::repo::registry::{EntityKind, RecordGuard, UniqueKey};
use log::info;
use uuid::Uuid;

const KIND: EntityKind = EntityKind::Permission;

pub struct PermissionService<R: PermissionRepository, G: RecordGuard> {
    repo: R,
    guard: G,
}

impl<R: PermissionRepository, G: RecordGuard> PermissionService<R, G> {
    pub fn new(repo: R, guard: G) -> Self {
        Self { repo, guard }
    }

    pub fn create(&self, input: NewPermission) -> Result<Permission, ServiceError> {
        let input = NewPermission {
            code: require_text("code", &input.code)?,
            description: optional_text(input.description.as_deref()),
        };
        self.ensure_code_free(&input.code, None)?;
        let permission = self.repo.create(&input)?;
        info!(
            "event=permission_create module=service status=ok id={}",
            permission.id
        );
        Ok(permission)
    }

    pub fn get(&self, id: Uuid) -> Result<Permission, ServiceError> {
        self.repo.get(id)?.ok_or_else(|| ServiceError::NotFound {
            entity: KIND.label(),
            key: id.to_string(),
        })
    }

    pub fn update(&self, id: Uuid, patch: PermissionPatch) -> Result<Permission, ServiceError> {
        let mut permission = self.get(id)?;
        if let Some(code) = patch.code {
            permission.code = require_text("code", &code)?;
            self.ensure_code_free(&permission.code, Some(id))?;
        }
        if let Some(description) = patch.description {
            permission.description = optional_text(description.as_deref());
        }
        let permission = self.repo.update(&permission)?;
        info!("event=permission_update module=service status=ok id={id}");
        Ok(permission)
    }

    /// # Errors
    /// - `NotFound` for an unknown id.
    /// - `Conflict` while the permission is granted to any role.
    pub fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.guard.check_exists(KIND, id)?;
        let roles = self.repo.role_count(id)?;
        if roles > 0 {
            return Err(ServiceError::Conflict(format!(
                "permission {id} is granted to {roles} role(s)"
            )));
        }
        self.repo.delete(id)?;
        info!("event=permission_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Lists permissions by code; search matches code and description.
    pub fn list(&self, params: &ListParams) -> Result<Paginated<Permission>, ServiceError> {
        let predicate = build_predicate(params, &PERMISSION_QUERY);
        Ok(self.repo.list(&predicate, params.page)?)
    }

    fn ensure_code_free(&self, code: &str, exclude: Option<Uuid>) -> Result<(), ServiceError> {
        let key = UniqueKey::single("code", "code", code.to_string());
        Ok(self.guard.check_duplicate(KIND, &key, exclude)?)
    }
}
