//! Category use-case service.
//!
//! # Invariants
//! - `(name, parent)` is unique, including among roots.
//! - Categories with children cannot be deleted.

use super::error::ServiceError;
use super::{ancestry_of, ensure_acyclic_parent};
use crate::hierarchy::{build_tree, Forest};
use crate::model::category::{Category, CategoryPatch, NewCategory};
use crate::model::validation::{optional_text, require_text};
use crate::pagination::Paginated;
use crate::query::{build_predicate, ListParams};
use crate::repo::category_repo::{CategoryRepository, CATEGORY_QUERY};
use crate::repo::registry::{EntityKind, RecordGuard, UniqueKey};
use crate::repo::uuid_value;
use log::info;
use uuid::Uuid;

const KIND: EntityKind = EntityKind::Category;

pub struct CategoryService<R: CategoryRepository, G: RecordGuard> {
    repo: R,
    guard: G,
}

impl<R: CategoryRepository, G: RecordGuard> CategoryService<R, G> {
    pub fn new(repo: R, guard: G) -> Self {
        Self { repo, guard }
    }

    pub fn create(&self, input: NewCategory) -> Result<Category, ServiceError> {
        let input = NewCategory {
            name: require_text("name", &input.name)?,
            description: optional_text(input.description.as_deref()),
            parent_id: input.parent_id,
        };
        self.guard.check_exists_opt(KIND, input.parent_id)?;
        self.ensure_name_free(&input.name, input.parent_id, None)?;

        let category = self.repo.create(&input)?;
        info!(
            "event=category_create module=service status=ok id={} has_parent={}",
            category.id,
            category.parent_id.is_some()
        );
        Ok(category)
    }

    pub fn create_child(&self, parent_id: Uuid, input: NewCategory) -> Result<Category, ServiceError> {
        self.create(NewCategory {
            parent_id: Some(parent_id),
            ..input
        })
    }

    pub fn get(&self, id: Uuid) -> Result<Category, ServiceError> {
        self.repo.get(id)?.ok_or_else(|| ServiceError::NotFound {
            entity: KIND.label(),
            key: id.to_string(),
        })
    }

    pub fn update(&self, id: Uuid, patch: CategoryPatch) -> Result<Category, ServiceError> {
        let mut category = self.get(id)?;

        if let Some(name) = patch.name {
            category.name = require_text("name", &name)?;
        }
        if let Some(description) = patch.description {
            category.description = optional_text(description.as_deref());
        }
        if let Some(parent_id) = patch.parent_id {
            if let Some(new_parent) = parent_id {
                self.guard.check_exists(KIND, new_parent)?;
                ensure_acyclic_parent(KIND, id, new_parent, |node| {
                    self.repo.get(node).map_err(ServiceError::from)
                })?;
            }
            category.parent_id = parent_id;
        }
        self.ensure_name_free(&category.name, category.parent_id, Some(id))?;

        let updated = self.repo.update(&category)?;
        info!("event=category_update module=service status=ok id={id}");
        Ok(updated)
    }

    pub fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.guard.check_exists(KIND, id)?;
        let children = self.repo.child_count(id)?;
        if children > 0 {
            return Err(ServiceError::bad_request(format!(
                "category {id} has {children} subcategory(ies); delete or move them first"
            )));
        }
        self.repo.delete(id)?;
        info!("event=category_delete module=service status=ok id={id}");
        Ok(())
    }

    /// Paginated flat listing of every category.
    pub fn list_all(&self, params: &ListParams) -> Result<Paginated<Category>, ServiceError> {
        let predicate = build_predicate(params, &CATEGORY_QUERY);
        Ok(self.repo.list(&predicate, params.page)?)
    }

    pub fn children(&self, id: Uuid) -> Result<Vec<Category>, ServiceError> {
        self.guard.check_exists(KIND, id)?;
        Ok(self.repo.children(id)?)
    }

    pub fn parent(&self, id: Uuid) -> Result<Option<Category>, ServiceError> {
        match self.get(id)?.parent_id {
            Some(parent_id) => Ok(self.repo.get(parent_id)?),
            None => Ok(None),
        }
    }

    pub fn hierarchy(&self, id: Uuid) -> Result<Vec<Category>, ServiceError> {
        ancestry_of(KIND, id, |node| self.repo.get(node).map_err(ServiceError::from))
    }

    pub fn tree(&self) -> Result<Forest<Category>, ServiceError> {
        Ok(build_tree(self.repo.list_all()?)?)
    }

    fn ensure_name_free(
        &self,
        name: &str,
        parent_id: Option<Uuid>,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let key = UniqueKey::single("name and parent", "name", name.to_string())
            .and("parent_id", uuid_value(parent_id));
        Ok(self.guard.check_duplicate(KIND, &key, exclude)?)
    }
}
