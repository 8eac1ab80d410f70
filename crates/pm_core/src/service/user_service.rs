//! User use-case service.
//!
//! # Invariants
//! - Emails are stored lowercased; emails and usernames are unique.
//! - A user who authored evaluations or reports cannot be deleted.

use super::error::ServiceError;
use crate::model::user::{NewUser, User, UserPatch};
use crate::model::validation::{email, require_text};
use crate::pagination::Paginated;
use crate::query::{build_predicate, ListParams};
use crate::repo::registry::{EntityKind, RecordGuard, UniqueKey};
use crate::repo::user_repo::{UserRepository, USER_QUERY};
use log::info;
use uuid::Uuid;

const KIND: EntityKind = EntityKind::User;

pub struct UserService<R: UserRepository, G: RecordGuard> {
    repo: R,
    guard: G,
}

impl<R: UserRepository, G: RecordGuard> UserService<R, G> {
    pub fn new(repo: R, guard: G) -> Self {
        Self { repo, guard }
    }

    /// Creates a user; email and username must both be unused.
    pub fn create(&self, input: NewUser) -> Result<User, ServiceError> {
        let input = NewUser {
            first_name: require_text("firstName", &input.first_name)?,
            last_name: require_text("lastName", &input.last_name)?,
            email: email("email", &input.email)?,
            username: require_text("username", &input.username)?,
        };
        self.ensure_unique(&input.email, &input.username, None)?;

        let user = self.repo.create(&input)?;
        info!("event=user_create module=service status=ok id={}", user.id);
        Ok(user)
    }

    pub fn get(&self, id: Uuid) -> Result<User, ServiceError> {
        self.repo.get(id)?.ok_or_else(|| ServiceError::NotFound {
            entity: KIND.label(),
            key: id.to_string(),
        })
    }

    pub fn update(&self, id: Uuid, patch: UserPatch) -> Result<User, ServiceError> {
        let mut user = self.get(id)?;
        if let Some(first_name) = patch.first_name {
            user.first_name = require_text("firstName", &first_name)?;
        }
        if let Some(last_name) = patch.last_name {
            user.last_name = require_text("lastName", &last_name)?;
        }
        if let Some(address) = patch.email {
            user.email = email("email", &address)?;
        }
        if let Some(username) = patch.username {
            user.username = require_text("username", &username)?;
        }
        self.ensure_unique(&user.email, &user.username, Some(id))?;

        let user = self.repo.update(&user)?;
        info!("event=user_update module=service status=ok id={id}");
        Ok(user)
    }

    /// Deletes a user together with their role links and occupancy periods.
    ///
    /// # Errors
    /// - `NotFound` for an unknown id.
    /// - `Conflict` while evaluations or reports still reference the user.
    pub fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.guard.check_exists(KIND, id)?;
        let dependents = self.repo.dependents(id)?;
        if !dependents.is_empty() {
            return Err(ServiceError::Conflict(format!(
                "user {id} still has {} evaluation(s) and {} report(s)",
                dependents.evaluations, dependents.reports
            )));
        }
        self.repo.delete(id)?;
        info!("event=user_delete module=service status=ok id={id}");
        Ok(())
    }

    pub fn list(&self, params: &ListParams) -> Result<Paginated<User>, ServiceError> {
        let predicate = build_predicate(params, &USER_QUERY);
        Ok(self.repo.list(&predicate, params.page)?)
    }

    fn ensure_unique(
        &self,
        email: &str,
        username: &str,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        self.guard.check_duplicate(
            KIND,
            &UniqueKey::single("email", "email", email.to_string()),
            exclude,
        )?;
        self.guard.check_duplicate(
            KIND,
            &UniqueKey::single("username", "username", username.to_string()),
            exclude,
        )?;
        Ok(())
    }
}
