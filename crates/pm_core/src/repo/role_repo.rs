//! Role, user-role and role-permission link repository.
//!
//! # Invariants
//! - A `(user_id, role_id)` pair is linked at most once.
//! - A `(role_id, permission_id)` pair is linked at most once.

use super::permission_repo::{permission_from_row, PERMISSION_COLUMNS};
use super::{
    ensure_connection_ready, fetch_page, from_millis, map_unique_violation, now_millis,
    parse_optional_uuid, parse_uuid, query_all, query_optional, ListSource, RepoError,
    RepoResult,
};
use crate::model::user::{NewRole, Permission, Role, RolePermission, UserRole};
use crate::pagination::{PageRequest, Paginated};
use crate::query::{FieldMap, Predicate, QueryConfig, SortOrder, SortSpec};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

pub const ROLE_QUERY: QueryConfig = QueryConfig {
    searchable: &["name"],
    sortable: &[
        FieldMap {
            name: "name",
            column: "name",
        },
        FieldMap {
            name: "createdAt",
            column: "created_at",
        },
    ],
    default_sort: SortSpec {
        field: "name",
        order: SortOrder::Asc,
    },
    tiebreaker: "id",
};

pub const USER_ROLE_QUERY: QueryConfig = QueryConfig {
    searchable: &[],
    sortable: &[FieldMap {
        name: "createdAt",
        column: "created_at",
    }],
    default_sort: SortSpec {
        field: "createdAt",
        order: SortOrder::Desc,
    },
    tiebreaker: "rowid",
};

const ROLE_COLUMNS: &str = "id, name, organisation_unit_id, created_at";
const ROLE_SOURCE: ListSource = ListSource {
    columns: ROLE_COLUMNS,
    from: "roles",
};
const LINK_SOURCE: ListSource = ListSource {
    columns: "user_id, role_id, created_at",
    from: "user_roles",
};

pub trait RoleRepository {
    fn create(&self, input: &NewRole) -> RepoResult<Role>;
    fn get(&self, id: Uuid) -> RepoResult<Option<Role>>;
    fn update(&self, role: &Role) -> RepoResult<Role>;
    /// Deletes the role and its permission links.
    fn delete(&self, id: Uuid) -> RepoResult<()>;
    fn list(&self, predicate: &Predicate, page: PageRequest) -> RepoResult<Paginated<Role>>;
    /// Number of users currently holding the role.
    fn holder_count(&self, id: Uuid) -> RepoResult<u64>;
    fn link(&self, user_id: Uuid, role_id: Uuid) -> RepoResult<UserRole>;
    fn unlink(&self, user_id: Uuid, role_id: Uuid) -> RepoResult<()>;
    fn list_links(&self, predicate: &Predicate, page: PageRequest)
        -> RepoResult<Paginated<UserRole>>;
    fn grant(&self, role_id: Uuid, permission_id: Uuid) -> RepoResult<RolePermission>;
    fn revoke(&self, role_id: Uuid, permission_id: Uuid) -> RepoResult<()>;
    /// Permissions granted to the role, ordered by code.
    fn permissions(&self, role_id: Uuid) -> RepoResult<Vec<Permission>>;
}

pub struct SqliteRoleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRoleRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl RoleRepository for SqliteRoleRepository<'_> {
    fn create(&self, input: &NewRole) -> RepoResult<Role> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO roles (id, name, organisation_unit_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4);",
                params![
                    id.to_string(),
                    input.name,
                    input.organisation_unit_id.map(|value| value.to_string()),
                    now_millis(),
                ],
            )
            .map_err(|err| map_unique_violation(err, "role", "name"))?;
        self.get(id)?.ok_or_else(|| not_found(id))
    }

    fn get(&self, id: Uuid) -> RepoResult<Option<Role>> {
        query_optional(
            self.conn,
            &format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = ?1;"),
            &[Value::Text(id.to_string())],
            role_from_row,
        )
    }

    fn update(&self, role: &Role) -> RepoResult<Role> {
        let changed = self
            .conn
            .execute(
                "UPDATE roles SET name = ?2, organisation_unit_id = ?3, updated_at = ?4
                 WHERE id = ?1;",
                params![
                    role.id.to_string(),
                    role.name,
                    role.organisation_unit_id.map(|value| value.to_string()),
                    now_millis(),
                ],
            )
            .map_err(|err| map_unique_violation(err, "role", "name"))?;
        if changed == 0 {
            return Err(not_found(role.id));
        }
        self.get(role.id)?.ok_or_else(|| not_found(role.id))
    }

    fn delete(&self, id: Uuid) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM roles WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn list(&self, predicate: &Predicate, page: PageRequest) -> RepoResult<Paginated<Role>> {
        fetch_page(self.conn, &ROLE_SOURCE, predicate, page, role_from_row)
    }

    fn holder_count(&self, id: Uuid) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM user_roles WHERE role_id = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn link(&self, user_id: Uuid, role_id: Uuid) -> RepoResult<UserRole> {
        let created_at = now_millis();
        self.conn
            .execute(
                "INSERT INTO user_roles (user_id, role_id, created_at) VALUES (?1, ?2, ?3);",
                params![user_id.to_string(), role_id.to_string(), created_at],
            )
            .map_err(|err| map_unique_violation(err, "user role", "user and role"))?;
        Ok(UserRole {
            user_id,
            role_id,
            created_at: from_millis(created_at, "user_roles.created_at")?,
        })
    }

    fn unlink(&self, user_id: Uuid, role_id: Uuid) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM user_roles WHERE user_id = ?1 AND role_id = ?2;",
            params![user_id.to_string(), role_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "user role",
                key: format!("user {user_id} / role {role_id}"),
            });
        }
        Ok(())
    }

    fn list_links(
        &self,
        predicate: &Predicate,
        page: PageRequest,
    ) -> RepoResult<Paginated<UserRole>> {
        fetch_page(self.conn, &LINK_SOURCE, predicate, page, link_from_row)
    }

    fn grant(&self, role_id: Uuid, permission_id: Uuid) -> RepoResult<RolePermission> {
        let created_at = now_millis();
        self.conn
            .execute(
                "INSERT INTO role_permissions (role_id, permission_id, created_at)
                 VALUES (?1, ?2, ?3);",
                params![role_id.to_string(), permission_id.to_string(), created_at],
            )
            .map_err(|err| map_unique_violation(err, "role permission", "role and permission"))?;
        Ok(RolePermission {
            role_id,
            permission_id,
            created_at: from_millis(created_at, "role_permissions.created_at")?,
        })
    }

    fn revoke(&self, role_id: Uuid, permission_id: Uuid) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM role_permissions WHERE role_id = ?1 AND permission_id = ?2;",
            params![role_id.to_string(), permission_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "role permission",
                key: format!("role {role_id} / permission {permission_id}"),
            });
        }
        Ok(())
    }

    fn permissions(&self, role_id: Uuid) -> RepoResult<Vec<Permission>> {
        query_all(
            self.conn,
            &format!(
                "SELECT {PERMISSION_COLUMNS} FROM permissions
                 WHERE id IN (SELECT permission_id FROM role_permissions WHERE role_id = ?1)
                 ORDER BY code ASC, id ASC;"
            ),
            &[Value::Text(role_id.to_string())],
            permission_from_row,
        )
    }
}

fn not_found(id: Uuid) -> RepoError {
    RepoError::NotFound {
        entity: "role",
        key: id.to_string(),
    }
}

fn role_from_row(row: &Row<'_>) -> RepoResult<Role> {
    let id: String = row.get(0)?;
    let unit_id: Option<String> = row.get(2)?;
    Ok(Role {
        id: parse_uuid(&id, "roles.id")?,
        name: row.get(1)?,
        organisation_unit_id: parse_optional_uuid(unit_id, "roles.organisation_unit_id")?,
        created_at: from_millis(row.get(3)?, "roles.created_at")?,
    })
}

fn link_from_row(row: &Row<'_>) -> RepoResult<UserRole> {
    let user_id: String = row.get(0)?;
    let role_id: String = row.get(1)?;
    Ok(UserRole {
        user_id: parse_uuid(&user_id, "user_roles.user_id")?,
        role_id: parse_uuid(&role_id, "user_roles.role_id")?,
        created_at: from_millis(row.get(2)?, "user_roles.created_at")?,
    })
}
