//! Permission repository contracts and SQLite implementation.

use super::{
    ensure_connection_ready, fetch_page, from_millis, map_unique_violation, now_millis,
    parse_uuid, query_optional, ListSource, RepoError, RepoResult,
};
use crate::model::user::{NewPermission, Permission};
use crate::pagination::{PageRequest, Paginated};
use crate::query::{FieldMap, Predicate, QueryConfig, SortOrder, SortSpec};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

pub const PERMISSION_QUERY: QueryConfig = QueryConfig {
    searchable: &["code", "COALESCE(description, '')"],
    sortable: &[
        FieldMap {
            name: "code",
            column: "code",
        },
        FieldMap {
            name: "createdAt",
            column: "created_at",
        },
    ],
    default_sort: SortSpec {
        field: "code",
        order: SortOrder::Asc,
    },
    tiebreaker: "id",
};

pub(crate) const PERMISSION_COLUMNS: &str = "id, code, description, created_at, updated_at";
const PERMISSION_SOURCE: ListSource = ListSource {
    columns: PERMISSION_COLUMNS,
    from: "permissions",
};

pub trait PermissionRepository {
    fn create(&self, input: &NewPermission) -> RepoResult<Permission>;
    fn get(&self, id: Uuid) -> RepoResult<Option<Permission>>;
    fn update(&self, permission: &Permission) -> RepoResult<Permission>;
    fn delete(&self, id: Uuid) -> RepoResult<()>;
    fn list(&self, predicate: &Predicate, page: PageRequest)
        -> RepoResult<Paginated<Permission>>;
    /// Number of roles the permission is granted to.
    fn role_count(&self, id: Uuid) -> RepoResult<u64>;
}

pub struct SqlitePermissionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePermissionRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_required(&self, id: Uuid) -> RepoResult<Permission> {
        self.get(id)?.ok_or_else(|| not_found(id))
    }
}

impl PermissionRepository for SqlitePermissionRepository<'_> {
    fn create(&self, input: &NewPermission) -> RepoResult<Permission> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO permissions (id, code, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4);",
                params![id.to_string(), input.code, input.description, now_millis()],
            )
            .map_err(|err| map_unique_violation(err, "permission", "code"))?;
        self.load_required(id)
    }

    fn get(&self, id: Uuid) -> RepoResult<Option<Permission>> {
        query_optional(
            self.conn,
            &format!("SELECT {PERMISSION_COLUMNS} FROM permissions WHERE id = ?1;"),
            &[Value::Text(id.to_string())],
            permission_from_row,
        )
    }

    fn update(&self, permission: &Permission) -> RepoResult<Permission> {
        let changed = self
            .conn
            .execute(
                "UPDATE permissions SET code = ?2, description = ?3, updated_at = ?4
                 WHERE id = ?1;",
                params![
                    permission.id.to_string(),
                    permission.code,
                    permission.description,
                    now_millis(),
                ],
            )
            .map_err(|err| map_unique_violation(err, "permission", "code"))?;
        if changed == 0 {
            return Err(not_found(permission.id));
        }
        self.load_required(permission.id)
    }

    fn delete(&self, id: Uuid) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM permissions WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn list(
        &self,
        predicate: &Predicate,
        page: PageRequest,
    ) -> RepoResult<Paginated<Permission>> {
        fetch_page(self.conn, &PERMISSION_SOURCE, predicate, page, permission_from_row)
    }

    fn role_count(&self, id: Uuid) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM role_permissions WHERE permission_id = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

fn not_found(id: Uuid) -> RepoError {
    RepoError::NotFound {
        entity: "permission",
        key: id.to_string(),
    }
}

pub(crate) fn permission_from_row(row: &Row<'_>) -> RepoResult<Permission> {
    let id: String = row.get(0)?;
    Ok(Permission {
        id: parse_uuid(&id, "permissions.id")?,
        code: row.get(1)?,
        description: row.get(2)?,
        created_at: from_millis(row.get(3)?, "permissions.created_at")?,
        updated_at: from_millis(row.get(4)?, "permissions.updated_at")?,
    })
}
