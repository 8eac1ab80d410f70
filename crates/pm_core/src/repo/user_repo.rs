//! User repository contracts and SQLite implementation.

use super::{
    ensure_connection_ready, fetch_page, from_millis, map_unique_violation, now_millis,
    parse_uuid, query_optional, ListSource, RepoError, RepoResult,
};
use crate::model::user::{NewUser, User};
use crate::pagination::{PageRequest, Paginated};
use crate::query::{FieldMap, Predicate, QueryConfig, SortOrder, SortSpec};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

pub const USER_QUERY: QueryConfig = QueryConfig {
    searchable: &["first_name", "last_name", "email", "username"],
    sortable: &[
        FieldMap {
            name: "firstName",
            column: "first_name",
        },
        FieldMap {
            name: "lastName",
            column: "last_name",
        },
        FieldMap {
            name: "email",
            column: "email",
        },
        FieldMap {
            name: "createdAt",
            column: "created_at",
        },
    ],
    default_sort: SortSpec {
        field: "createdAt",
        order: SortOrder::Desc,
    },
    tiebreaker: "id",
};

const USER_COLUMNS: &str = "id, first_name, last_name, email, username, created_at";
const USER_SOURCE: ListSource = ListSource {
    columns: USER_COLUMNS,
    from: "users",
};

/// Rows that keep a user from being deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserDependents {
    pub evaluations: u64,
    pub reports: u64,
}

impl UserDependents {
    pub fn is_empty(&self) -> bool {
        self.evaluations == 0 && self.reports == 0
    }
}

pub trait UserRepository {
    fn create(&self, input: &NewUser) -> RepoResult<User>;
    fn get(&self, id: Uuid) -> RepoResult<Option<User>>;
    fn update(&self, user: &User) -> RepoResult<User>;
    /// Deletes the user; role links and occupancy periods go with it.
    fn delete(&self, id: Uuid) -> RepoResult<()>;
    fn list(&self, predicate: &Predicate, page: PageRequest) -> RepoResult<Paginated<User>>;
    fn dependents(&self, id: Uuid) -> RepoResult<UserDependents>;
}

pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create(&self, input: &NewUser) -> RepoResult<User> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO users (id, first_name, last_name, email, username, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6);",
                params![
                    id.to_string(),
                    input.first_name,
                    input.last_name,
                    input.email,
                    input.username,
                    now_millis(),
                ],
            )
            .map_err(|err| map_unique_violation(err, "user", "email or username"))?;
        self.get(id)?.ok_or_else(|| not_found(id))
    }

    fn get(&self, id: Uuid) -> RepoResult<Option<User>> {
        query_optional(
            self.conn,
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1;"),
            &[Value::Text(id.to_string())],
            user_from_row,
        )
    }

    fn update(&self, user: &User) -> RepoResult<User> {
        let changed = self
            .conn
            .execute(
                "UPDATE users
                 SET first_name = ?2, last_name = ?3, email = ?4, username = ?5, updated_at = ?6
                 WHERE id = ?1;",
                params![
                    user.id.to_string(),
                    user.first_name,
                    user.last_name,
                    user.email,
                    user.username,
                    now_millis(),
                ],
            )
            .map_err(|err| map_unique_violation(err, "user", "email or username"))?;
        if changed == 0 {
            return Err(not_found(user.id));
        }
        self.get(user.id)?.ok_or_else(|| not_found(user.id))
    }

    fn delete(&self, id: Uuid) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn list(&self, predicate: &Predicate, page: PageRequest) -> RepoResult<Paginated<User>> {
        fetch_page(self.conn, &USER_SOURCE, predicate, page, user_from_row)
    }

    fn dependents(&self, id: Uuid) -> RepoResult<UserDependents> {
        let (evaluations, reports): (i64, i64) = self.conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM project_evaluations WHERE evaluator_id = ?1),
                (SELECT COUNT(*) FROM project_reports WHERE submitted_by_id = ?1);",
            [id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(UserDependents {
            evaluations: u64::try_from(evaluations).unwrap_or_default(),
            reports: u64::try_from(reports).unwrap_or_default(),
        })
    }
}

fn not_found(id: Uuid) -> RepoError {
    RepoError::NotFound {
        entity: "user",
        key: id.to_string(),
    }
}

fn user_from_row(row: &Row<'_>) -> RepoResult<User> {
    let id: String = row.get(0)?;
    Ok(User {
        id: parse_uuid(&id, "users.id")?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        username: row.get(4)?,
        created_at: from_millis(row.get(5)?, "users.created_at")?,
    })
}
