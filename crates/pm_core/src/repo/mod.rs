//! Repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Keep SQL, row mapping and transaction scope inside the storage boundary.
//! - Translate storage failures into [`RepoError`].
//!
//! # Invariants
//! - Repositories only accept fully migrated connections.
//! - List reads run page and count queries in one read transaction.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::interval::IntervalError;
use crate::pagination::{PageRequest, Paginated};
use crate::query::Predicate;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, ErrorCode, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod assignment_repo;
pub mod category_repo;
pub mod evaluation_repo;
pub mod funder_repo;
pub mod org_unit_repo;
pub mod permission_repo;
pub mod position_repo;
pub mod project_link_repo;
pub mod project_repo;
pub mod registry;
pub mod report_repo;
pub mod role_repo;
pub mod stakeholder_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Referenced row does not exist.
    NotFound { entity: &'static str, key: String },
    /// A unique field set is already taken.
    Duplicate {
        entity: &'static str,
        fields: &'static str,
    },
    /// Candidate occupancy intersects an existing period of the same pair.
    Overlap { user_id: Uuid, position_id: Uuid },
    /// Occupancy period ends before it starts.
    InvalidInterval(IntervalError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted into a valid model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Duplicate { entity, fields } => {
                write!(f, "{entity} with the same {fields} already exists")
            }
            Self::Overlap {
                user_id,
                position_id,
            } => write!(
                f,
                "overlapping assignment exists for user {user_id} and position {position_id}"
            ),
            Self::InvalidInterval(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidInterval(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<IntervalError> for RepoError {
    fn from(value: IntervalError) -> Self {
        Self::InvalidInterval(value)
    }
}

/// Rejects connections whose schema is not at the latest migration.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let actual_version = current_user_version(conn)?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

/// Maps a UNIQUE/PRIMARY KEY violation to [`RepoError::Duplicate`].
///
/// Covers writes racing past an earlier duplicate check.
pub(crate) fn map_unique_violation(
    err: rusqlite::Error,
    entity: &'static str,
    fields: &'static str,
) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        let unique = failure.code == ErrorCode::ConstraintViolation
            && matches!(
                failure.extended_code,
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            );
        if unique {
            return RepoError::Duplicate { entity, fields };
        }
    }
    err.into()
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|err| RepoError::InvalidData(format!("invalid uuid in `{column}`: {err}")))
}

pub(crate) fn parse_optional_uuid(value: Option<String>, column: &str) -> RepoResult<Option<Uuid>> {
    value.map(|raw| parse_uuid(&raw, column)).transpose()
}

/// Bind value for an optional id: text or NULL.
pub(crate) fn uuid_value(id: Option<Uuid>) -> Value {
    id.map_or(Value::Null, |id| Value::Text(id.to_string()))
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(value: i64, column: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(value).ok_or_else(|| {
        RepoError::InvalidData(format!("timestamp out of range in `{column}`: {value}"))
    })
}

pub(crate) fn now_millis() -> i64 {
    to_millis(Utc::now())
}

/// Runs a parameterized query and maps every row.
pub(crate) fn query_all<T>(
    conn: &Connection,
    sql: &str,
    binds: &[Value],
    map_row: impl Fn(&Row<'_>) -> RepoResult<T>,
) -> RepoResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(binds.iter()))?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(map_row(row)?);
    }
    Ok(items)
}

/// Runs a parameterized query expected to return at most one row.
pub(crate) fn query_optional<T>(
    conn: &Connection,
    sql: &str,
    binds: &[Value],
    map_row: impl Fn(&Row<'_>) -> RepoResult<T>,
) -> RepoResult<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(binds.iter()))?;
    match rows.next()? {
        Some(row) => Ok(Some(map_row(row)?)),
        None => Ok(None),
    }
}

/// Source of one list read: selected columns and the `FROM ...` clause.
pub(crate) struct ListSource {
    pub columns: &'static str,
    pub from: &'static str,
}

/// Reads one page and the filtered total in a single deferred transaction.
pub(crate) fn fetch_page<T>(
    conn: &Connection,
    source: &ListSource,
    predicate: &Predicate,
    page: PageRequest,
    map_row: impl Fn(&Row<'_>) -> RepoResult<T>,
) -> RepoResult<Paginated<T>> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Deferred)?;
    let where_sql = predicate.where_sql();

    let count_sql = format!("SELECT COUNT(*) FROM {}{};", source.from, where_sql);
    let total: i64 = tx.query_row(&count_sql, params_from_iter(predicate.binds().iter()), |row| {
        row.get(0)
    })?;

    let page_sql = format!(
        "SELECT {} FROM {}{}{} LIMIT ? OFFSET ?;",
        source.columns,
        source.from,
        where_sql,
        predicate.order_sql()
    );
    let mut binds = predicate.binds().to_vec();
    binds.push(Value::Integer(i64::from(page.limit())));
    binds.push(Value::Integer(
        i64::try_from(page.offset()).unwrap_or(i64::MAX),
    ));
    let items = query_all(&tx, &page_sql, &binds, map_row)?;
    tx.commit()?;

    Ok(Paginated {
        items,
        total: u64::try_from(total).unwrap_or_default(),
        page,
    })
}
