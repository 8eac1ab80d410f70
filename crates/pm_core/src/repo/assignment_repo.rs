//! Position occupancy repository.
//!
//! # Responsibility
//! - Persist `(user, position, start)` occupancy periods.
//! - Run overlap checks and the write they guard in one writer transaction.
//!
//! # Invariants
//! - Every mutating call opens `BEGIN IMMEDIATE`, so concurrent writers are
//!   serialized before the overlap read happens.
//! - A rejected write leaves no partial state (the transaction rolls back on drop).

use super::{
    ensure_connection_ready, fetch_page, from_millis, map_unique_violation, parse_uuid,
    query_all, query_optional, to_millis, ListSource, RepoError, RepoResult,
};
use crate::interval::{has_overlap, BoundaryPolicy, Interval};
use crate::model::position::{AssignmentView, OccupancyChange, OccupancyTarget, UserPosition};
use crate::pagination::{PageRequest, Paginated};
use crate::query::{FieldMap, Predicate, QueryConfig, SortOrder, SortSpec};
use chrono::{DateTime, Utc};
use log::{info, warn};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

/// Search/sort whitelist for occupancy listings.
pub const ASSIGNMENT_QUERY: QueryConfig = QueryConfig {
    searchable: &["p.title", "ou.name"],
    sortable: &[
        FieldMap {
            name: "startDate",
            column: "up.start_date",
        },
        FieldMap {
            name: "endDate",
            column: "up.end_date",
        },
        FieldMap {
            name: "createdAt",
            column: "up.created_at",
        },
    ],
    default_sort: SortSpec {
        field: "startDate",
        order: SortOrder::Desc,
    },
    tiebreaker: "up.rowid",
};

const PAIR_COLUMNS: &str = "user_id, position_id, start_date, end_date";
const VIEW_SOURCE: ListSource = ListSource {
    columns: "up.user_id, up.position_id, up.start_date, up.end_date, \
              p.title, p.organisation_unit_id, ou.name",
    from: "user_positions up \
           JOIN positions p ON p.id = up.position_id \
           JOIN organisation_units ou ON ou.id = p.organisation_unit_id",
};

pub trait AssignmentRepository {
    /// Inserts `assignment` unless it overlaps another period of the same pair.
    fn insert_checked(
        &self,
        assignment: &UserPosition,
        policy: BoundaryPolicy,
    ) -> RepoResult<UserPosition>;
    /// Rewrites one period of a pair, re-checking overlap against the others.
    fn update_checked(
        &self,
        user_id: Uuid,
        position_id: Uuid,
        target: OccupancyTarget,
        change: OccupancyChange,
        policy: BoundaryPolicy,
    ) -> RepoResult<UserPosition>;
    /// Closes the latest period still open at `at`, including one scheduled
    /// to start later. The stored end is `max(at, start)`; a zero-length
    /// period counts as closed.
    fn close_active(
        &self,
        user_id: Uuid,
        position_id: Uuid,
        at: DateTime<Utc>,
    ) -> RepoResult<UserPosition>;
    /// Hard delete by exact key.
    fn delete(&self, user_id: Uuid, position_id: Uuid, start_date: DateTime<Utc>)
        -> RepoResult<()>;
    fn list(&self, predicate: &Predicate, page: PageRequest)
        -> RepoResult<Paginated<AssignmentView>>;
    /// Every period of one pair, oldest first.
    fn periods(&self, user_id: Uuid, position_id: Uuid) -> RepoResult<Vec<UserPosition>>;
}

pub struct SqliteAssignmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAssignmentRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn writer(&self) -> RepoResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

impl AssignmentRepository for SqliteAssignmentRepository<'_> {
    fn insert_checked(
        &self,
        assignment: &UserPosition,
        policy: BoundaryPolicy,
    ) -> RepoResult<UserPosition> {
        let candidate = assignment.interval()?;
        let tx = self.writer()?;

        let existing = pair_intervals(&tx, assignment.user_id, assignment.position_id, None)?;
        if has_overlap(&existing, &candidate, policy) {
            warn!(
                "event=assignment_overlap module=repo status=rejected user_id={} position_id={} policy={:?}",
                assignment.user_id, assignment.position_id, policy
            );
            return Err(RepoError::Overlap {
                user_id: assignment.user_id,
                position_id: assignment.position_id,
            });
        }

        tx.execute(
            "INSERT INTO user_positions (user_id, position_id, start_date, end_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                assignment.user_id.to_string(),
                assignment.position_id.to_string(),
                to_millis(assignment.start_date),
                assignment.end_date.map(to_millis),
                to_millis(Utc::now()),
            ],
        )
        .map_err(|err| map_unique_violation(err, "user position", "user, position and start date"))?;
        tx.commit()?;

        Ok(assignment.clone())
    }

    fn update_checked(
        &self,
        user_id: Uuid,
        position_id: Uuid,
        target: OccupancyTarget,
        change: OccupancyChange,
        policy: BoundaryPolicy,
    ) -> RepoResult<UserPosition> {
        let tx = self.writer()?;

        let current = locate_target(&tx, user_id, position_id, target)?
            .ok_or_else(|| pair_not_found(user_id, position_id))?;
        let updated = UserPosition {
            user_id,
            position_id,
            start_date: change.start_date.unwrap_or(current.start_date),
            end_date: change.end_date.unwrap_or(current.end_date),
        };
        let candidate = updated.interval()?;

        let others = pair_intervals(&tx, user_id, position_id, Some(current.start_date))?;
        if has_overlap(&others, &candidate, policy) {
            warn!(
                "event=assignment_overlap module=repo status=rejected op=update user_id={} position_id={}",
                user_id, position_id
            );
            return Err(RepoError::Overlap {
                user_id,
                position_id,
            });
        }

        tx.execute(
            "UPDATE user_positions
             SET start_date = ?4, end_date = ?5
             WHERE user_id = ?1 AND position_id = ?2 AND start_date = ?3;",
            params![
                user_id.to_string(),
                position_id.to_string(),
                to_millis(current.start_date),
                to_millis(updated.start_date),
                updated.end_date.map(to_millis),
            ],
        )
        .map_err(|err| map_unique_violation(err, "user position", "user, position and start date"))?;
        tx.commit()?;

        Ok(updated)
    }

    fn close_active(
        &self,
        user_id: Uuid,
        position_id: Uuid,
        at: DateTime<Utc>,
    ) -> RepoResult<UserPosition> {
        let tx = self.writer()?;
        let at_ms = to_millis(at);

        let active = query_optional(
            &tx,
            &format!(
                "SELECT {PAIR_COLUMNS} FROM user_positions
                 WHERE user_id = ?1 AND position_id = ?2
                   AND (end_date IS NULL OR (end_date > ?3 AND end_date > start_date))
                 ORDER BY start_date DESC
                 LIMIT 1;"
            ),
            &[
                Value::Text(user_id.to_string()),
                Value::Text(position_id.to_string()),
                Value::Integer(at_ms),
            ],
            assignment_from_row,
        )?
        .ok_or_else(|| pair_not_found(user_id, position_id))?;
        let end = at.max(active.start_date);

        tx.execute(
            "UPDATE user_positions SET end_date = ?4
             WHERE user_id = ?1 AND position_id = ?2 AND start_date = ?3;",
            params![
                user_id.to_string(),
                position_id.to_string(),
                to_millis(active.start_date),
                to_millis(end),
            ],
        )?;
        tx.commit()?;

        info!(
            "event=assignment_close module=repo status=ok user_id={} position_id={} scheduled={}",
            user_id,
            position_id,
            active.start_date > at
        );
        Ok(UserPosition {
            end_date: Some(end),
            ..active
        })
    }

    fn delete(
        &self,
        user_id: Uuid,
        position_id: Uuid,
        start_date: DateTime<Utc>,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM user_positions
             WHERE user_id = ?1 AND position_id = ?2 AND start_date = ?3;",
            params![
                user_id.to_string(),
                position_id.to_string(),
                to_millis(start_date),
            ],
        )?;
        if changed == 0 {
            return Err(pair_not_found(user_id, position_id));
        }
        Ok(())
    }

    fn list(
        &self,
        predicate: &Predicate,
        page: PageRequest,
    ) -> RepoResult<Paginated<AssignmentView>> {
        fetch_page(self.conn, &VIEW_SOURCE, predicate, page, view_from_row)
    }

    fn periods(&self, user_id: Uuid, position_id: Uuid) -> RepoResult<Vec<UserPosition>> {
        query_all(
            self.conn,
            &format!(
                "SELECT {PAIR_COLUMNS} FROM user_positions
                 WHERE user_id = ?1 AND position_id = ?2
                 ORDER BY start_date ASC;"
            ),
            &[
                Value::Text(user_id.to_string()),
                Value::Text(position_id.to_string()),
            ],
            assignment_from_row,
        )
    }
}

/// Intervals of one pair, optionally skipping the period starting at `exclude_start`.
fn pair_intervals(
    conn: &Connection,
    user_id: Uuid,
    position_id: Uuid,
    exclude_start: Option<DateTime<Utc>>,
) -> RepoResult<Vec<Interval>> {
    let rows = query_all(
        conn,
        &format!(
            "SELECT {PAIR_COLUMNS} FROM user_positions
             WHERE user_id = ?1 AND position_id = ?2 AND start_date IS NOT ?3;"
        ),
        &[
            Value::Text(user_id.to_string()),
            Value::Text(position_id.to_string()),
            exclude_start.map_or(Value::Null, |start| Value::Integer(to_millis(start))),
        ],
        assignment_from_row,
    )?;
    rows.iter()
        .map(|row| row.interval().map_err(RepoError::from))
        .collect()
}

fn locate_target(
    conn: &Connection,
    user_id: Uuid,
    position_id: Uuid,
    target: OccupancyTarget,
) -> RepoResult<Option<UserPosition>> {
    let mut binds = vec![
        Value::Text(user_id.to_string()),
        Value::Text(position_id.to_string()),
    ];
    let condition = match target {
        OccupancyTarget::Open => "end_date IS NULL",
        OccupancyTarget::StartingAt(start) => {
            binds.push(Value::Integer(to_millis(start)));
            "start_date = ?3"
        }
    };
    query_optional(
        conn,
        &format!(
            "SELECT {PAIR_COLUMNS} FROM user_positions
             WHERE user_id = ?1 AND position_id = ?2 AND {condition}
             ORDER BY start_date DESC
             LIMIT 1;"
        ),
        &binds,
        assignment_from_row,
    )
}

fn pair_not_found(user_id: Uuid, position_id: Uuid) -> RepoError {
    RepoError::NotFound {
        entity: "user position",
        key: format!("user {user_id} / position {position_id}"),
    }
}

fn assignment_from_row(row: &Row<'_>) -> RepoResult<UserPosition> {
    let user_id: String = row.get(0)?;
    let position_id: String = row.get(1)?;
    let end_date: Option<i64> = row.get(3)?;
    Ok(UserPosition {
        user_id: parse_uuid(&user_id, "user_positions.user_id")?,
        position_id: parse_uuid(&position_id, "user_positions.position_id")?,
        start_date: from_millis(row.get(2)?, "user_positions.start_date")?,
        end_date: end_date
            .map(|value| from_millis(value, "user_positions.end_date"))
            .transpose()?,
    })
}

fn view_from_row(row: &Row<'_>) -> RepoResult<AssignmentView> {
    let unit_id: String = row.get(5)?;
    Ok(AssignmentView {
        assignment: assignment_from_row(row)?,
        position_title: row.get(4)?,
        organisation_unit_id: parse_uuid(&unit_id, "positions.organisation_unit_id")?,
        organisation_unit_name: row.get(6)?,
    })
}
