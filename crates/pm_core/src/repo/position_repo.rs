//! Position repository contracts and SQLite implementation.

use super::{
    ensure_connection_ready, fetch_page, from_millis, map_unique_violation, now_millis,
    parse_uuid, query_optional, ListSource, RepoError, RepoResult,
};
use crate::model::position::{NewPosition, Position};
use crate::pagination::{PageRequest, Paginated};
use crate::query::{FieldMap, Predicate, QueryConfig, SortOrder, SortSpec};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

pub const POSITION_QUERY: QueryConfig = QueryConfig {
    searchable: &["title", "COALESCE(description, '')"],
    sortable: &[
        FieldMap {
            name: "title",
            column: "title",
        },
        FieldMap {
            name: "description",
            column: "description",
        },
        FieldMap {
            name: "id",
            column: "id",
        },
        FieldMap {
            name: "organisationUnitId",
            column: "organisation_unit_id",
        },
    ],
    default_sort: SortSpec {
        field: "title",
        order: SortOrder::Asc,
    },
    tiebreaker: "id",
};

pub(crate) const POSITION_COLUMNS: &str =
    "id, title, description, organisation_unit_id, created_at, updated_at";
const POSITION_SOURCE: ListSource = ListSource {
    columns: POSITION_COLUMNS,
    from: "positions",
};

pub trait PositionRepository {
    fn create(&self, input: &NewPosition) -> RepoResult<Position>;
    fn get(&self, id: Uuid) -> RepoResult<Option<Position>>;
    fn update(&self, position: &Position) -> RepoResult<Position>;
    /// Deletes the position and, by cascade, its occupancy history.
    fn delete(&self, id: Uuid) -> RepoResult<()>;
    fn list(&self, predicate: &Predicate, page: PageRequest) -> RepoResult<Paginated<Position>>;
}

pub struct SqlitePositionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePositionRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_required(&self, id: Uuid) -> RepoResult<Position> {
        self.get(id)?.ok_or_else(|| not_found(id))
    }
}

impl PositionRepository for SqlitePositionRepository<'_> {
    fn create(&self, input: &NewPosition) -> RepoResult<Position> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO positions (id, title, description, organisation_unit_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5);",
                params![
                    id.to_string(),
                    input.title,
                    input.description,
                    input.organisation_unit_id.to_string(),
                    now_millis(),
                ],
            )
            .map_err(|err| map_unique_violation(err, "position", "title"))?;
        self.load_required(id)
    }

    fn get(&self, id: Uuid) -> RepoResult<Option<Position>> {
        query_optional(
            self.conn,
            &format!("SELECT {POSITION_COLUMNS} FROM positions WHERE id = ?1;"),
            &[Value::Text(id.to_string())],
            position_from_row,
        )
    }

    fn update(&self, position: &Position) -> RepoResult<Position> {
        let changed = self
            .conn
            .execute(
                "UPDATE positions
                 SET title = ?2, description = ?3, organisation_unit_id = ?4, updated_at = ?5
                 WHERE id = ?1;",
                params![
                    position.id.to_string(),
                    position.title,
                    position.description,
                    position.organisation_unit_id.to_string(),
                    now_millis(),
                ],
            )
            .map_err(|err| map_unique_violation(err, "position", "title"))?;
        if changed == 0 {
            return Err(not_found(position.id));
        }
        self.load_required(position.id)
    }

    fn delete(&self, id: Uuid) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM positions WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn list(&self, predicate: &Predicate, page: PageRequest) -> RepoResult<Paginated<Position>> {
        fetch_page(self.conn, &POSITION_SOURCE, predicate, page, position_from_row)
    }
}

fn not_found(id: Uuid) -> RepoError {
    RepoError::NotFound {
        entity: "position",
        key: id.to_string(),
    }
}

pub(crate) fn position_from_row(row: &Row<'_>) -> RepoResult<Position> {
    let id: String = row.get(0)?;
    let unit_id: String = row.get(3)?;
    Ok(Position {
        id: parse_uuid(&id, "positions.id")?,
        title: row.get(1)?,
        description: row.get(2)?,
        organisation_unit_id: parse_uuid(&unit_id, "positions.organisation_unit_id")?,
        created_at: from_millis(row.get(4)?, "positions.created_at")?,
        updated_at: from_millis(row.get(5)?, "positions.updated_at")?,
    })
}
