//! Organisation unit repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Child listing is deterministic: `name ASC, id ASC`.
//! - Full-table reads keep the same order so built trees are stable.

use super::position_repo::{position_from_row, POSITION_COLUMNS};
use super::{
    ensure_connection_ready, fetch_page, from_millis, map_unique_violation, now_millis,
    parse_optional_uuid, parse_uuid, query_all, query_optional, ListSource, RepoError,
    RepoResult,
};
use crate::model::organisation_unit::{NewOrganisationUnit, OrganisationUnit};
use crate::model::position::Position;
use crate::pagination::{PageRequest, Paginated};
use crate::query::{FieldMap, Predicate, QueryConfig, SortOrder, SortSpec};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

/// Search/sort whitelist for organisation unit listings.
pub const ORGANISATION_UNIT_QUERY: QueryConfig = QueryConfig {
    searchable: &["name", "COALESCE(code, '')"],
    sortable: &[
        FieldMap {
            name: "name",
            column: "name",
        },
        FieldMap {
            name: "code",
            column: "code",
        },
        FieldMap {
            name: "id",
            column: "id",
        },
        FieldMap {
            name: "parentId",
            column: "parent_id",
        },
    ],
    default_sort: SortSpec {
        field: "name",
        order: SortOrder::Asc,
    },
    tiebreaker: "id",
};

const UNIT_COLUMNS: &str = "id, name, code, parent_id, created_at, updated_at";
const UNIT_SOURCE: ListSource = ListSource {
    columns: UNIT_COLUMNS,
    from: "organisation_units",
};

/// Rows that keep an organisation unit from being deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitDependents {
    pub children: u64,
    pub positions: u64,
    pub projects: u64,
}

impl UnitDependents {
    pub fn is_empty(&self) -> bool {
        self.children == 0 && self.positions == 0 && self.projects == 0
    }
}

/// Repository interface for organisation units.
pub trait OrganisationUnitRepository {
    /// Inserts one unit. Input must already be validated.
    fn create(&self, input: &NewOrganisationUnit) -> RepoResult<OrganisationUnit>;
    fn get(&self, id: Uuid) -> RepoResult<Option<OrganisationUnit>>;
    /// Persists every mutable column of `unit` and bumps `updated_at`.
    fn update(&self, unit: &OrganisationUnit) -> RepoResult<OrganisationUnit>;
    fn delete(&self, id: Uuid) -> RepoResult<()>;
    fn list(&self, predicate: &Predicate, page: PageRequest)
        -> RepoResult<Paginated<OrganisationUnit>>;
    /// Every unit, for tree construction.
    fn list_all(&self) -> RepoResult<Vec<OrganisationUnit>>;
    fn children(&self, parent_id: Uuid) -> RepoResult<Vec<OrganisationUnit>>;
    fn dependents(&self, id: Uuid) -> RepoResult<UnitDependents>;
    fn positions(&self, id: Uuid) -> RepoResult<Vec<Position>>;
}

/// SQLite-backed organisation unit repository.
pub struct SqliteOrganisationUnitRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteOrganisationUnitRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_required(&self, id: Uuid) -> RepoResult<OrganisationUnit> {
        self.get(id)?.ok_or_else(|| RepoError::NotFound {
            entity: "organisation unit",
            key: id.to_string(),
        })
    }
}

impl OrganisationUnitRepository for SqliteOrganisationUnitRepository<'_> {
    fn create(&self, input: &NewOrganisationUnit) -> RepoResult<OrganisationUnit> {
        let id = Uuid::new_v4();
        let now = now_millis();
        self.conn
            .execute(
                "INSERT INTO organisation_units (id, name, code, parent_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5);",
                params![
                    id.to_string(),
                    input.name,
                    input.code,
                    input.parent_id.map(|value| value.to_string()),
                    now,
                ],
            )
            .map_err(|err| map_unique_violation(err, "organisation unit", "code"))?;
        self.load_required(id)
    }

    fn get(&self, id: Uuid) -> RepoResult<Option<OrganisationUnit>> {
        query_optional(
            self.conn,
            &format!("SELECT {UNIT_COLUMNS} FROM organisation_units WHERE id = ?1;"),
            &[Value::Text(id.to_string())],
            unit_from_row,
        )
    }

    fn update(&self, unit: &OrganisationUnit) -> RepoResult<OrganisationUnit> {
        let changed = self
            .conn
            .execute(
                "UPDATE organisation_units
                 SET name = ?2, code = ?3, parent_id = ?4, updated_at = ?5
                 WHERE id = ?1;",
                params![
                    unit.id.to_string(),
                    unit.name,
                    unit.code,
                    unit.parent_id.map(|value| value.to_string()),
                    now_millis(),
                ],
            )
            .map_err(|err| map_unique_violation(err, "organisation unit", "code"))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "organisation unit",
                key: unit.id.to_string(),
            });
        }
        self.load_required(unit.id)
    }

    fn delete(&self, id: Uuid) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM organisation_units WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "organisation unit",
                key: id.to_string(),
            });
        }
        Ok(())
    }

    fn list(
        &self,
        predicate: &Predicate,
        page: PageRequest,
    ) -> RepoResult<Paginated<OrganisationUnit>> {
        fetch_page(self.conn, &UNIT_SOURCE, predicate, page, unit_from_row)
    }

    fn list_all(&self) -> RepoResult<Vec<OrganisationUnit>> {
        query_all(
            self.conn,
            &format!("SELECT {UNIT_COLUMNS} FROM organisation_units ORDER BY name ASC, id ASC;"),
            &[],
            unit_from_row,
        )
    }

    fn children(&self, parent_id: Uuid) -> RepoResult<Vec<OrganisationUnit>> {
        query_all(
            self.conn,
            &format!(
                "SELECT {UNIT_COLUMNS} FROM organisation_units
                 WHERE parent_id = ?1
                 ORDER BY name ASC, id ASC;"
            ),
            &[Value::Text(parent_id.to_string())],
            unit_from_row,
        )
    }

    fn dependents(&self, id: Uuid) -> RepoResult<UnitDependents> {
        let (children, positions, projects): (i64, i64, i64) = self.conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM organisation_units WHERE parent_id = ?1),
                (SELECT COUNT(*) FROM positions WHERE organisation_unit_id = ?1),
                (SELECT COUNT(*) FROM projects WHERE organisation_unit_id = ?1);",
            [id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(UnitDependents {
            children: u64::try_from(children).unwrap_or_default(),
            positions: u64::try_from(positions).unwrap_or_default(),
            projects: u64::try_from(projects).unwrap_or_default(),
        })
    }

    fn positions(&self, id: Uuid) -> RepoResult<Vec<Position>> {
        query_all(
            self.conn,
            &format!(
                "SELECT {POSITION_COLUMNS} FROM positions
                 WHERE organisation_unit_id = ?1
                 ORDER BY title ASC, id ASC;"
            ),
            &[Value::Text(id.to_string())],
            position_from_row,
        )
    }
}

fn unit_from_row(row: &Row<'_>) -> RepoResult<OrganisationUnit> {
    let id: String = row.get(0)?;
    let parent_id: Option<String> = row.get(3)?;
    Ok(OrganisationUnit {
        id: parse_uuid(&id, "organisation_units.id")?,
        name: row.get(1)?,
        code: row.get(2)?,
        parent_id: parse_optional_uuid(parent_id, "organisation_units.parent_id")?,
        created_at: from_millis(row.get(4)?, "organisation_units.created_at")?,
        updated_at: from_millis(row.get(5)?, "organisation_units.updated_at")?,
    })
}
