//! Funder repository contracts and SQLite implementation.

use super::{
    ensure_connection_ready, fetch_page, from_millis, map_unique_violation, now_millis,
    parse_uuid, query_optional, ListSource, RepoError, RepoResult,
};
use crate::model::funder::{Funder, NewFunder};
use crate::pagination::{PageRequest, Paginated};
use crate::query::{FieldMap, Predicate, QueryConfig, SortOrder, SortSpec};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

pub const FUNDER_QUERY: QueryConfig = QueryConfig {
    searchable: &[
        "name",
        "funder_type",
        "COALESCE(contact_email, '')",
        "COALESCE(contact_phone, '')",
    ],
    sortable: &[
        FieldMap {
            name: "name",
            column: "name",
        },
        FieldMap {
            name: "funderType",
            column: "funder_type",
        },
        FieldMap {
            name: "id",
            column: "id",
        },
    ],
    default_sort: SortSpec {
        field: "name",
        order: SortOrder::Asc,
    },
    tiebreaker: "id",
};

const FUNDER_COLUMNS: &str =
    "id, name, funder_type, contact_email, contact_phone, created_at, updated_at";
const FUNDER_SOURCE: ListSource = ListSource {
    columns: FUNDER_COLUMNS,
    from: "funders",
};

pub trait FunderRepository {
    fn create(&self, input: &NewFunder) -> RepoResult<Funder>;
    fn get(&self, id: Uuid) -> RepoResult<Option<Funder>>;
    fn update(&self, funder: &Funder) -> RepoResult<Funder>;
    fn delete(&self, id: Uuid) -> RepoResult<()>;
    fn list(&self, predicate: &Predicate, page: PageRequest) -> RepoResult<Paginated<Funder>>;
}

pub struct SqliteFunderRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFunderRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_required(&self, id: Uuid) -> RepoResult<Funder> {
        self.get(id)?.ok_or_else(|| not_found(id))
    }
}

impl FunderRepository for SqliteFunderRepository<'_> {
    fn create(&self, input: &NewFunder) -> RepoResult<Funder> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO funders (id, name, funder_type, contact_email, contact_phone, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6);",
                params![
                    id.to_string(),
                    input.name,
                    input.funder_type,
                    input.contact_email,
                    input.contact_phone,
                    now_millis(),
                ],
            )
            .map_err(|err| map_unique_violation(err, "funder", "name"))?;
        self.load_required(id)
    }

    fn get(&self, id: Uuid) -> RepoResult<Option<Funder>> {
        query_optional(
            self.conn,
            &format!("SELECT {FUNDER_COLUMNS} FROM funders WHERE id = ?1;"),
            &[Value::Text(id.to_string())],
            funder_from_row,
        )
    }

    fn update(&self, funder: &Funder) -> RepoResult<Funder> {
        let changed = self
            .conn
            .execute(
                "UPDATE funders
                 SET name = ?2, funder_type = ?3, contact_email = ?4, contact_phone = ?5, updated_at = ?6
                 WHERE id = ?1;",
                params![
                    funder.id.to_string(),
                    funder.name,
                    funder.funder_type,
                    funder.contact_email,
                    funder.contact_phone,
                    now_millis(),
                ],
            )
            .map_err(|err| map_unique_violation(err, "funder", "name"))?;
        if changed == 0 {
            return Err(not_found(funder.id));
        }
        self.load_required(funder.id)
    }

    fn delete(&self, id: Uuid) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM funders WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn list(&self, predicate: &Predicate, page: PageRequest) -> RepoResult<Paginated<Funder>> {
        fetch_page(self.conn, &FUNDER_SOURCE, predicate, page, funder_from_row)
    }
}

fn not_found(id: Uuid) -> RepoError {
    RepoError::NotFound {
        entity: "funder",
        key: id.to_string(),
    }
}

fn funder_from_row(row: &Row<'_>) -> RepoResult<Funder> {
    let id: String = row.get(0)?;
    Ok(Funder {
        id: parse_uuid(&id, "funders.id")?,
        name: row.get(1)?,
        funder_type: row.get(2)?,
        contact_email: row.get(3)?,
        contact_phone: row.get(4)?,
        created_at: from_millis(row.get(5)?, "funders.created_at")?,
        updated_at: from_millis(row.get(6)?, "funders.updated_at")?,
    })
}
