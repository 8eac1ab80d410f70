//! Stakeholder repository contracts and SQLite implementation.

use super::{
    ensure_connection_ready, fetch_page, from_millis, map_unique_violation, now_millis,
    parse_optional_uuid, parse_uuid, query_optional, ListSource, RepoError, RepoResult,
};
use crate::model::stakeholder::{NewStakeholder, Stakeholder};
use crate::pagination::{PageRequest, Paginated};
use crate::query::{FieldMap, Predicate, QueryConfig, SortOrder, SortSpec};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

pub const STAKEHOLDER_QUERY: QueryConfig = QueryConfig {
    searchable: &[
        "name",
        "stakeholder_type",
        "COALESCE(contact_email, '')",
        "COALESCE(contact_phone, '')",
    ],
    sortable: &[
        FieldMap {
            name: "name",
            column: "name",
        },
        FieldMap {
            name: "stakeholderType",
            column: "stakeholder_type",
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
        field: "name",
        order: SortOrder::Asc,
    },
    tiebreaker: "id",
};

pub(crate) const STAKEHOLDER_COLUMNS: &str = "id, name, stakeholder_type, contact_email, contact_phone, \
                                   organisation_unit_id, created_at, updated_at";
const STAKEHOLDER_SOURCE: ListSource = ListSource {
    columns: STAKEHOLDER_COLUMNS,
    from: "stakeholders",
};

pub trait StakeholderRepository {
    fn create(&self, input: &NewStakeholder) -> RepoResult<Stakeholder>;
    fn get(&self, id: Uuid) -> RepoResult<Option<Stakeholder>>;
    fn update(&self, stakeholder: &Stakeholder) -> RepoResult<Stakeholder>;
    fn delete(&self, id: Uuid) -> RepoResult<()>;
    fn list(&self, predicate: &Predicate, page: PageRequest)
        -> RepoResult<Paginated<Stakeholder>>;
}

pub struct SqliteStakeholderRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStakeholderRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_required(&self, id: Uuid) -> RepoResult<Stakeholder> {
        self.get(id)?.ok_or_else(|| not_found(id))
    }
}

impl StakeholderRepository for SqliteStakeholderRepository<'_> {
    fn create(&self, input: &NewStakeholder) -> RepoResult<Stakeholder> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO stakeholders (
                    id, name, stakeholder_type, contact_email, contact_phone,
                    organisation_unit_id, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7);",
                params![
                    id.to_string(),
                    input.name,
                    input.stakeholder_type,
                    input.contact_email,
                    input.contact_phone,
                    input.organisation_unit_id.map(|value| value.to_string()),
                    now_millis(),
                ],
            )
            .map_err(|err| map_unique_violation(err, "stakeholder", "name"))?;
        self.load_required(id)
    }

    fn get(&self, id: Uuid) -> RepoResult<Option<Stakeholder>> {
        query_optional(
            self.conn,
            &format!("SELECT {STAKEHOLDER_COLUMNS} FROM stakeholders WHERE id = ?1;"),
            &[Value::Text(id.to_string())],
            stakeholder_from_row,
        )
    }

    fn update(&self, stakeholder: &Stakeholder) -> RepoResult<Stakeholder> {
        let changed = self
            .conn
            .execute(
                "UPDATE stakeholders
                 SET name = ?2, stakeholder_type = ?3, contact_email = ?4, contact_phone = ?5,
                     organisation_unit_id = ?6, updated_at = ?7
                 WHERE id = ?1;",
                params![
                    stakeholder.id.to_string(),
                    stakeholder.name,
                    stakeholder.stakeholder_type,
                    stakeholder.contact_email,
                    stakeholder.contact_phone,
                    stakeholder.organisation_unit_id.map(|value| value.to_string()),
                    now_millis(),
                ],
            )
            .map_err(|err| map_unique_violation(err, "stakeholder", "name"))?;
        if changed == 0 {
            return Err(not_found(stakeholder.id));
        }
        self.load_required(stakeholder.id)
    }

    fn delete(&self, id: Uuid) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM stakeholders WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn list(
        &self,
        predicate: &Predicate,
        page: PageRequest,
    ) -> RepoResult<Paginated<Stakeholder>> {
        fetch_page(self.conn, &STAKEHOLDER_SOURCE, predicate, page, stakeholder_from_row)
    }
}

fn not_found(id: Uuid) -> RepoError {
    RepoError::NotFound {
        entity: "stakeholder",
        key: id.to_string(),
    }
}

pub(crate) fn stakeholder_from_row(row: &Row<'_>) -> RepoResult<Stakeholder> {
    let id: String = row.get(0)?;
    let unit_id: Option<String> = row.get(5)?;
    Ok(Stakeholder {
        id: parse_uuid(&id, "stakeholders.id")?,
        name: row.get(1)?,
        stakeholder_type: row.get(2)?,
        contact_email: row.get(3)?,
        contact_phone: row.get(4)?,
        organisation_unit_id: parse_optional_uuid(unit_id, "stakeholders.organisation_unit_id")?,
        created_at: from_millis(row.get(6)?, "stakeholders.created_at")?,
        updated_at: from_millis(row.get(7)?, "stakeholders.updated_at")?,
    })
}
