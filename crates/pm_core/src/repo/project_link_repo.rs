//! Project funding and stakeholder link repository.
//!
//! # Invariants
//! - `(project_id, funder_id)` and `(project_id, stakeholder_id)` are each
//!   linked at most once; a repeated insert is a duplicate.
//! - Links disappear with either side.

use super::stakeholder_repo::{stakeholder_from_row, STAKEHOLDER_COLUMNS};
use super::{
    ensure_connection_ready, fetch_page, from_millis, map_unique_violation, now_millis,
    parse_uuid, query_all, query_optional, ListSource, RepoError, RepoResult,
};
use crate::model::project_link::{ProjectFunder, ProjectStakeholder, StakeholderRole};
use crate::model::stakeholder::Stakeholder;
use crate::model::validation::Amount;
use crate::pagination::{PageRequest, Paginated};
use crate::query::{FieldMap, Predicate, QueryConfig, SortOrder, SortSpec};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

pub const FUNDING_QUERY: QueryConfig = QueryConfig {
    searchable: &[],
    sortable: &[
        FieldMap {
            name: "createdAt",
            column: "created_at",
        },
        FieldMap {
            name: "amount",
            column: "amount_cents",
        },
    ],
    default_sort: SortSpec {
        field: "createdAt",
        order: SortOrder::Desc,
    },
    tiebreaker: "rowid",
};

pub const PROJECT_STAKEHOLDER_QUERY: QueryConfig = QueryConfig {
    searchable: &[],
    sortable: &[
        FieldMap {
            name: "createdAt",
            column: "created_at",
        },
        FieldMap {
            name: "role",
            column: "role",
        },
    ],
    default_sort: SortSpec {
        field: "createdAt",
        order: SortOrder::Desc,
    },
    tiebreaker: "rowid",
};

const FUNDING_COLUMNS: &str = "project_id, funder_id, amount_cents, created_at, updated_at";
const FUNDING_SOURCE: ListSource = ListSource {
    columns: FUNDING_COLUMNS,
    from: "project_funders",
};
const MEMBER_COLUMNS: &str = "project_id, stakeholder_id, role, created_at, updated_at";
const MEMBER_SOURCE: ListSource = ListSource {
    columns: MEMBER_COLUMNS,
    from: "project_stakeholders",
};

pub trait ProjectLinkRepository {
    fn add_funder(
        &self,
        project_id: Uuid,
        funder_id: Uuid,
        amount: Option<Amount>,
    ) -> RepoResult<ProjectFunder>;
    fn funding(&self, project_id: Uuid, funder_id: Uuid) -> RepoResult<Option<ProjectFunder>>;
    fn set_amount(
        &self,
        project_id: Uuid,
        funder_id: Uuid,
        amount: Option<Amount>,
    ) -> RepoResult<ProjectFunder>;
    fn remove_funder(&self, project_id: Uuid, funder_id: Uuid) -> RepoResult<()>;
    fn list_funding(
        &self,
        predicate: &Predicate,
        page: PageRequest,
    ) -> RepoResult<Paginated<ProjectFunder>>;

    fn add_stakeholder(
        &self,
        project_id: Uuid,
        stakeholder_id: Uuid,
        role: StakeholderRole,
    ) -> RepoResult<ProjectStakeholder>;
    fn membership(
        &self,
        project_id: Uuid,
        stakeholder_id: Uuid,
    ) -> RepoResult<Option<ProjectStakeholder>>;
    fn set_role(
        &self,
        project_id: Uuid,
        stakeholder_id: Uuid,
        role: StakeholderRole,
    ) -> RepoResult<ProjectStakeholder>;
    fn remove_stakeholder(&self, project_id: Uuid, stakeholder_id: Uuid) -> RepoResult<()>;
    /// Stakeholders linked to one project, ordered by name.
    fn stakeholders_of(&self, project_id: Uuid) -> RepoResult<Vec<Stakeholder>>;
    fn list_memberships(
        &self,
        predicate: &Predicate,
        page: PageRequest,
    ) -> RepoResult<Paginated<ProjectStakeholder>>;
}

pub struct SqliteProjectLinkRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectLinkRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn funding_required(&self, project_id: Uuid, funder_id: Uuid) -> RepoResult<ProjectFunder> {
        self.funding(project_id, funder_id)?
            .ok_or_else(|| funding_not_found(project_id, funder_id))
    }

    fn membership_required(
        &self,
        project_id: Uuid,
        stakeholder_id: Uuid,
    ) -> RepoResult<ProjectStakeholder> {
        self.membership(project_id, stakeholder_id)?
            .ok_or_else(|| membership_not_found(project_id, stakeholder_id))
    }
}

impl ProjectLinkRepository for SqliteProjectLinkRepository<'_> {
    fn add_funder(
        &self,
        project_id: Uuid,
        funder_id: Uuid,
        amount: Option<Amount>,
    ) -> RepoResult<ProjectFunder> {
        self.conn
            .execute(
                "INSERT INTO project_funders (project_id, funder_id, amount_cents, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4);",
                params![
                    project_id.to_string(),
                    funder_id.to_string(),
                    amount.map(Amount::cents),
                    now_millis(),
                ],
            )
            .map_err(|err| map_unique_violation(err, "project funder", "project and funder"))?;
        self.funding_required(project_id, funder_id)
    }

    fn funding(&self, project_id: Uuid, funder_id: Uuid) -> RepoResult<Option<ProjectFunder>> {
        query_optional(
            self.conn,
            &format!(
                "SELECT {FUNDING_COLUMNS} FROM project_funders
                 WHERE project_id = ?1 AND funder_id = ?2;"
            ),
            &[
                Value::Text(project_id.to_string()),
                Value::Text(funder_id.to_string()),
            ],
            funding_from_row,
        )
    }

    fn set_amount(
        &self,
        project_id: Uuid,
        funder_id: Uuid,
        amount: Option<Amount>,
    ) -> RepoResult<ProjectFunder> {
        let changed = self.conn.execute(
            "UPDATE project_funders SET amount_cents = ?3, updated_at = ?4
             WHERE project_id = ?1 AND funder_id = ?2;",
            params![
                project_id.to_string(),
                funder_id.to_string(),
                amount.map(Amount::cents),
                now_millis(),
            ],
        )?;
        if changed == 0 {
            return Err(funding_not_found(project_id, funder_id));
        }
        self.funding_required(project_id, funder_id)
    }

    fn remove_funder(&self, project_id: Uuid, funder_id: Uuid) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM project_funders WHERE project_id = ?1 AND funder_id = ?2;",
            params![project_id.to_string(), funder_id.to_string()],
        )?;
        if changed == 0 {
            return Err(funding_not_found(project_id, funder_id));
        }
        Ok(())
    }

    fn list_funding(
        &self,
        predicate: &Predicate,
        page: PageRequest,
    ) -> RepoResult<Paginated<ProjectFunder>> {
        fetch_page(self.conn, &FUNDING_SOURCE, predicate, page, funding_from_row)
    }

    fn add_stakeholder(
        &self,
        project_id: Uuid,
        stakeholder_id: Uuid,
        role: StakeholderRole,
    ) -> RepoResult<ProjectStakeholder> {
        self.conn
            .execute(
                "INSERT INTO project_stakeholders (project_id, stakeholder_id, role, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4);",
                params![
                    project_id.to_string(),
                    stakeholder_id.to_string(),
                    role.as_str(),
                    now_millis(),
                ],
            )
            .map_err(|err| {
                map_unique_violation(err, "project stakeholder", "project and stakeholder")
            })?;
        self.membership_required(project_id, stakeholder_id)
    }

    fn membership(
        &self,
        project_id: Uuid,
        stakeholder_id: Uuid,
    ) -> RepoResult<Option<ProjectStakeholder>> {
        query_optional(
            self.conn,
            &format!(
                "SELECT {MEMBER_COLUMNS} FROM project_stakeholders
                 WHERE project_id = ?1 AND stakeholder_id = ?2;"
            ),
            &[
                Value::Text(project_id.to_string()),
                Value::Text(stakeholder_id.to_string()),
            ],
            membership_from_row,
        )
    }

    fn set_role(
        &self,
        project_id: Uuid,
        stakeholder_id: Uuid,
        role: StakeholderRole,
    ) -> RepoResult<ProjectStakeholder> {
        let changed = self.conn.execute(
            "UPDATE project_stakeholders SET role = ?3, updated_at = ?4
             WHERE project_id = ?1 AND stakeholder_id = ?2;",
            params![
                project_id.to_string(),
                stakeholder_id.to_string(),
                role.as_str(),
                now_millis(),
            ],
        )?;
        if changed == 0 {
            return Err(membership_not_found(project_id, stakeholder_id));
        }
        self.membership_required(project_id, stakeholder_id)
    }

    fn remove_stakeholder(&self, project_id: Uuid, stakeholder_id: Uuid) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM project_stakeholders WHERE project_id = ?1 AND stakeholder_id = ?2;",
            params![project_id.to_string(), stakeholder_id.to_string()],
        )?;
        if changed == 0 {
            return Err(membership_not_found(project_id, stakeholder_id));
        }
        Ok(())
    }

    fn stakeholders_of(&self, project_id: Uuid) -> RepoResult<Vec<Stakeholder>> {
        query_all(
            self.conn,
            &format!(
                "SELECT {STAKEHOLDER_COLUMNS} FROM stakeholders
                 WHERE id IN (SELECT stakeholder_id FROM project_stakeholders WHERE project_id = ?1)
                 ORDER BY name ASC, id ASC;"
            ),
            &[Value::Text(project_id.to_string())],
            stakeholder_from_row,
        )
    }

    fn list_memberships(
        &self,
        predicate: &Predicate,
        page: PageRequest,
    ) -> RepoResult<Paginated<ProjectStakeholder>> {
        fetch_page(self.conn, &MEMBER_SOURCE, predicate, page, membership_from_row)
    }
}

fn funding_not_found(project_id: Uuid, funder_id: Uuid) -> RepoError {
    RepoError::NotFound {
        entity: "project funder",
        key: format!("project {project_id} / funder {funder_id}"),
    }
}

fn membership_not_found(project_id: Uuid, stakeholder_id: Uuid) -> RepoError {
    RepoError::NotFound {
        entity: "project stakeholder",
        key: format!("project {project_id} / stakeholder {stakeholder_id}"),
    }
}

fn funding_from_row(row: &Row<'_>) -> RepoResult<ProjectFunder> {
    let project_id: String = row.get(0)?;
    let funder_id: String = row.get(1)?;
    let amount: Option<i64> = row.get(2)?;
    Ok(ProjectFunder {
        project_id: parse_uuid(&project_id, "project_funders.project_id")?,
        funder_id: parse_uuid(&funder_id, "project_funders.funder_id")?,
        amount: amount.map(Amount::from_cents),
        created_at: from_millis(row.get(3)?, "project_funders.created_at")?,
        updated_at: from_millis(row.get(4)?, "project_funders.updated_at")?,
    })
}

fn membership_from_row(row: &Row<'_>) -> RepoResult<ProjectStakeholder> {
    let project_id: String = row.get(0)?;
    let stakeholder_id: String = row.get(1)?;
    let role: String = row.get(2)?;
    Ok(ProjectStakeholder {
        project_id: parse_uuid(&project_id, "project_stakeholders.project_id")?,
        stakeholder_id: parse_uuid(&stakeholder_id, "project_stakeholders.stakeholder_id")?,
        role: role
            .parse::<StakeholderRole>()
            .map_err(RepoError::InvalidData)?,
        created_at: from_millis(row.get(3)?, "project_stakeholders.created_at")?,
        updated_at: from_millis(row.get(4)?, "project_stakeholders.updated_at")?,
    })
}
