//! Project repository contracts and SQLite implementation.

use super::{
    ensure_connection_ready, fetch_page, from_millis, map_unique_violation, now_millis,
    parse_optional_uuid, parse_uuid, query_optional, ListSource, RepoError, RepoResult,
};
use crate::model::project::{NewProject, Project, ProjectStatus};
use crate::pagination::{PageRequest, Paginated};
use crate::query::{FieldMap, Predicate, QueryConfig, SortOrder, SortSpec};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

pub const PROJECT_QUERY: QueryConfig = QueryConfig {
    searchable: &["title", "COALESCE(abstract, '')"],
    sortable: &[
        FieldMap {
            name: "title",
            column: "title",
        },
        FieldMap {
            name: "year",
            column: "year",
        },
        FieldMap {
            name: "status",
            column: "status",
        },
        FieldMap {
            name: "progressPercent",
            column: "progress_percent",
        },
    ],
    default_sort: SortSpec {
        field: "title",
        order: SortOrder::Asc,
    },
    tiebreaker: "id",
};

const PROJECT_COLUMNS: &str = "id, title, abstract, status, year, organisation_unit_id, \
                               category_id, progress_percent, created_at, updated_at";
const PROJECT_SOURCE: ListSource = ListSource {
    columns: PROJECT_COLUMNS,
    from: "projects",
};

pub trait ProjectRepository {
    /// Inserts one project. `progress_percent` must already be range-checked.
    fn create(&self, input: &NewProject) -> RepoResult<Project>;
    fn get(&self, id: Uuid) -> RepoResult<Option<Project>>;
    fn update(&self, project: &Project) -> RepoResult<Project>;
    fn delete(&self, id: Uuid) -> RepoResult<()>;
    fn list(&self, predicate: &Predicate, page: PageRequest) -> RepoResult<Paginated<Project>>;
}

pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_required(&self, id: Uuid) -> RepoResult<Project> {
        self.get(id)?.ok_or_else(|| not_found(id))
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create(&self, input: &NewProject) -> RepoResult<Project> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO projects (
                    id, title, abstract, status, year, organisation_unit_id,
                    category_id, progress_percent, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9);",
                params![
                    id.to_string(),
                    input.title,
                    input.summary,
                    input.status.as_str(),
                    input.year,
                    input.organisation_unit_id.to_string(),
                    input.category_id.map(|value| value.to_string()),
                    input.progress_percent,
                    now_millis(),
                ],
            )
            .map_err(|err| map_unique_violation(err, "project", "title and organisation unit"))?;
        self.load_required(id)
    }

    fn get(&self, id: Uuid) -> RepoResult<Option<Project>> {
        query_optional(
            self.conn,
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1;"),
            &[Value::Text(id.to_string())],
            project_from_row,
        )
    }

    fn update(&self, project: &Project) -> RepoResult<Project> {
        let changed = self
            .conn
            .execute(
                "UPDATE projects
                 SET title = ?2, abstract = ?3, status = ?4, year = ?5, organisation_unit_id = ?6,
                     category_id = ?7, progress_percent = ?8, updated_at = ?9
                 WHERE id = ?1;",
                params![
                    project.id.to_string(),
                    project.title,
                    project.summary,
                    project.status.as_str(),
                    project.year,
                    project.organisation_unit_id.to_string(),
                    project.category_id.map(|value| value.to_string()),
                    project.progress_percent,
                    now_millis(),
                ],
            )
            .map_err(|err| map_unique_violation(err, "project", "title and organisation unit"))?;
        if changed == 0 {
            return Err(not_found(project.id));
        }
        self.load_required(project.id)
    }

    fn delete(&self, id: Uuid) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn list(&self, predicate: &Predicate, page: PageRequest) -> RepoResult<Paginated<Project>> {
        fetch_page(self.conn, &PROJECT_SOURCE, predicate, page, project_from_row)
    }
}

fn not_found(id: Uuid) -> RepoError {
    RepoError::NotFound {
        entity: "project",
        key: id.to_string(),
    }
}

fn project_from_row(row: &Row<'_>) -> RepoResult<Project> {
    let id: String = row.get(0)?;
    let status: String = row.get(3)?;
    let unit_id: String = row.get(5)?;
    let category_id: Option<String> = row.get(6)?;
    let progress: i64 = row.get(7)?;
    Ok(Project {
        id: parse_uuid(&id, "projects.id")?,
        title: row.get(1)?,
        summary: row.get(2)?,
        status: status
            .parse::<ProjectStatus>()
            .map_err(RepoError::InvalidData)?,
        year: row.get(4)?,
        organisation_unit_id: parse_uuid(&unit_id, "projects.organisation_unit_id")?,
        category_id: parse_optional_uuid(category_id, "projects.category_id")?,
        progress_percent: u8::try_from(progress).map_err(|_| {
            RepoError::InvalidData(format!("progress_percent out of range: {progress}"))
        })?,
        created_at: from_millis(row.get(8)?, "projects.created_at")?,
        updated_at: from_millis(row.get(9)?, "projects.updated_at")?,
    })
}
