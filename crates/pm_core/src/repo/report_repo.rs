//! Project report repository contracts and SQLite implementation.

use super::{
    ensure_connection_ready, fetch_page, from_millis, now_millis, parse_uuid, query_optional,
    ListSource, RepoError, RepoResult,
};
use crate::model::report::{Report, ReportSummary};
use crate::model::validation::Amount;
use crate::pagination::{PageRequest, Paginated};
use crate::query::{FieldMap, Predicate, QueryConfig, SortOrder, SortSpec};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

pub const REPORT_QUERY: QueryConfig = QueryConfig {
    searchable: &[
        "title",
        "COALESCE(content, '')",
        "COALESCE(reporting_period, '')",
    ],
    sortable: &[
        FieldMap {
            name: "title",
            column: "title",
        },
        FieldMap {
            name: "submittedAt",
            column: "submitted_at",
        },
        FieldMap {
            name: "reportingPeriod",
            column: "reporting_period",
        },
    ],
    default_sort: SortSpec {
        field: "submittedAt",
        order: SortOrder::Desc,
    },
    tiebreaker: "id",
};

const REPORT_COLUMNS: &str = "id, project_id, submitted_by_id, title, reporting_period, content, \
                              fund_usage_cents, submitted_at, updated_at";
const REPORT_SOURCE: ListSource = ListSource {
    columns: REPORT_COLUMNS,
    from: "project_reports",
};

/// Validated report fields ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRecord {
    pub project_id: Uuid,
    pub submitted_by_id: Uuid,
    pub title: String,
    pub reporting_period: Option<String>,
    pub content: Option<String>,
    pub fund_usage: Option<Amount>,
}

pub trait ReportRepository {
    fn create(&self, input: &ReportRecord) -> RepoResult<Report>;
    fn get(&self, id: Uuid) -> RepoResult<Option<Report>>;
    fn update(&self, report: &Report) -> RepoResult<Report>;
    fn delete(&self, id: Uuid) -> RepoResult<()>;
    fn list(&self, predicate: &Predicate, page: PageRequest) -> RepoResult<Paginated<Report>>;
    /// Most recently submitted report of a project.
    fn latest(&self, project_id: Uuid) -> RepoResult<Option<Report>>;
    fn summary(&self, project_id: Uuid) -> RepoResult<ReportSummary>;
}

pub struct SqliteReportRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReportRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_required(&self, id: Uuid) -> RepoResult<Report> {
        self.get(id)?.ok_or_else(|| not_found(id))
    }
}

impl ReportRepository for SqliteReportRepository<'_> {
    fn create(&self, input: &ReportRecord) -> RepoResult<Report> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO project_reports (
                id, project_id, submitted_by_id, title, reporting_period, content,
                fund_usage_cents, submitted_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8);",
            params![
                id.to_string(),
                input.project_id.to_string(),
                input.submitted_by_id.to_string(),
                input.title,
                input.reporting_period,
                input.content,
                input.fund_usage.map(Amount::cents),
                now_millis(),
            ],
        )?;
        self.load_required(id)
    }

    fn get(&self, id: Uuid) -> RepoResult<Option<Report>> {
        query_optional(
            self.conn,
            &format!("SELECT {REPORT_COLUMNS} FROM project_reports WHERE id = ?1;"),
            &[Value::Text(id.to_string())],
            report_from_row,
        )
    }

    fn update(&self, report: &Report) -> RepoResult<Report> {
        let changed = self.conn.execute(
            "UPDATE project_reports
             SET title = ?2, reporting_period = ?3, content = ?4, fund_usage_cents = ?5,
                 updated_at = ?6
             WHERE id = ?1;",
            params![
                report.id.to_string(),
                report.title,
                report.reporting_period,
                report.content,
                report.fund_usage.map(Amount::cents),
                now_millis(),
            ],
        )?;
        if changed == 0 {
            return Err(not_found(report.id));
        }
        self.load_required(report.id)
    }

    fn delete(&self, id: Uuid) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM project_reports WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn list(&self, predicate: &Predicate, page: PageRequest) -> RepoResult<Paginated<Report>> {
        fetch_page(self.conn, &REPORT_SOURCE, predicate, page, report_from_row)
    }

    fn latest(&self, project_id: Uuid) -> RepoResult<Option<Report>> {
        query_optional(
            self.conn,
            &format!(
                "SELECT {REPORT_COLUMNS} FROM project_reports
                 WHERE project_id = ?1
                 ORDER BY submitted_at DESC, rowid DESC
                 LIMIT 1;"
            ),
            &[Value::Text(project_id.to_string())],
            report_from_row,
        )
    }

    fn summary(&self, project_id: Uuid) -> RepoResult<ReportSummary> {
        let (total, usage): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(fund_usage_cents), 0)
             FROM project_reports WHERE project_id = ?1;",
            [project_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(ReportSummary {
            total_reports: u64::try_from(total).unwrap_or_default(),
            total_fund_usage: Amount::from_cents(usage),
        })
    }
}

fn not_found(id: Uuid) -> RepoError {
    RepoError::NotFound {
        entity: "project report",
        key: id.to_string(),
    }
}

fn report_from_row(row: &Row<'_>) -> RepoResult<Report> {
    let id: String = row.get(0)?;
    let project_id: String = row.get(1)?;
    let submitted_by_id: String = row.get(2)?;
    let fund_usage: Option<i64> = row.get(6)?;
    Ok(Report {
        id: parse_uuid(&id, "project_reports.id")?,
        project_id: parse_uuid(&project_id, "project_reports.project_id")?,
        submitted_by_id: parse_uuid(&submitted_by_id, "project_reports.submitted_by_id")?,
        title: row.get(3)?,
        reporting_period: row.get(4)?,
        content: row.get(5)?,
        fund_usage: fund_usage.map(Amount::from_cents),
        submitted_at: from_millis(row.get(7)?, "project_reports.submitted_at")?,
        updated_at: from_millis(row.get(8)?, "project_reports.updated_at")?,
    })
}
