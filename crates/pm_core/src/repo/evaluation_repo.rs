//! Project evaluation repository contracts and SQLite implementation.

use super::{
    ensure_connection_ready, fetch_page, from_millis, now_millis, parse_uuid, query_optional,
    ListSource, RepoError, RepoResult,
};
use crate::model::evaluation::{Evaluation, EvaluationStatus, EvaluationSummary, NewEvaluation};
use crate::pagination::{PageRequest, Paginated};
use crate::query::{FieldMap, Predicate, QueryConfig, SortOrder, SortSpec};
use rusqlite::types::Value;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

pub const EVALUATION_QUERY: QueryConfig = QueryConfig {
    searchable: &["COALESCE(comments, '')"],
    sortable: &[
        FieldMap {
            name: "createdAt",
            column: "created_at",
        },
        FieldMap {
            name: "score",
            column: "score",
        },
        FieldMap {
            name: "status",
            column: "status",
        },
    ],
    default_sort: SortSpec {
        field: "createdAt",
        order: SortOrder::Desc,
    },
    tiebreaker: "id",
};

const EVALUATION_COLUMNS: &str =
    "id, project_id, evaluator_id, score, comments, status, created_at, updated_at";
const EVALUATION_SOURCE: ListSource = ListSource {
    columns: EVALUATION_COLUMNS,
    from: "project_evaluations",
};

pub trait EvaluationRepository {
    /// Inserts one evaluation. `score` must already be range-checked.
    fn create(&self, input: &NewEvaluation) -> RepoResult<Evaluation>;
    fn get(&self, id: Uuid) -> RepoResult<Option<Evaluation>>;
    fn update(&self, evaluation: &Evaluation) -> RepoResult<Evaluation>;
    fn delete(&self, id: Uuid) -> RepoResult<()>;
    fn list(&self, predicate: &Predicate, page: PageRequest)
        -> RepoResult<Paginated<Evaluation>>;
    fn summary(&self, project_id: Uuid) -> RepoResult<EvaluationSummary>;
}

pub struct SqliteEvaluationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEvaluationRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_required(&self, id: Uuid) -> RepoResult<Evaluation> {
        self.get(id)?.ok_or_else(|| not_found(id))
    }
}

impl EvaluationRepository for SqliteEvaluationRepository<'_> {
    fn create(&self, input: &NewEvaluation) -> RepoResult<Evaluation> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO project_evaluations (
                id, project_id, evaluator_id, score, comments, status, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7);",
            params![
                id.to_string(),
                input.project_id.to_string(),
                input.evaluator_id.to_string(),
                input.score,
                input.comments,
                input.status.as_str(),
                now_millis(),
            ],
        )?;
        self.load_required(id)
    }

    fn get(&self, id: Uuid) -> RepoResult<Option<Evaluation>> {
        query_optional(
            self.conn,
            &format!("SELECT {EVALUATION_COLUMNS} FROM project_evaluations WHERE id = ?1;"),
            &[Value::Text(id.to_string())],
            evaluation_from_row,
        )
    }

    fn update(&self, evaluation: &Evaluation) -> RepoResult<Evaluation> {
        let changed = self.conn.execute(
            "UPDATE project_evaluations
             SET project_id = ?2, evaluator_id = ?3, score = ?4, comments = ?5, status = ?6,
                 updated_at = ?7
             WHERE id = ?1;",
            params![
                evaluation.id.to_string(),
                evaluation.project_id.to_string(),
                evaluation.evaluator_id.to_string(),
                evaluation.score,
                evaluation.comments,
                evaluation.status.as_str(),
                now_millis(),
            ],
        )?;
        if changed == 0 {
            return Err(not_found(evaluation.id));
        }
        self.load_required(evaluation.id)
    }

    fn delete(&self, id: Uuid) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM project_evaluations WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn list(
        &self,
        predicate: &Predicate,
        page: PageRequest,
    ) -> RepoResult<Paginated<Evaluation>> {
        fetch_page(self.conn, &EVALUATION_SOURCE, predicate, page, evaluation_from_row)
    }

    fn summary(&self, project_id: Uuid) -> RepoResult<EvaluationSummary> {
        let (average_score, total, pending): (Option<f64>, i64, i64) = self.conn.query_row(
            "SELECT AVG(score), COUNT(*), COUNT(*) FILTER (WHERE status = ?2)
             FROM project_evaluations WHERE project_id = ?1;",
            params![project_id.to_string(), EvaluationStatus::Pending.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(EvaluationSummary {
            average_score,
            total: u64::try_from(total).unwrap_or_default(),
            pending: u64::try_from(pending).unwrap_or_default(),
        })
    }
}

fn not_found(id: Uuid) -> RepoError {
    RepoError::NotFound {
        entity: "project evaluation",
        key: id.to_string(),
    }
}

fn evaluation_from_row(row: &Row<'_>) -> RepoResult<Evaluation> {
    let id: String = row.get(0)?;
    let project_id: String = row.get(1)?;
    let evaluator_id: String = row.get(2)?;
    let score: i64 = row.get(3)?;
    let status: String = row.get(5)?;
    Ok(Evaluation {
        id: parse_uuid(&id, "project_evaluations.id")?,
        project_id: parse_uuid(&project_id, "project_evaluations.project_id")?,
        evaluator_id: parse_uuid(&evaluator_id, "project_evaluations.evaluator_id")?,
        score: u8::try_from(score)
            .map_err(|_| RepoError::InvalidData(format!("score out of range: {score}")))?,
        comments: row.get(4)?,
        status: status
            .parse::<EvaluationStatus>()
            .map_err(RepoError::InvalidData)?,
        created_at: from_millis(row.get(6)?, "project_evaluations.created_at")?,
        updated_at: from_millis(row.get(7)?, "project_evaluations.updated_at")?,
    })
}
