//! Generic existence and duplicate guards keyed by entity kind.
//!
//! # Responsibility
//! - Answer "does this id exist" and "is this field set taken" for any
//!   persisted entity, so services never hand-write those queries.
//!
//! # Invariants
//! - Table and column names only come from [`EntityKind`] and `&'static str`
//!   literals; caller values are always bound.
//! - Duplicate checks compare with NULL-safe `IS`.

use super::{ensure_connection_ready, RepoError, RepoResult};
use log::warn;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use uuid::Uuid;

/// Every persisted entity addressable by a single `id` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    OrganisationUnit,
    Category,
    Position,
    User,
    Role,
    Funder,
    Stakeholder,
    Project,
    Permission,
    Evaluation,
    Report,
}

impl EntityKind {
    pub fn table(self) -> &'static str {
        match self {
            Self::OrganisationUnit => "organisation_units",
            Self::Category => "categories",
            Self::Position => "positions",
            Self::User => "users",
            Self::Role => "roles",
            Self::Funder => "funders",
            Self::Stakeholder => "stakeholders",
            Self::Project => "projects",
            Self::Permission => "permissions",
            Self::Evaluation => "project_evaluations",
            Self::Report => "project_reports",
        }
    }

    /// Human-readable name used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::OrganisationUnit => "organisation unit",
            Self::Category => "category",
            Self::Position => "position",
            Self::User => "user",
            Self::Role => "role",
            Self::Funder => "funder",
            Self::Stakeholder => "stakeholder",
            Self::Project => "project",
            Self::Permission => "permission",
            Self::Evaluation => "project evaluation",
            Self::Report => "project report",
        }
    }
}

/// One unique field set to check: public description plus column/value pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueKey {
    /// Field names as reported in a conflict, e.g. `"name"` or `"name and parent"`.
    pub fields: &'static str,
    pub columns: Vec<(&'static str, Value)>,
}

impl UniqueKey {
    pub fn single(field: &'static str, column: &'static str, value: impl Into<Value>) -> Self {
        Self {
            fields: field,
            columns: vec![(column, value.into())],
        }
    }

    pub fn and(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.columns.push((column, value.into()));
        self
    }
}

/// Existence and duplicate checks shared by every service.
pub trait RecordGuard {
    /// Fails with [`RepoError::NotFound`] when no row of `kind` has `id`.
    fn check_exists(&self, kind: EntityKind, id: Uuid) -> RepoResult<()>;

    /// Fails with [`RepoError::Duplicate`] when another row of `kind` matches
    /// every column of `key`. `exclude_id` skips the row being updated.
    fn check_duplicate(
        &self,
        kind: EntityKind,
        key: &UniqueKey,
        exclude_id: Option<Uuid>,
    ) -> RepoResult<()>;

    /// `check_exists` for an optional reference.
    fn check_exists_opt(&self, kind: EntityKind, id: Option<Uuid>) -> RepoResult<()> {
        match id {
            Some(id) => self.check_exists(kind, id),
            None => Ok(()),
        }
    }
}

/// SQLite-backed record guard.
pub struct SqliteRecordGuard<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordGuard<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl RecordGuard for SqliteRecordGuard<'_> {
    fn check_exists(&self, kind: EntityKind, id: Uuid) -> RepoResult<()> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);",
            kind.table()
        );
        let exists: bool = self
            .conn
            .query_row(&sql, [id.to_string()], |row| row.get(0))?;
        if exists {
            Ok(())
        } else {
            Err(RepoError::NotFound {
                entity: kind.label(),
                key: id.to_string(),
            })
        }
    }

    fn check_duplicate(
        &self,
        kind: EntityKind,
        key: &UniqueKey,
        exclude_id: Option<Uuid>,
    ) -> RepoResult<()> {
        if key.columns.is_empty() {
            return Ok(());
        }

        let mut clauses: Vec<String> = key
            .columns
            .iter()
            .map(|(column, _)| format!("{column} IS ?"))
            .collect();
        let mut binds: Vec<Value> = key.columns.iter().map(|(_, value)| value.clone()).collect();
        if let Some(exclude_id) = exclude_id {
            clauses.push("id <> ?".to_string());
            binds.push(Value::Text(exclude_id.to_string()));
        }

        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {});",
            kind.table(),
            clauses.join(" AND ")
        );
        let taken: bool = self
            .conn
            .query_row(&sql, params_from_iter(binds.iter()), |row| row.get(0))?;
        if taken {
            warn!(
                "event=duplicate_rejected module=repo status=conflict entity={} fields={}",
                kind.label(),
                key.fields
            );
            return Err(RepoError::Duplicate {
                entity: kind.label(),
                fields: key.fields,
            });
        }
        Ok(())
    }
}
