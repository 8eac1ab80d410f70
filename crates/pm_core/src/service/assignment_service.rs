//! Position occupancy use-case service.
//!
//! # Responsibility
//! - Assign users to positions for a period, and update, end or delete periods.
//! - List occupancy with position/unit context.
//!
//! # Invariants
//! - No two periods of one `(user, position)` pair overlap under the
//!   configured [`BoundaryPolicy`].
//! - Ending a period is a soft close (`end = now`); rows are only removed by
//!   [`AssignmentService::delete_assignment`].
//! - Instants are truncated to millisecond precision before comparison.

use super::error::ServiceError;
use crate::interval::{BoundaryPolicy, Interval};
use crate::model::position::{AssignmentView, OccupancyChange, OccupancyTarget, UserPosition};
use crate::pagination::Paginated;
use crate::query::{build_predicate, ListParams};
use crate::repo::assignment_repo::{AssignmentRepository, ASSIGNMENT_QUERY};
use crate::repo::registry::{EntityKind, RecordGuard};
use chrono::{DateTime, Utc};
use log::info;
use rusqlite::types::Value;
use uuid::Uuid;

/// Structured occupancy filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignmentFilter {
    pub user_id: Option<Uuid>,
    pub position_id: Option<Uuid>,
    /// Only periods active now.
    pub current_only: bool,
}

pub struct AssignmentService<R: AssignmentRepository, G: RecordGuard> {
    repo: R,
    guard: G,
    policy: BoundaryPolicy,
}

impl<R: AssignmentRepository, G: RecordGuard> AssignmentService<R, G> {
    pub fn new(repo: R, guard: G, policy: BoundaryPolicy) -> Self {
        Self {
            repo,
            guard,
            policy,
        }
    }

    pub fn policy(&self) -> BoundaryPolicy {
        self.policy
    }

    /// Assigns `user_id` to `position_id` from `start` (default now) to `end`.
    ///
    /// # Errors
    /// - `BadRequest` when `end < start`.
    /// - `NotFound` when the position or user is missing.
    /// - `Conflict` when the period overlaps another period of the same pair.
    pub fn assign(
        &self,
        position_id: Uuid,
        user_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<UserPosition, ServiceError> {
        let start = stored_precision(start.unwrap_or_else(Utc::now));
        let end = end.map(stored_precision);
        Interval::new(start, end)?;

        self.guard.check_exists(EntityKind::Position, position_id)?;
        self.guard.check_exists(EntityKind::User, user_id)?;

        let assignment = self.repo.insert_checked(
            &UserPosition {
                user_id,
                position_id,
                start_date: start,
                end_date: end,
            },
            self.policy,
        )?;
        info!(
            "event=assignment_create module=service status=ok user_id={} position_id={} open={}",
            user_id,
            position_id,
            assignment.end_date.is_none()
        );
        Ok(assignment)
    }

    /// Updates the period starting at `original_start`, or the open period
    /// when `original_start` is `None`.
    pub fn update_occupancy(
        &self,
        position_id: Uuid,
        user_id: Uuid,
        original_start: Option<DateTime<Utc>>,
        change: OccupancyChange,
    ) -> Result<UserPosition, ServiceError> {
        self.guard.check_exists(EntityKind::Position, position_id)?;
        self.guard.check_exists(EntityKind::User, user_id)?;

        let target = OccupancyTarget::from(original_start.map(stored_precision));
        let change = OccupancyChange {
            start_date: change.start_date.map(stored_precision),
            end_date: change.end_date.map(|end| end.map(stored_precision)),
        };
        let updated = self
            .repo
            .update_checked(user_id, position_id, target, change, self.policy)?;
        info!(
            "event=assignment_update module=service status=ok user_id={} position_id={}",
            user_id, position_id
        );
        Ok(updated)
    }

    /// Soft-closes the active period of the pair at the current instant.
    pub fn end_occupancy(
        &self,
        position_id: Uuid,
        user_id: Uuid,
    ) -> Result<UserPosition, ServiceError> {
        self.end_occupancy_at(position_id, user_id, Utc::now())
    }

    /// Soft-closes the latest period still open at `at`.
    ///
    /// A period scheduled to start after `at` is closed at its own start.
    ///
    /// # Errors
    /// - `NotFound` when no period is open at `at`, including a second call.
    pub fn end_occupancy_at(
        &self,
        position_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<UserPosition, ServiceError> {
        self.guard.check_exists(EntityKind::Position, position_id)?;
        self.guard.check_exists(EntityKind::User, user_id)?;
        Ok(self
            .repo
            .close_active(user_id, position_id, stored_precision(at))?)
    }

    /// Hard delete by exact `(user, position, start)` key.
    pub fn delete_assignment(
        &self,
        user_id: Uuid,
        position_id: Uuid,
        start: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        self.repo
            .delete(user_id, position_id, stored_precision(start))?;
        info!(
            "event=assignment_delete module=service status=ok user_id={} position_id={}",
            user_id, position_id
        );
        Ok(())
    }

    pub fn list_assignments(
        &self,
        params: &ListParams,
        filter: AssignmentFilter,
    ) -> Result<Paginated<AssignmentView>, ServiceError> {
        let mut predicate = build_predicate(params, &ASSIGNMENT_QUERY)
            .and_eq("up.user_id", filter.user_id.map(|id| id.to_string()))
            .and_eq("up.position_id", filter.position_id.map(|id| id.to_string()));
        if filter.current_only {
            let now = Utc::now().timestamp_millis();
            predicate = predicate.and_clause(
                "up.start_date <= ? AND (up.end_date IS NULL OR up.end_date > ?)",
                vec![Value::Integer(now), Value::Integer(now)],
            );
        }
        Ok(self.repo.list(&predicate, params.page)?)
    }

    /// Occupancy history (or current occupants) of one position.
    pub fn occupants(
        &self,
        position_id: Uuid,
        params: &ListParams,
        current_only: bool,
    ) -> Result<Paginated<AssignmentView>, ServiceError> {
        self.guard.check_exists(EntityKind::Position, position_id)?;
        self.list_assignments(
            params,
            AssignmentFilter {
                position_id: Some(position_id),
                current_only,
                ..AssignmentFilter::default()
            },
        )
    }

    /// Positions held (or currently held) by one user.
    pub fn user_positions(
        &self,
        user_id: Uuid,
        params: &ListParams,
        current_only: bool,
    ) -> Result<Paginated<AssignmentView>, ServiceError> {
        self.guard.check_exists(EntityKind::User, user_id)?;
        self.list_assignments(
            params,
            AssignmentFilter {
                user_id: Some(user_id),
                current_only,
                ..AssignmentFilter::default()
            },
        )
    }
}

fn stored_precision(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}
