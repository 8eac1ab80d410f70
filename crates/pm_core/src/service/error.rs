//! Service-layer error taxonomy.
//!
//! # Responsibility
//! - Collapse repository, hierarchy, interval and validation failures into
//!   the caller-facing kinds: not found, conflict, bad request.
//!
//! # Invariants
//! - Storage failures that carry no caller meaning stay [`ErrorKind::Internal`].

use crate::hierarchy::HierarchyError;
use crate::interval::IntervalError;
use crate::model::validation::ValidationError;
use crate::repo::RepoError;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Caller-facing error class. The web layer maps these to 404/409/400/500.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    BadRequest,
    Internal,
}

/// Errors from use-case services.
#[derive(Debug)]
pub enum ServiceError {
    /// Referenced entity does not exist.
    NotFound { entity: &'static str, key: String },
    /// Unique value taken or overlapping assignment.
    Conflict(String),
    /// Input rejected before any write.
    BadRequest(String),
    /// Stored hierarchy is inconsistent (duplicate ids or a parent cycle).
    Hierarchy(HierarchyError<Uuid>),
    /// Repository-level failure.
    Repo(RepoError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Hierarchy(HierarchyError::NodeNotFound(_)) => ErrorKind::NotFound,
            Self::Hierarchy(_) | Self::Repo(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Conflict(message) | Self::BadRequest(message) => f.write_str(message),
            Self::Hierarchy(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Hierarchy(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, key } => Self::NotFound { entity, key },
            err @ (RepoError::Duplicate { .. } | RepoError::Overlap { .. }) => {
                Self::Conflict(err.to_string())
            }
            RepoError::InvalidInterval(err) => Self::BadRequest(err.to_string()),
            other => Self::Repo(other),
        }
    }
}

impl From<HierarchyError<Uuid>> for ServiceError {
    fn from(value: HierarchyError<Uuid>) -> Self {
        Self::Hierarchy(value)
    }
}

impl From<IntervalError> for ServiceError {
    fn from(value: IntervalError) -> Self {
        Self::BadRequest(value.to_string())
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::BadRequest(value.to_string())
    }
}
