//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate validation, existence/duplicate guards and repository calls.
//! - Keep callers decoupled from storage details.
//!
//! # Invariants
//! - Every check runs before the single write of an operation.

use crate::hierarchy::{resolve_ancestry, HierarchyError, HierarchyNode};
use crate::repo::registry::EntityKind;
use uuid::Uuid;

pub mod assignment_service;
pub mod category_service;
pub mod error;
pub mod evaluation_service;
pub mod funder_service;
pub mod org_unit_service;
pub mod permission_service;
pub mod position_service;
pub mod project_link_service;
pub mod project_service;
pub mod report_service;
pub mod role_service;
pub mod stakeholder_service;
pub mod user_service;

use error::ServiceError;

/// Root-first ancestor chain of `id`, with a missing start node reported
/// against `kind`.
pub(crate) fn ancestry_of<T, F>(kind: EntityKind, id: Uuid, lookup: F) -> Result<Vec<T>, ServiceError>
where
    T: HierarchyNode<Id = Uuid>,
    F: FnMut(Uuid) -> Result<Option<T>, ServiceError>,
{
    resolve_ancestry(id, lookup).map_err(|err| match err {
        ServiceError::Hierarchy(HierarchyError::NodeNotFound(missing)) => ServiceError::NotFound {
            entity: kind.label(),
            key: missing.to_string(),
        },
        other => other,
    })
}

/// Rejects re-parenting `id` under `new_parent` when that closes a cycle.
pub(crate) fn ensure_acyclic_parent<T, F>(
    kind: EntityKind,
    id: Uuid,
    new_parent: Uuid,
    lookup: F,
) -> Result<(), ServiceError>
where
    T: HierarchyNode<Id = Uuid>,
    F: FnMut(Uuid) -> Result<Option<T>, ServiceError>,
{
    if new_parent == id {
        return Err(ServiceError::bad_request(format!(
            "{} cannot be its own parent",
            kind.label()
        )));
    }
    let chain = ancestry_of(kind, new_parent, lookup)?;
    if chain.iter().any(|node| node.node_id() == id) {
        return Err(ServiceError::bad_request(format!(
            "moving {} {id} under {new_parent} would create a cycle",
            kind.label()
        )));
    }
    Ok(())
}
