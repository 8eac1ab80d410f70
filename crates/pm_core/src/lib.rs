//! Core domain logic for the project-management backend.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod db;
pub mod hierarchy;
pub mod interval;
pub mod logging;
pub mod model;
pub mod pagination;
pub mod query;
pub mod repo;
pub mod response;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, open_from_config, DbError, DbResult};
pub use hierarchy::{
    build_tree, flatten, resolve_ancestry, Forest, HierarchyError, HierarchyNode, TreeNode,
};
pub use interval::{has_overlap, BoundaryPolicy, Interval, IntervalError};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use pagination::{compute_meta, PageRequest, Paginated, PaginationMeta};
pub use query::{build_predicate, ListParams, Predicate, QueryConfig, SortOrder};
pub use repo::assignment_repo::SqliteAssignmentRepository;
pub use repo::category_repo::SqliteCategoryRepository;
pub use repo::evaluation_repo::SqliteEvaluationRepository;
pub use repo::funder_repo::SqliteFunderRepository;
pub use repo::org_unit_repo::SqliteOrganisationUnitRepository;
pub use repo::permission_repo::SqlitePermissionRepository;
pub use repo::position_repo::SqlitePositionRepository;
pub use repo::project_link_repo::SqliteProjectLinkRepository;
pub use repo::project_repo::SqliteProjectRepository;
pub use repo::registry::{EntityKind, RecordGuard, SqliteRecordGuard, UniqueKey};
pub use repo::report_repo::SqliteReportRepository;
pub use repo::role_repo::SqliteRoleRepository;
pub use repo::stakeholder_repo::SqliteStakeholderRepository;
pub use repo::user_repo::SqliteUserRepository;
pub use repo::{RepoError, RepoResult};
pub use response::{Envelope, Meta};
pub use service::assignment_service::{AssignmentFilter, AssignmentService};
pub use service::category_service::CategoryService;
pub use service::error::{ErrorKind, ServiceError};
pub use service::evaluation_service::EvaluationService;
pub use service::funder_service::FunderService;
pub use service::org_unit_service::OrganisationUnitService;
pub use service::permission_service::PermissionService;
pub use service::position_service::PositionService;
pub use service::project_link_service::ProjectLinkService;
pub use service::project_service::ProjectService;
pub use service::report_service::ReportService;
pub use service::role_service::RoleService;
pub use service::stakeholder_service::StakeholderService;
pub use service::user_service::UserService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
