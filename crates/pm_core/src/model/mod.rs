//! Domain models for the project-management core.
//!
//! Models are plain data; invariants that need storage (uniqueness,
//! existence, overlap) are enforced by services.

pub mod category;
pub mod evaluation;
pub mod funder;
pub mod organisation_unit;
pub mod position;
pub mod project;
pub mod project_link;
pub mod report;
pub mod stakeholder;
pub mod user;
pub mod validation;
