//! Uniform `{status, message, data, meta}` response envelope.
//!
//! # Invariants
//! - `meta` serializes as `{}` for single-item responses.
//! - List responses always carry `meta.pagination`.

use crate::pagination::{Paginated, PaginationMeta};
use serde::Serialize;

/// Envelope metadata block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

/// Response envelope shared by every use-case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope<T> {
    pub status: bool,
    pub message: String,
    pub data: T,
    pub meta: Meta,
}

impl<T> Envelope<T> {
    /// Wraps one successful result with empty metadata.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: true,
            message: message.into(),
            data,
            meta: Meta::default(),
        }
    }
}

impl<T> Envelope<Vec<T>> {
    /// Wraps one result page and derives its navigation links from `base_url`.
    pub fn page(message: impl Into<String>, page: Paginated<T>, base_url: &str) -> Self {
        let pagination = page.meta(base_url);
        Self {
            status: true,
            message: message.into(),
            data: page.items,
            meta: Meta {
                pagination: Some(pagination),
            },
        }
    }
}
